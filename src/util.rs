use std::fmt::{Display, Error, Formatter};

/// Elements with a width (eg. values on the operand stack or in local variables)
///
/// On the JVM, `long` and `double` take up two slots in the locals and count twice towards the
/// operand stack depth. Everything else has width 1.
pub trait Width {
    fn width(&self) -> usize;
}

/// Offset into the bytecode array of a method
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Offset(pub usize);

impl Display for Offset {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}
