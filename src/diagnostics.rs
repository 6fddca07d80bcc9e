use crate::jvm::{BinaryName, UnqualifiedName};
use std::fmt::{Display, Error as FmtError, Formatter};

/// Kind of misuse found inside an `assert`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A method parameter is checked (assertions can be disabled, argument checks shouldn't be)
    ArgumentInAssert,

    /// A call that mutates state (the mutation disappears when assertions are disabled)
    SideEffectCallInAssert,

    /// A local variable is written
    SideEffectStoreInAssert,
}

impl DiagnosticKind {
    /// Stable identifier, for output and filtering
    pub fn id(&self) -> &'static str {
        match self {
            DiagnosticKind::ArgumentInAssert => "DA_DONT_ASSERT_ARGS",
            DiagnosticKind::SideEffectCallInAssert => "DA_DONT_ASSERT_SIDE_EFFECT_METHOD",
            DiagnosticKind::SideEffectStoreInAssert => "DA_DONT_ASSERT_SIDE_EFFECT",
        }
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.write_str(self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub class: BinaryName,
    pub method: UnqualifiedName,

    /// Source line of the offending instruction, when the class has line numbers
    pub line: Option<u32>,
}

impl Display for Diagnostic {
    /// Renders as `KIND_ID class.method line n` (or `line ?` if unknown)
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "{} {}.{} line ", self.kind, self.class, self.method)?;
        match self.line {
            Some(line) => write!(f, "{}", line),
            None => f.write_str("?"),
        }
    }
}

/// Destination for diagnostics, in the order they are found
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::Name;

    #[test]
    fn rendering() {
        let mut found: Vec<Diagnostic> = vec![];
        found.report(Diagnostic {
            kind: DiagnosticKind::ArgumentInAssert,
            class: BinaryName::from_str("Assert_args_4").unwrap(),
            method: UnqualifiedName::from_str("getAbsAdd").unwrap(),
            line: Some(4),
        });
        found.report(Diagnostic {
            kind: DiagnosticKind::SideEffectStoreInAssert,
            class: BinaryName::from_str("me/alec/Foo").unwrap(),
            method: UnqualifiedName::from_str("bar").unwrap(),
            line: None,
        });
        assert_eq!(found[0].to_string(), "DA_DONT_ASSERT_ARGS Assert_args_4.getAbsAdd line 4");
        assert_eq!(found[1].to_string(), "DA_DONT_ASSERT_SIDE_EFFECT me/alec/Foo.bar line ?");
    }
}
