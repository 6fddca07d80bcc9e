//! Model of JVM classes, as seen by the analysis
//!
//! Classes come in already decoded: member references are symbolic (owner, name, descriptor)
//! and each instruction knows its offset and source line. See [`crate::listing`] for how a
//! `javap` disassembly gets turned into this model.
//!
//! ### Simple example
//!
//! ```
//! use assertlint::jvm::*;
//! use assertlint::util::Offset;
//!
//! # fn build() -> Result<(), String> {
//! let method = Method {
//!     name: UnqualifiedName::from_str("answer")?,
//!     descriptor: MethodDescriptor::parse("()I").map_err(|err| err.to_string())?,
//!     access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     code: Some(Code::new(
//!         vec![
//!             (Offset(0), Instruction::BiPush(42)),
//!             (Offset(2), Instruction::IReturn),
//!         ],
//!         &[LineNumber { start: Offset(0), line: 3 }],
//!     )),
//! };
//!
//! let mut class = Class::new(BinaryName::from_str("me/alec/Answer")?, ClassAccessFlags::PUBLIC);
//! class.methods.push(method);
//! # Ok(())
//! # }
//! ```

mod access_flags;
mod bytecode;
mod descriptors;
mod model;
mod names;

pub use access_flags::*;
pub use bytecode::*;
pub use descriptors::*;
pub use model::*;
pub use names::*;
