//! Rules applied to instructions inside `assert` regions
//!
//! A classifier sees every instruction of a region before its stack effect is replayed, so the
//! operands of the instruction are still on the [`ProvenanceStack`].

mod arguments;
mod side_effects;

pub use arguments::ArgumentTaintClassifier;
pub use side_effects::SideEffectClassifier;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::jvm::{BinaryName, CodeInstruction, UnqualifiedName};
use crate::provenance::ProvenanceStack;

/// Method whose instructions are being classified
#[derive(Copy, Clone, Debug)]
pub struct MethodSite<'a> {
    pub class: &'a BinaryName,
    pub method: &'a UnqualifiedName,
}

impl<'a> MethodSite<'a> {
    pub fn diagnostic(&self, kind: DiagnosticKind, line: Option<u32>) -> Diagnostic {
        Diagnostic {
            kind,
            class: self.class.clone(),
            method: self.method.clone(),
            line,
        }
    }
}

pub trait Classifier {
    /// Look at an instruction inside an `assert` region
    fn inspect(
        &mut self,
        insn: &CodeInstruction,
        stack: &ProvenanceStack,
        site: &MethodSite,
        sink: &mut dyn DiagnosticSink,
    );

    /// The current `assert` region just ended
    fn region_closed(&mut self) {}

    /// Forget everything about the previous method
    fn reset(&mut self) {}
}
