use super::{Classifier, MethodSite};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::jvm::{CodeInstruction, Instruction, InvokeType};
use crate::provenance::ProvenanceStack;

/// Flags `assert` statements that check method parameters
///
/// A parameter counts as checked if it is passed to a call or compared with `if_icmp*`,
/// `ifnull`, or `ifnonnull`. Only the first such instruction in a region is reported.
#[derive(Debug, Default)]
pub struct ArgumentTaintClassifier {
    found: bool,
}

impl ArgumentTaintClassifier {
    pub fn new() -> ArgumentTaintClassifier {
        ArgumentTaintClassifier::default()
    }

    /// How many stack values does this instruction check?
    fn checked_values(insn: &Instruction) -> usize {
        match insn {
            Instruction::Invoke(
                InvokeType::Virtual
                | InvokeType::Special
                | InvokeType::Static
                | InvokeType::Interface(_),
                method,
            ) => method.descriptor.parameters.len(),
            Instruction::IfNull(_, _) => 1,
            Instruction::IfICmp(_, _) => 2,
            _ => 0,
        }
    }
}

impl Classifier for ArgumentTaintClassifier {
    fn inspect(
        &mut self,
        insn: &CodeInstruction,
        stack: &ProvenanceStack,
        site: &MethodSite,
        sink: &mut dyn DiagnosticSink,
    ) {
        if self.found {
            return;
        }
        let checked = Self::checked_values(&insn.instruction);
        if checked > 0 && stack.any_initial_parameter(checked) {
            log::trace!(
                "{}.{}: parameter checked at offset {}",
                site.class,
                site.method,
                insn.offset
            );
            sink.report(site.diagnostic(DiagnosticKind::ArgumentInAssert, insn.line));
            self.found = true;
        }
    }

    fn region_closed(&mut self) {
        self.found = false;
    }

    fn reset(&mut self) {
        self.found = false;
    }
}
