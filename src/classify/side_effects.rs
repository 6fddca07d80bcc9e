use super::{Classifier, MethodSite};
use crate::catalog::SideEffectCatalog;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::jvm::{CodeInstruction, Instruction};
use crate::provenance::ProvenanceStack;

/// Flags `assert` statements that change state
///
/// Every side-effecting call and every local variable store is reported, even several in the
/// same region.
pub struct SideEffectClassifier<'c> {
    catalog: &'c SideEffectCatalog,
}

impl<'c> SideEffectClassifier<'c> {
    pub fn new(catalog: &'c SideEffectCatalog) -> SideEffectClassifier<'c> {
        SideEffectClassifier { catalog }
    }
}

impl<'c> Classifier for SideEffectClassifier<'c> {
    fn inspect(
        &mut self,
        insn: &CodeInstruction,
        _stack: &ProvenanceStack,
        site: &MethodSite,
        sink: &mut dyn DiagnosticSink,
    ) {
        let kind = match &insn.instruction {
            Instruction::Invoke(_, method) if self.catalog.is_side_effecting(method) => {
                log::trace!("{}.{}: side effect in call to {}", site.class, site.method, method);
                DiagnosticKind::SideEffectCallInAssert
            }
            Instruction::IStore(_)
            | Instruction::LStore(_)
            | Instruction::FStore(_)
            | Instruction::DStore(_)
            | Instruction::AStore(_)
            | Instruction::IInc(_, _) => DiagnosticKind::SideEffectStoreInAssert,
            _ => return,
        };
        sink.report(site.diagnostic(kind, insn.line));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::{SideEffectDatabase, SideEffectVerdict};
    use crate::diagnostics::Diagnostic;
    use crate::jvm::{
        BinaryName, InvokeType, MethodDescriptor, MethodRef, Name, ParseDescriptor, RefType,
        UnqualifiedName,
    };
    use crate::util::Offset;

    fn classify(catalog: &SideEffectCatalog, instructions: Vec<Instruction>) -> Vec<Diagnostic> {
        let class = BinaryName::from_str("Foo").unwrap();
        let method = UnqualifiedName::from_str("bar").unwrap();
        let site = MethodSite {
            class: &class,
            method: &method,
        };
        let stack = ProvenanceStack::default();
        let mut classifier = SideEffectClassifier::new(catalog);
        let mut found = vec![];
        for (idx, instruction) in instructions.into_iter().enumerate() {
            let insn = CodeInstruction {
                offset: Offset(idx),
                line: Some(10 + idx as u32),
                instruction,
            };
            classifier.inspect(&insn, &stack, &site, &mut found);
        }
        found
    }

    fn call(owner: &str, name: &str, descriptor: &str) -> Instruction {
        Instruction::Invoke(
            InvokeType::Interface(2),
            MethodRef {
                owner: RefType::Object(BinaryName::from_str(owner).unwrap()),
                name: UnqualifiedName::from_str(name).unwrap(),
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            },
        )
    }

    #[test]
    fn every_call_is_reported() {
        let catalog = SideEffectCatalog::default();
        let found = classify(
            &catalog,
            vec![
                call("java/util/List", "add", "(Ljava/lang/Object;)Z"),
                call("java/util/List", "size", "()I"),
                call("java/util/List", "add", "(Ljava/lang/Object;)Z"),
            ],
        );
        let kinds: Vec<_> = found.iter().map(|d| (d.kind, d.line)).collect();
        assert_eq!(
            kinds,
            vec![
                (DiagnosticKind::SideEffectCallInAssert, Some(10)),
                (DiagnosticKind::SideEffectCallInAssert, Some(12)),
            ]
        );
    }

    #[test]
    fn oracle_is_consulted() {
        let database: SideEffectDatabase = vec![(
            String::from("java/util/Map.clear:()V"),
            SideEffectVerdict::SideEffect,
        )]
        .into_iter()
        .collect();
        let catalog = SideEffectCatalog::new(Box::new(database));
        let found = classify(
            &catalog,
            vec![
                call("java/util/Map", "clear", "()V"),
                call("java/util/Map", "isEmpty", "()Z"),
            ],
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn stores() {
        let catalog = SideEffectCatalog::default();
        let found = classify(
            &catalog,
            vec![
                Instruction::IConst1,
                Instruction::IStore(3),
                Instruction::IInc(2, 1),
                Instruction::AStore(4),
                Instruction::DStore(5),
                Instruction::IAStore,
            ],
        );
        assert_eq!(found.len(), 4);
        assert!(found
            .iter()
            .all(|d| d.kind == DiagnosticKind::SideEffectStoreInAssert));
    }
}
