use crate::catalog::SideEffectCatalog;
use crate::classify::{ArgumentTaintClassifier, Classifier, MethodSite, SideEffectClassifier};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::jvm::{Class, Method};
use crate::provenance::ProvenanceStack;
use crate::settings::{Rules, Settings};
use crate::tracker::{AssertionTracker, Transition};

/// Finds misuses of `assert` in classes
///
/// The detector itself holds no per-method state, so the same detector can be used for many
/// classes (including from several threads at once).
pub struct Detector<'a> {
    settings: &'a Settings,
    catalog: &'a SideEffectCatalog,
}

impl<'a> Detector<'a> {
    pub fn new(settings: &'a Settings, catalog: &'a SideEffectCatalog) -> Detector<'a> {
        Detector { settings, catalog }
    }

    /// Analyze all of the classes, collecting diagnostics in order
    pub fn analyze_classes(&self, classes: &[Class]) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        for class in classes {
            self.analyze_class(class, &mut diagnostics);
        }
        diagnostics
    }

    /// Analyze every method of the class
    pub fn analyze_class(&self, class: &Class, sink: &mut dyn DiagnosticSink) {
        if !self.class_is_visible(class) {
            log::debug!("Skipping non-public class {}", class.name);
            return;
        }
        log::debug!("Analyzing class {}", class.name);

        let mut classifiers = self.classifiers();
        for method in &class.methods {
            self.walk_method(class, method, &mut classifiers, sink);
        }
    }

    /// Analyze a single method of a class
    pub fn analyze_method(&self, class: &Class, method: &Method, sink: &mut dyn DiagnosticSink) {
        if !self.class_is_visible(class) {
            log::debug!("Skipping non-public class {}", class.name);
            return;
        }
        let mut classifiers = self.classifiers();
        self.walk_method(class, method, &mut classifiers, sink);
    }

    fn class_is_visible(&self, class: &Class) -> bool {
        !self.settings.public_only || class.is_public()
    }

    fn classifiers(&self) -> Vec<Box<dyn Classifier + 'a>> {
        let mut classifiers: Vec<Box<dyn Classifier + 'a>> = vec![];
        if self.settings.rules.contains(Rules::ARGUMENTS) {
            classifiers.push(Box::new(ArgumentTaintClassifier::new()));
        }
        if self.settings.rules.contains(Rules::SIDE_EFFECTS) {
            classifiers.push(Box::new(SideEffectClassifier::new(self.catalog)));
        }
        classifiers
    }

    /// Replay the method's instructions in order, classifying those inside `assert` regions
    fn walk_method(
        &self,
        class: &Class,
        method: &Method,
        classifiers: &mut [Box<dyn Classifier + 'a>],
        sink: &mut dyn DiagnosticSink,
    ) {
        if self.settings.public_only && !method.is_public() {
            log::trace!("Skipping non-public method {}.{}", class.name, method.name);
            return;
        }
        let code = match &method.code {
            Some(code) => code,
            None => {
                log::trace!("Skipping method without code {}.{}", class.name, method.name);
                return;
            }
        };
        log::trace!("Analyzing method {}.{}", class.name, method.name);

        for classifier in classifiers.iter_mut() {
            classifier.reset();
        }
        let mut tracker = AssertionTracker::new(self.settings.exit_idiom);
        let mut stack = ProvenanceStack::for_method(method.is_static(), &method.descriptor);
        let site = MethodSite {
            class: &class.name,
            method: &method.name,
        };

        for insn in &code.instructions {
            stack.enter_instruction(insn.offset);
            if tracker.is_inside() {
                for classifier in classifiers.iter_mut() {
                    classifier.inspect(insn, &stack, &site, sink);
                }
            }
            stack.apply(&insn.instruction);

            match tracker.observe(&insn.instruction) {
                Transition::Entered => log::trace!("Entering assert at offset {}", insn.offset),
                Transition::Exited => {
                    log::trace!("Leaving assert at offset {}", insn.offset);
                    for classifier in classifiers.iter_mut() {
                        classifier.region_closed();
                    }
                }
                Transition::None => (),
            }
        }

        if tracker.is_inside() {
            log::debug!(
                "{}.{} ends inside an assert region",
                class.name,
                method.name
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::jvm::{
        BinaryName, ClassAccessFlags, Code, Constant, FieldRef, FieldType, Instruction,
        InvokeType, LineNumber, MethodAccessFlags, MethodDescriptor, MethodRef, Name,
        OrdComparison, ParseDescriptor, RefType, UnqualifiedName,
    };
    use crate::tracker::ExitIdiom;
    use crate::util::Offset;

    fn guard() -> Instruction {
        Instruction::GetStatic(FieldRef {
            owner: BinaryName::from_str("Assert_args_4").unwrap(),
            name: UnqualifiedName::ASSERTIONS_DISABLED,
            descriptor: FieldType::boolean(),
        })
    }

    fn call(kind: InvokeType, owner: &str, name: &str, descriptor: &str) -> Instruction {
        Instruction::Invoke(
            kind,
            MethodRef {
                owner: RefType::Object(BinaryName::from_str(owner).unwrap()),
                name: UnqualifiedName::from_str(name).unwrap(),
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            },
        )
    }

    fn abs() -> Instruction {
        call(InvokeType::Static, "java/lang/Math", "abs", "(I)I")
    }

    fn init_error() -> Instruction {
        call(InvokeType::Special, "java/lang/AssertionError", "<init>", "()V")
    }

    fn method(name: &str, descriptor: &str, flags: MethodAccessFlags, body: Vec<Instruction>) -> Method {
        // Lay instructions out one byte apart, each on its own line
        let instructions: Vec<(Offset, Instruction)> = body
            .into_iter()
            .enumerate()
            .map(|(idx, insn)| (Offset(idx), insn))
            .collect();
        let lines: Vec<LineNumber> = (0..instructions.len())
            .map(|idx| LineNumber {
                start: Offset(idx),
                line: idx as u32 + 1,
            })
            .collect();
        Method {
            name: UnqualifiedName::from_str(name).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags: flags,
            code: Some(Code::new(instructions, &lines)),
        }
    }

    fn class(flags: ClassAccessFlags, methods: Vec<Method>) -> Class {
        let mut class = Class::new(BinaryName::from_str("Assert_args_4").unwrap(), flags);
        class.methods = methods;
        class
    }

    /// `getAbsAdd(x, y)` with one assert over `Math.abs(x)`, `args(y)`, `Math.abs(args(y))`
    fn get_abs_add() -> Vec<Instruction> {
        vec![
            guard(),                                                  // 1
            Instruction::If(OrdComparison::NE, Offset(24)),           // 2
            Instruction::ILoad(1),                                    // 3
            abs(),                                                    // 4
            Instruction::Ldc(Constant::Integer(i32::MIN)),            // 5
            Instruction::IfICmp(OrdComparison::EQ, Offset(24)),       // 6
            Instruction::ALoad(0),                                    // 7
            Instruction::ILoad(2),                                    // 8
            call(InvokeType::Virtual, "Assert_args_4", "args", "(I)I"), // 9
            Instruction::Ldc(Constant::Integer(i32::MIN)),            // 10
            Instruction::IfICmp(OrdComparison::EQ, Offset(24)),       // 11
            Instruction::ALoad(0),                                    // 12
            Instruction::ILoad(2),                                    // 13
            call(InvokeType::Virtual, "Assert_args_4", "args", "(I)I"), // 14
            abs(),                                                    // 15
            Instruction::Ldc(Constant::Integer(i32::MIN)),            // 16
            Instruction::IfICmp(OrdComparison::EQ, Offset(24)),       // 17
            Instruction::ILoad(3),                                    // 18
            Instruction::ILoad(4),                                    // 19
            Instruction::IfICmp(OrdComparison::LE, Offset(24)),       // 20
            Instruction::New(BinaryName::ASSERTIONERROR),             // 21
            Instruction::Dup,                                         // 22
            init_error(),                                             // 23
            Instruction::AThrow,                                      // 24
            Instruction::ILoad(3),                                    // 25
            Instruction::ILoad(4),                                    // 26
            Instruction::IAdd,                                        // 27
            Instruction::IReturn,                                     // 28
        ]
    }

    fn run(settings: &Settings, classes: &[Class]) -> Vec<Diagnostic> {
        let catalog = SideEffectCatalog::default();
        Detector::new(settings, &catalog).analyze_classes(classes)
    }

    #[test]
    fn get_abs_add_scenario() {
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![method("getAbsAdd", "(II)I", MethodAccessFlags::PUBLIC, get_abs_add())],
        )];
        let found = run(&Settings::default(), &classes);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DiagnosticKind::ArgumentInAssert);
        assert_eq!(found[0].line, Some(4));
        assert_eq!(found[0].method.as_str(), "getAbsAdd");
    }

    #[test]
    fn no_region_no_diagnostics() {
        let body = vec![
            Instruction::ILoad(1),
            abs(),
            Instruction::IStore(2),
            Instruction::ALoad(0),
            Instruction::IConst1,
            call(InvokeType::Virtual, "java/util/List", "add", "(Ljava/lang/Object;)Z"),
            Instruction::Pop,
            Instruction::Return,
        ];
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![method("f", "(I)V", MethodAccessFlags::PUBLIC, body)],
        )];
        assert!(run(&Settings::default(), &classes).is_empty());
    }

    #[test]
    fn side_effects_in_region() {
        // assert list.add(x) && (count = 1) > 0;
        let body = vec![
            guard(),
            Instruction::If(OrdComparison::NE, Offset(12)),
            Instruction::ALoad(1),
            Instruction::ALoad(0),
            call(InvokeType::Interface(2), "java/util/List", "add", "(Ljava/lang/Object;)Z"),
            Instruction::If(OrdComparison::EQ, Offset(9)),
            Instruction::IConst1,
            Instruction::IStore(2),
            call(InvokeType::Virtual, "me/alec/Counter", "add", "(I)I"),
            Instruction::New(BinaryName::ASSERTIONERROR),
            Instruction::Dup,
            init_error(),
            Instruction::AThrow,
            Instruction::Return,
        ];
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![method("g", "(Ljava/util/List;)V", MethodAccessFlags::PUBLIC, body)],
        )];

        let mut settings = Settings::default();
        settings.rules = Rules::SIDE_EFFECTS;
        let found: Vec<(DiagnosticKind, Option<u32>)> = run(&settings, &classes)
            .into_iter()
            .map(|d| (d.kind, d.line))
            .collect();
        assert_eq!(
            found,
            vec![
                (DiagnosticKind::SideEffectCallInAssert, Some(5)),
                (DiagnosticKind::SideEffectStoreInAssert, Some(8)),
                (DiagnosticKind::SideEffectCallInAssert, Some(9)),
            ]
        );

        // `list` is a parameter, but it is the receiver of `add` rather than an argument
        settings.rules = Rules::ARGUMENTS;
        assert!(run(&settings, &classes).is_empty());
    }

    #[test]
    fn later_instructions_do_not_suppress() {
        // The region is only closed at the allocation, so the taint found early stays reported
        let body = vec![
            guard(),
            Instruction::If(OrdComparison::NE, Offset(10)),
            Instruction::ILoad(0),
            abs(),
            Instruction::IConst0,
            Instruction::IfICmp(OrdComparison::GE, Offset(10)),
            Instruction::IConst0,
            Instruction::Pop,
            Instruction::New(BinaryName::ASSERTIONERROR),
            Instruction::AThrow,
            Instruction::Return,
        ];
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![method(
                "h",
                "(I)V",
                MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                body,
            )],
        )];
        let found = run(&Settings::default(), &classes);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, Some(4));
    }

    #[test]
    fn visibility_gating() {
        let private_method = method("getAbsAdd", "(II)I", MethodAccessFlags::PRIVATE, get_abs_add());
        let public_method = method("getAbsAdd", "(II)I", MethodAccessFlags::PUBLIC, get_abs_add());

        let classes = vec![
            class(ClassAccessFlags::PUBLIC, vec![private_method.clone()]),
            class(ClassAccessFlags::empty(), vec![public_method.clone()]),
        ];
        assert!(run(&Settings::default(), &classes).is_empty());

        let mut settings = Settings::default();
        settings.public_only = false;
        assert_eq!(run(&settings, &classes).len(), 2);

        let catalog = SideEffectCatalog::default();
        let detector = Detector::new(&settings, &catalog);
        let mut found = vec![];
        detector.analyze_method(&classes[0], &private_method, &mut found);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn methods_without_code() {
        let abstract_method = Method {
            name: UnqualifiedName::from_str("check").unwrap(),
            descriptor: MethodDescriptor::parse("(I)V").unwrap(),
            access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
            code: None,
        };
        let classes = vec![class(ClassAccessFlags::PUBLIC, vec![abstract_method])];
        assert!(run(&Settings::default(), &classes).is_empty());
    }

    #[test]
    fn state_does_not_leak_between_methods() {
        // First method ends inside an unclosed region
        let unclosed = vec![guard(), Instruction::If(OrdComparison::NE, Offset(3))];
        let second = vec![Instruction::ILoad(1), abs(), Instruction::IReturn];
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![
                method("first", "(I)V", MethodAccessFlags::PUBLIC, unclosed),
                method("second", "(I)I", MethodAccessFlags::PUBLIC, second),
            ],
        )];
        assert!(run(&Settings::default(), &classes).is_empty());
    }

    #[test]
    fn constructor_call_exit_idiom() {
        // With the constructor call as exit, the message expression is part of the region
        let body = vec![
            guard(),
            Instruction::If(OrdComparison::NE, Offset(9)),
            Instruction::IConst0,
            Instruction::If(OrdComparison::NE, Offset(9)),
            Instruction::New(BinaryName::ASSERTIONERROR),
            Instruction::Dup,
            Instruction::ALoad(1),
            call(
                InvokeType::Special,
                "java/lang/AssertionError",
                "<init>",
                "(Ljava/lang/Object;)V",
            ),
            Instruction::AThrow,
            Instruction::Return,
        ];
        let classes = vec![class(
            ClassAccessFlags::PUBLIC,
            vec![method("m", "(Ljava/lang/Object;)V", MethodAccessFlags::PUBLIC, body)],
        )];
        assert!(run(&Settings::default(), &classes).is_empty());

        let mut settings = Settings::default();
        settings.exit_idiom = ExitIdiom::ConstructorCall;
        let found = run(&settings, &classes);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, Some(8));
    }
}
