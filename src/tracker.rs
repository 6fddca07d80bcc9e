use crate::jvm::{BinaryName, Instruction, InvokeType, Name, UnqualifiedName};

/// Is the current instruction part of an `assert` statement?
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionState {
    Outside,
    Inside,
}

/// Instruction considered to be the end of an `assert` statement
///
/// `javac` compiles `assert cond : msg;` roughly to
///
/// ```text
/// getstatic     $assertionsDisabled
/// ifne          END
/// <cond>
/// if...         END
/// new           java/lang/AssertionError
/// dup
/// <msg>
/// invokespecial java/lang/AssertionError.<init>
/// athrow
/// END:
/// ```
///
/// so the region can be considered closed either at the allocation or at the constructor call.
/// The constructor call comes after the message is computed, so closing there also inspects the
/// message expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitIdiom {
    /// `new java/lang/AssertionError`
    Allocation,

    /// `invokespecial java/lang/AssertionError.<init>`
    ConstructorCall,
}

impl Default for ExitIdiom {
    fn default() -> Self {
        ExitIdiom::Allocation
    }
}

/// Change in the region state caused by an instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    None,
    Entered,
    Exited,
}

/// Tracks whether instructions are inside an `assert` region, one instruction at a time
///
/// There is no reachability analysis: the region is just whatever sits between the guard and the
/// exit idiom in the code array.
#[derive(Debug, Clone)]
pub struct AssertionTracker {
    exit_idiom: ExitIdiom,
    state: RegionState,
}

impl AssertionTracker {
    pub fn new(exit_idiom: ExitIdiom) -> AssertionTracker {
        AssertionTracker {
            exit_idiom,
            state: RegionState::Outside,
        }
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn is_inside(&self) -> bool {
        self.state == RegionState::Inside
    }

    /// Update the state after the instruction
    pub fn observe(&mut self, insn: &Instruction) -> Transition {
        match self.state {
            RegionState::Outside if is_guard(insn) => {
                self.state = RegionState::Inside;
                Transition::Entered
            }
            RegionState::Inside if self.is_exit(insn) => {
                self.state = RegionState::Outside;
                Transition::Exited
            }
            _ => Transition::None,
        }
    }

    pub fn reset(&mut self) {
        self.state = RegionState::Outside;
    }

    fn is_exit(&self, insn: &Instruction) -> bool {
        match (self.exit_idiom, insn) {
            (ExitIdiom::Allocation, Instruction::New(class)) => class == &BinaryName::ASSERTIONERROR,
            (ExitIdiom::ConstructorCall, Instruction::Invoke(InvokeType::Special, method)) => {
                method.owner.render_class_name() == BinaryName::ASSERTIONERROR.as_str()
            }
            _ => false,
        }
    }
}

/// Read of the synthetic field `javac` adds to every class containing an `assert`
///
/// Only the field name is checked: nested classes read the flag of their outermost class.
fn is_guard(insn: &Instruction) -> bool {
    matches!(
        insn,
        Instruction::GetStatic(field) if field.name == UnqualifiedName::ASSERTIONS_DISABLED
    )
}
