//! Abstract operand stack tracking where values came from
//!
//! This is a stripped-down cousin of bytecode verification: instead of tracking the type of every
//! value on the stack and in the locals, we track only its width and whether it is one of the
//! method's incoming parameters. Instructions are replayed one at a time, in the order they appear
//! in the code array.
//!
//! Since there is no control flow graph, a little bit of bookkeeping is needed around jumps. When
//! a forward branch is replayed, the stack at that point is recorded against the jump target. If
//! the instruction before the target can't fall through (eg. it is a `goto` or `athrow`), the
//! recorded stack becomes the stack at the target. Without this, the stack after an `assert`
//! would still contain whatever the failing branch had pushed.
//!
//! The model never fails: popping an empty stack or reading an unknown local produces an
//! [`StackItem::UNKNOWN`] value, which is never considered to be a parameter.

use crate::jvm::{Instruction, MethodDescriptor};
use crate::util::{Offset, Width};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Value on the abstract operand stack (or in an abstract local variable)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackItem {
    /// Is this a `long` or `double`?
    wide: bool,

    /// If this value is a method parameter, which one (0 is the first declared parameter)
    parameter: Option<u16>,
}

impl StackItem {
    /// Narrow value about which nothing is known
    pub const UNKNOWN: StackItem = StackItem {
        wide: false,
        parameter: None,
    };

    /// Value about which nothing is known, except its width
    pub const fn unknown(width: usize) -> StackItem {
        StackItem {
            wide: width == 2,
            parameter: None,
        }
    }

    /// Value of the `index`-th declared parameter of the method being analyzed
    pub const fn parameter(index: u16, width: usize) -> StackItem {
        StackItem {
            wide: width == 2,
            parameter: Some(index),
        }
    }

    /// Is this value (a copy of) one of the original parameters of the method?
    pub fn is_initial_parameter(&self) -> bool {
        self.parameter.is_some()
    }

}

impl Width for StackItem {
    fn width(&self) -> usize {
        if self.wide {
            2
        } else {
            1
        }
    }
}

/// Abstract operand stack and locals of a method, replayed instruction by instruction
#[derive(Debug, Clone, Default)]
pub struct ProvenanceStack {
    /// Values on the stack, top of the stack last
    stack: Vec<StackItem>,

    /// Values in local variables, keyed by slot
    locals: HashMap<u16, StackItem>,

    /// Stacks recorded by forward jumps, keyed by jump target
    jump_entries: HashMap<Offset, Vec<StackItem>>,

    /// Offset of the instruction currently being replayed
    current: Offset,

    /// Can control reach the current position by falling through?
    reachable: bool,
}

impl ProvenanceStack {
    /// State at the entry of a method: empty stack, parameters in their locals
    ///
    /// The receiver of an instance method (slot 0) is not a declared parameter and is left
    /// unknown.
    pub fn for_method<C>(is_static: bool, descriptor: &MethodDescriptor<C>) -> ProvenanceStack {
        let mut locals = HashMap::new();
        let mut slot: u16 = if is_static { 0 } else { 1 };
        for (index, parameter) in descriptor.parameters.iter().enumerate() {
            let width = parameter.width();
            locals.insert(slot, StackItem::parameter(index as u16, width));
            slot += width as u16;
        }

        ProvenanceStack {
            stack: vec![],
            locals,
            jump_entries: HashMap::new(),
            current: Offset(0),
            reachable: true,
        }
    }

    /// Number of values on the stack
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Look at the value `depth` entries below the top of the stack (0 is the top)
    pub fn peek(&self, depth: usize) -> StackItem {
        self.stack
            .iter()
            .rev()
            .nth(depth)
            .copied()
            .unwrap_or(StackItem::UNKNOWN)
    }

    /// Are any of the `count` topmost values parameters?
    pub fn any_initial_parameter(&self, count: usize) -> bool {
        (0..count).any(|depth| self.peek(depth).is_initial_parameter())
    }

    /// Prepare for the instruction at `offset`, taking into account jumps to it
    ///
    /// This must be called before inspecting the stack for an instruction (and before
    /// [`Self::apply`]).
    pub fn enter_instruction(&mut self, offset: Offset) {
        self.current = offset;
        let recorded = self.jump_entries.remove(&offset);
        match (self.reachable, recorded) {
            (true, Some(recorded)) => merge_stacks(&mut self.stack, &recorded, offset),
            (true, None) => (),
            (false, Some(recorded)) => self.stack = recorded,
            (false, None) => {
                // Only reachable through a backwards jump or an exception handler
                self.stack.clear();
            }
        }
        self.reachable = true;
    }

    /// Update the stack and locals to reflect the effects of the instruction
    pub fn apply(&mut self, insn: &Instruction) {
        use Instruction::*;

        match insn {
            Nop => (),
            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => {
                self.push(StackItem::unknown(1));
            }
            LConst0 | LConst1 | DConst0 | DConst1 => {
                self.push(StackItem::unknown(2));
            }
            Ldc(constant) | Ldc2(constant) => {
                self.push(StackItem::unknown(constant.width()));
            }

            ILoad(idx) | FLoad(idx) | ALoad(idx) => self.load(*idx, 1),
            LLoad(idx) | DLoad(idx) => self.load(*idx, 2),

            IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => self.consume(2, Some(1)),
            LALoad | DALoad => self.consume(2, Some(2)),

            IStore(idx) | LStore(idx) | FStore(idx) | DStore(idx) | AStore(idx) => {
                let value = self.pop();
                self.set_local(*idx, value);
            }

            IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore => {
                self.consume(3, None)
            }

            Pop => {
                self.pop();
            }
            Pop2 => {
                let arg1 = self.pop();
                if !arg1.wide {
                    self.pop();
                }
            }
            Dup => {
                let arg1 = self.pop();
                self.push(arg1);
                self.push(arg1);
            }
            DupX1 => {
                let arg1 = self.pop();
                let arg2 = self.pop();
                self.push_all(&[arg1, arg2, arg1]);
            }
            DupX2 => {
                let arg1 = self.pop();
                let arg2 = self.pop();
                if arg2.wide {
                    // Form 2
                    self.push_all(&[arg1, arg2, arg1]);
                } else {
                    // Form 1
                    let arg3 = self.pop();
                    self.push_all(&[arg1, arg3, arg2, arg1]);
                }
            }
            Dup2 => {
                let arg1 = self.pop();
                if arg1.wide {
                    // Form 2
                    self.push_all(&[arg1, arg1]);
                } else {
                    // Form 1
                    let arg2 = self.pop();
                    self.push_all(&[arg2, arg1, arg2, arg1]);
                }
            }
            Dup2X1 => {
                let arg1 = self.pop();
                let arg2 = self.pop();
                if arg1.wide {
                    // Form 2
                    self.push_all(&[arg1, arg2, arg1]);
                } else {
                    // Form 1
                    let arg3 = self.pop();
                    self.push_all(&[arg2, arg1, arg3, arg2, arg1]);
                }
            }
            Dup2X2 => {
                let arg1 = self.pop();
                if arg1.wide {
                    let arg2 = self.pop();
                    if arg2.wide {
                        // Form 4
                        self.push_all(&[arg1, arg2, arg1]);
                    } else {
                        // Form 2
                        let arg3 = self.pop();
                        self.push_all(&[arg1, arg3, arg2, arg1]);
                    }
                } else {
                    let arg2 = self.pop();
                    let arg3 = self.pop();
                    if arg3.wide {
                        // Form 3
                        self.push_all(&[arg2, arg1, arg3, arg2, arg1]);
                    } else {
                        // Form 1
                        let arg4 = self.pop();
                        self.push_all(&[arg2, arg1, arg4, arg3, arg2, arg1]);
                    }
                }
            }
            Swap => {
                let arg1 = self.pop();
                let arg2 = self.pop();
                self.push_all(&[arg1, arg2]);
            }

            IAdd | FAdd | ISub | FSub | IMul | FMul | IDiv | FDiv | IRem | FRem | ISh(_)
            | IAnd | IOr | IXor => self.consume(2, Some(1)),
            LAdd | DAdd | LSub | DSub | LMul | DMul | LDiv | DDiv | LRem | DRem | LSh(_)
            | LAnd | LOr | LXor => self.consume(2, Some(2)),
            INeg | FNeg => self.consume(1, Some(1)),
            LNeg | DNeg => self.consume(1, Some(2)),

            IInc(idx, _) => self.set_local(*idx, StackItem::unknown(1)),

            I2F | L2I | L2F | F2I | D2I | D2F | I2B | I2C | I2S => self.consume(1, Some(1)),
            I2L | I2D | L2D | F2L | F2D | D2L => self.consume(1, Some(2)),

            LCmp | FCmp(_) | DCmp(_) => self.consume(2, Some(1)),

            GetStatic(field) => self.push(StackItem::unknown(field.descriptor.width())),
            PutStatic(_) => self.consume(1, None),
            GetField(field) => self.consume(1, Some(field.descriptor.width())),
            PutField(_) => self.consume(2, None),

            Invoke(invoke_type, method) => {
                let receiver = if invoke_type.has_receiver() { 1 } else { 0 };
                let consumed = method.descriptor.parameters.len() + receiver;
                let produced = method.descriptor.return_type.as_ref().map(Width::width);
                self.consume(consumed, produced);
            }
            InvokeDynamic(call_site) => {
                let consumed = call_site.descriptor.parameters.len();
                let produced = call_site.descriptor.return_type.as_ref().map(Width::width);
                self.consume(consumed, produced);
            }

            New(_) => self.push(StackItem::unknown(1)),
            NewArray(_) | ANewArray(_) | ArrayLength | InstanceOf(_) => {
                self.consume(1, Some(1))
            }
            MultiANewArray(_, dimensions) => self.consume(*dimensions as usize, Some(1)),

            // The value is unchanged, only its static type is
            CheckCast(_) => (),

            MonitorEnter | MonitorExit => self.consume(1, None),

            If(_, target) | IfNull(_, target) => {
                self.pop();
                self.record_jump(*target);
            }
            IfICmp(_, target) | IfACmp(_, target) => {
                self.consume(2, None);
                self.record_jump(*target);
            }
            Goto(target) => self.record_jump(*target),
            Jsr(target) => {
                // The subroutine starts with the return address on the stack
                self.push(StackItem::unknown(1));
                self.record_jump(*target);
                self.pop();
            }
            Ret(_) => (),
            TableSwitch { .. } | LookupSwitch { .. } => {
                self.pop();
                for target in insn.jump_targets() {
                    self.record_jump(target);
                }
            }
            IReturn | LReturn | FReturn | DReturn | AReturn | Return => (),
            AThrow => {
                self.pop();
            }
        }

        if !insn.falls_through() {
            self.reachable = false;
        }
    }

    fn push(&mut self, item: StackItem) {
        self.stack.push(item);
    }

    fn push_all(&mut self, items: &[StackItem]) {
        self.stack.extend_from_slice(items);
    }

    fn pop(&mut self) -> StackItem {
        self.stack.pop().unwrap_or(StackItem::UNKNOWN)
    }

    /// Pop `count` values and optionally push a fresh value of the given width
    ///
    /// Results of computations are never parameters, even if they were computed from one.
    fn consume(&mut self, count: usize, produced_width: Option<usize>) {
        let remaining = self.stack.len().saturating_sub(count);
        self.stack.truncate(remaining);
        if let Some(width) = produced_width {
            self.push(StackItem::unknown(width));
        }
    }

    fn load(&mut self, idx: u16, width: usize) {
        let item = match self.locals.get(&idx) {
            Some(item) => *item,
            None => StackItem::unknown(width),
        };
        self.push(item);
    }

    fn set_local(&mut self, idx: u16, item: StackItem) {
        // A wide value also occupies the next slot
        if item.wide {
            if let Some(next_idx) = idx.checked_add(1) {
                self.locals.remove(&next_idx);
            }
        }

        // Overwriting the second half of a wide value invalidates it
        if let Some(prev_idx) = idx.checked_sub(1) {
            if matches!(self.locals.get(&prev_idx), Some(prev) if prev.wide) {
                self.locals.remove(&prev_idx);
            }
        }

        self.locals.insert(idx, item);
    }

    fn record_jump(&mut self, target: Offset) {
        if target <= self.current {
            return;
        }
        match self.jump_entries.entry(target) {
            Entry::Occupied(mut entry) => merge_stacks(entry.get_mut(), &self.stack, target),
            Entry::Vacant(entry) => {
                entry.insert(self.stack.clone());
            }
        }
    }
}

/// Combine two stacks meeting at the same instruction
///
/// Parameter tags are kept if either side has them. If the stacks have different shapes, the
/// first one wins (this can only happen on unusual bytecode).
fn merge_stacks(into: &mut [StackItem], other: &[StackItem], at: Offset) {
    if into.len() != other.len() {
        log::trace!(
            "Inconsistent stack depths ({} and {}) at offset {}",
            into.len(),
            other.len(),
            at
        );
        return;
    }
    for (item, other_item) in into.iter_mut().zip(other) {
        if item.parameter.is_none() {
            item.parameter = other_item.parameter;
        }
    }
}
