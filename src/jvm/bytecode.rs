//! This module contains the AST of JVM bytecode, as it comes out of a disassembled method body.
//! The representation is slightly different from the usual presentation to make it more
//! convenient to analyze. For instance:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches.
//!
//!   - Symbolic operands are resolved: instead of constant pool indices, member references carry
//!     the owning class, member name, and descriptor. Jump targets are absolute offsets.
//!

use super::{BaseType, BinaryName, FieldType, MethodDescriptor, RefType, UnqualifiedName};
use crate::util::{Offset, Width};
use std::fmt::{Display, Error as FmtError, Formatter};
use std::ops::Not;

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers both `ldc` and `ldc_w`
    Ldc2(Constant),
    ILoad(u16), // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(InvokeDynamicRef),
    New(BinaryName),
    NewArray(BaseType),
    ANewArray(RefType<BinaryName>),
    MultiANewArray(RefType<BinaryName>, u8),
    ArrayLength,
    CheckCast(RefType<BinaryName>),
    InstanceOf(RefType<BinaryName>),
    MonitorEnter,
    MonitorExit,

    If(OrdComparison, Offset), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Offset), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, Offset), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Offset), // covers `ifnull`, `ifnonnull`
    Goto(Offset),                 // covers `goto` and `goto_w`
    Jsr(Offset),                  // covers `jsr` and `jsr_w`
    Ret(u16),
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: Offset,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Offset>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Offset,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, Offset)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    AThrow,
}

impl Instruction {
    /// Can execution continue at the next instruction in the code array?
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Goto(_)
                | Instruction::Ret(_)
                | Instruction::TableSwitch { .. }
                | Instruction::LookupSwitch { .. }
                | Instruction::IReturn
                | Instruction::LReturn
                | Instruction::FReturn
                | Instruction::DReturn
                | Instruction::AReturn
                | Instruction::Return
                | Instruction::AThrow
        )
    }

    /// Offsets this instruction may explicitly jump to
    ///
    /// This excludes the fallthrough (see [`Self::falls_through`]).
    pub fn jump_targets(&self) -> Vec<Offset> {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfACmp(_, target)
            | Instruction::IfNull(_, target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => vec![*target],
            Instruction::TableSwitch {
                default, targets, ..
            } => {
                let mut all = targets.clone();
                all.push(*default);
                all
            }
            Instruction::LookupSwitch { default, targets } => {
                let mut all: Vec<Offset> = targets.iter().map(|(_, target)| *target).collect();
                all.push(*default);
                all
            }
            _ => vec![],
        }
    }

    /// Is this one of the four `invoke*` instructions that go through a method reference?
    pub fn invoked_method(&self) -> Option<&MethodRef> {
        match self {
            Instruction::Invoke(_, method) => Some(method),
            _ => None,
        }
    }
}

/// Constant loaded by `ldc`, `ldc_w`, or `ldc2_w`
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(RefType<BinaryName>),
    MethodType(String),
    MethodHandle(String),

    /// Dynamically-computed constant (`CONSTANT_Dynamic`)
    Dynamic(FieldType<BinaryName>),
}

impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            Constant::Dynamic(field_type) => field_type.width(),
            _ => 1,
        }
    }
}

/// Symbolic reference to a field (`CONSTANT_Fieldref_info`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Symbolic reference to a method (`CONSTANT_Methodref_info` or
/// `CONSTANT_InterfaceMethodref_info`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Owning type (arrays show up here for calls like `int[].clone()`)
    pub owner: RefType<BinaryName>,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

impl Display for MethodRef {
    /// Renders as `owner.name:descriptor` (eg. `java/util/List.add:(Ljava/lang/Object;)Z`)
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        use super::RenderDescriptor;
        write!(
            f,
            "{}.{}:{}",
            self.owner.render_class_name(),
            self.name,
            self.descriptor.render()
        )
    }
}

/// Call site of an `invokedynamic`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvokeDynamicRef {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because the constant argument it expects is not to a
/// `Constant::MethodRef`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

impl InvokeType {
    /// Does the call consume a receiver object in addition to its declared parameters?
    pub fn has_receiver(&self) -> bool {
        !matches!(self, InvokeType::Static)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{Name, ParseDescriptor};

    #[test]
    fn control_flow() {
        assert!(Instruction::IfNull(EqComparison::NE, Offset(10)).falls_through());
        assert!(!Instruction::Goto(Offset(10)).falls_through());
        assert!(!Instruction::AThrow.falls_through());
        assert_eq!(
            Instruction::IfICmp(OrdComparison::NE, Offset(23)).jump_targets(),
            vec![Offset(23)]
        );
        let switch = Instruction::LookupSwitch {
            default: Offset(40),
            targets: vec![(1, Offset(28)), (5, Offset(33))],
        };
        assert_eq!(
            switch.jump_targets(),
            vec![Offset(28), Offset(33), Offset(40)]
        );
        assert!(Instruction::IReturn.jump_targets().is_empty());
    }

    #[test]
    fn inverted_comparisons() {
        assert_eq!(!OrdComparison::LE, OrdComparison::GT);
        assert_eq!(!EqComparison::EQ, EqComparison::NE);
    }

    #[test]
    fn method_ref_rendering() {
        let method = MethodRef {
            owner: RefType::Object(BinaryName::MATH),
            name: UnqualifiedName::from_str("abs").unwrap(),
            descriptor: MethodDescriptor::parse("(I)I").unwrap(),
        };
        assert_eq!(method.to_string(), "java/lang/Math.abs:(I)I");
    }
}
