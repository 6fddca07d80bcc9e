//! Decoding of single instruction lines from a `javap -c` listing
//!
//! `javap` prints an instruction as its offset, mnemonic, raw operands (constant pool indices
//! appear as `#12`), and then, for instructions that reference the constant pool, a comment with
//! the resolved constant:
//!
//! ```text
//!   5: invokestatic  #13                 // Method java/lang/Math.abs:(I)I
//! ```
//!
//! Constant pool indices are useless without the pool, so symbolic operands are always taken from
//! the comment.

use crate::jvm::{
    BaseType, BinaryName, CompareMode, Constant, EqComparison, FieldRef, FieldType, Instruction,
    InvokeDynamicRef, InvokeType, MethodDescriptor, MethodRef, Name, OrdComparison,
    ParseDescriptor, RefType, ShiftType, UnqualifiedName,
};
use crate::util::Offset;
use std::str::FromStr;

/// Instruction line, split into its parts (offset excluded)
#[derive(Debug)]
pub struct InstructionLine<'a> {
    pub mnemonic: &'a str,
    pub operands: Vec<&'a str>,
    pub comment: Option<&'a str>,
}

impl<'a> InstructionLine<'a> {
    /// Split what follows `<pc>:` on an instruction line
    pub fn split(text: &'a str) -> InstructionLine<'a> {
        let (code, comment) = match text.split_once("//") {
            Some((code, comment)) => (code, Some(comment.trim())),
            None => (text, None),
        };
        let mut words = code
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|word| !word.is_empty());
        let mnemonic = words.next().unwrap_or_default();
        InstructionLine {
            mnemonic,
            operands: words.collect(),
            comment,
        }
    }

    fn operand<T: FromStr>(&self, idx: usize) -> Result<T, String> {
        let operand = self
            .operands
            .get(idx)
            .ok_or_else(|| format!("'{}' is missing operand {}", self.mnemonic, idx + 1))?;
        operand
            .parse()
            .map_err(|_| format!("'{}' has a bad operand '{}'", self.mnemonic, operand))
    }

    fn target(&self) -> Result<Offset, String> {
        self.operand(0).map(Offset)
    }

    /// Resolved constant in the comment, after checking its kind (eg. `Method` or `Field`)
    fn resolved(&self, kinds: &[&str]) -> Result<(&'a str, &'a str), String> {
        let comment = self
            .comment
            .ok_or_else(|| format!("'{}' is missing its constant comment", self.mnemonic))?;
        let (kind, value) = comment.split_once(' ').unwrap_or((comment, ""));
        if kinds.contains(&kind) {
            Ok((kind, value.trim()))
        } else {
            Err(format!(
                "'{}' expects a {} constant, but got '{}'",
                self.mnemonic,
                kinds.join(" or "),
                comment
            ))
        }
    }

    fn field(&self, current_class: &BinaryName) -> Result<FieldRef, String> {
        let (_, value) = self.resolved(&["Field"])?;
        let (owner, name, descriptor) = member_ref(value, current_class)?;
        let owner = match owner {
            RefType::Object(owner) => owner,
            other => return Err(format!("Field owner '{}' is an array", other.render_class_name())),
        };
        let descriptor = FieldType::parse(descriptor).map_err(|err| err.to_string())?;
        Ok(FieldRef {
            owner,
            name,
            descriptor,
        })
    }

    fn method(&self, current_class: &BinaryName) -> Result<MethodRef, String> {
        let (_, value) = self.resolved(&["Method", "InterfaceMethod"])?;
        let (owner, name, descriptor) = member_ref(value, current_class)?;
        let descriptor = MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?;
        Ok(MethodRef {
            owner,
            name,
            descriptor,
        })
    }

    fn class(&self) -> Result<RefType<BinaryName>, String> {
        let (_, value) = self.resolved(&["class"])?;
        class_name(value)
    }

    fn constant(&self) -> Result<Constant, String> {
        let (kind, value) = self.resolved(&[
            "int",
            "float",
            "long",
            "double",
            "String",
            "class",
            "MethodType",
            "MethodHandle",
            "Dynamic",
        ])?;
        let bad = || format!("Bad {} constant '{}'", kind, value);
        Ok(match kind {
            "int" => Constant::Integer(value.parse().map_err(|_| bad())?),
            "float" => Constant::Float(value.trim_end_matches('f').parse().map_err(|_| bad())?),
            "long" => Constant::Long(value.trim_end_matches('l').parse().map_err(|_| bad())?),
            "double" => Constant::Double(value.trim_end_matches('d').parse().map_err(|_| bad())?),
            "class" => Constant::Class(class_name(value)?),
            "MethodType" => Constant::MethodType(value.to_owned()),
            "MethodHandle" => Constant::MethodHandle(value.to_owned()),
            "Dynamic" => {
                let (_, descriptor) = value.rsplit_once(':').ok_or_else(bad)?;
                Constant::Dynamic(FieldType::parse(descriptor).map_err(|err| err.to_string())?)
            }
            _ => Constant::String(value.to_owned()),
        })
    }

    fn call_site(&self) -> Result<InvokeDynamicRef, String> {
        let (_, value) = self.resolved(&["InvokeDynamic"])?;
        let bad = || format!("Bad call site '{}'", value);

        // `#0:makeConcatWithConstants:(I)Ljava/lang/String;`
        let (_, rest) = value.split_once(':').ok_or_else(bad)?;
        let (name, descriptor) = rest.rsplit_once(':').ok_or_else(bad)?;
        Ok(InvokeDynamicRef {
            name: UnqualifiedName::from_str(unquote(name))?,
            descriptor: MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?,
        })
    }
}

/// Turn a decoded line into an instruction
///
/// Member references without an owner are resolved against `current_class`.
pub fn decode(line: &InstructionLine, current_class: &BinaryName) -> Result<Instruction, String> {
    use Instruction::*;

    let insn = match line.mnemonic {
        "nop" => Nop,
        "aconst_null" => AConstNull,
        "iconst_m1" => IConstM1,
        "iconst_0" => IConst0,
        "iconst_1" => IConst1,
        "iconst_2" => IConst2,
        "iconst_3" => IConst3,
        "iconst_4" => IConst4,
        "iconst_5" => IConst5,
        "lconst_0" => LConst0,
        "lconst_1" => LConst1,
        "fconst_0" => FConst0,
        "fconst_1" => FConst1,
        "fconst_2" => FConst2,
        "dconst_0" => DConst0,
        "dconst_1" => DConst1,
        "bipush" => BiPush(line.operand(0)?),
        "sipush" => SiPush(line.operand(0)?),
        "ldc" | "ldc_w" => Ldc(line.constant()?),
        "ldc2_w" => Ldc2(line.constant()?),

        "iload" | "iload_w" => ILoad(line.operand(0)?),
        "lload" | "lload_w" => LLoad(line.operand(0)?),
        "fload" | "fload_w" => FLoad(line.operand(0)?),
        "dload" | "dload_w" => DLoad(line.operand(0)?),
        "aload" | "aload_w" => ALoad(line.operand(0)?),
        "iaload" => IALoad,
        "laload" => LALoad,
        "faload" => FALoad,
        "daload" => DALoad,
        "aaload" => AALoad,
        "baload" => BALoad,
        "caload" => CALoad,
        "saload" => SALoad,
        "istore" | "istore_w" => IStore(line.operand(0)?),
        "lstore" | "lstore_w" => LStore(line.operand(0)?),
        "fstore" | "fstore_w" => FStore(line.operand(0)?),
        "dstore" | "dstore_w" => DStore(line.operand(0)?),
        "astore" | "astore_w" => AStore(line.operand(0)?),
        "iastore" => IAStore,
        "lastore" => LAStore,
        "fastore" => FAStore,
        "dastore" => DAStore,
        "aastore" => AAStore,
        "bastore" => BAStore,
        "castore" => CAStore,
        "sastore" => SAStore,

        "pop" => Pop,
        "pop2" => Pop2,
        "dup" => Dup,
        "dup_x1" => DupX1,
        "dup_x2" => DupX2,
        "dup2" => Dup2,
        "dup2_x1" => Dup2X1,
        "dup2_x2" => Dup2X2,
        "swap" => Swap,

        "iadd" => IAdd,
        "ladd" => LAdd,
        "fadd" => FAdd,
        "dadd" => DAdd,
        "isub" => ISub,
        "lsub" => LSub,
        "fsub" => FSub,
        "dsub" => DSub,
        "imul" => IMul,
        "lmul" => LMul,
        "fmul" => FMul,
        "dmul" => DMul,
        "idiv" => IDiv,
        "ldiv" => LDiv,
        "fdiv" => FDiv,
        "ddiv" => DDiv,
        "irem" => IRem,
        "lrem" => LRem,
        "frem" => FRem,
        "drem" => DRem,
        "ineg" => INeg,
        "lneg" => LNeg,
        "fneg" => FNeg,
        "dneg" => DNeg,
        "ishl" => ISh(ShiftType::Left),
        "ishr" => ISh(ShiftType::ArithmeticRight),
        "iushr" => ISh(ShiftType::LogicalRight),
        "lshl" => LSh(ShiftType::Left),
        "lshr" => LSh(ShiftType::ArithmeticRight),
        "lushr" => LSh(ShiftType::LogicalRight),
        "iand" => IAnd,
        "land" => LAnd,
        "ior" => IOr,
        "lor" => LOr,
        "ixor" => IXor,
        "lxor" => LXor,
        "iinc" | "iinc_w" => IInc(line.operand(0)?, line.operand(1)?),

        "i2l" => I2L,
        "i2f" => I2F,
        "i2d" => I2D,
        "l2i" => L2I,
        "l2f" => L2F,
        "l2d" => L2D,
        "f2i" => F2I,
        "f2l" => F2L,
        "f2d" => F2D,
        "d2i" => D2I,
        "d2l" => D2L,
        "d2f" => D2F,
        "i2b" => I2B,
        "i2c" => I2C,
        "i2s" => I2S,
        "lcmp" => LCmp,
        "fcmpl" => FCmp(CompareMode::L),
        "fcmpg" => FCmp(CompareMode::G),
        "dcmpl" => DCmp(CompareMode::L),
        "dcmpg" => DCmp(CompareMode::G),

        "ifeq" => If(OrdComparison::EQ, line.target()?),
        "ifne" => If(OrdComparison::NE, line.target()?),
        "iflt" => If(OrdComparison::LT, line.target()?),
        "ifge" => If(OrdComparison::GE, line.target()?),
        "ifgt" => If(OrdComparison::GT, line.target()?),
        "ifle" => If(OrdComparison::LE, line.target()?),
        "if_icmpeq" => IfICmp(OrdComparison::EQ, line.target()?),
        "if_icmpne" => IfICmp(OrdComparison::NE, line.target()?),
        "if_icmplt" => IfICmp(OrdComparison::LT, line.target()?),
        "if_icmpge" => IfICmp(OrdComparison::GE, line.target()?),
        "if_icmpgt" => IfICmp(OrdComparison::GT, line.target()?),
        "if_icmple" => IfICmp(OrdComparison::LE, line.target()?),
        "if_acmpeq" => IfACmp(EqComparison::EQ, line.target()?),
        "if_acmpne" => IfACmp(EqComparison::NE, line.target()?),
        "ifnull" => IfNull(EqComparison::EQ, line.target()?),
        "ifnonnull" => IfNull(EqComparison::NE, line.target()?),
        "goto" | "goto_w" => Goto(line.target()?),
        "jsr" | "jsr_w" => Jsr(line.target()?),
        "ret" | "ret_w" => Ret(line.operand(0)?),

        "ireturn" => IReturn,
        "lreturn" => LReturn,
        "freturn" => FReturn,
        "dreturn" => DReturn,
        "areturn" => AReturn,
        "return" => Return,

        "getstatic" => GetStatic(line.field(current_class)?),
        "putstatic" => PutStatic(line.field(current_class)?),
        "getfield" => GetField(line.field(current_class)?),
        "putfield" => PutField(line.field(current_class)?),
        "invokevirtual" => Invoke(InvokeType::Virtual, line.method(current_class)?),
        "invokespecial" => Invoke(InvokeType::Special, line.method(current_class)?),
        "invokestatic" => Invoke(InvokeType::Static, line.method(current_class)?),
        "invokeinterface" => {
            let method = line.method(current_class)?;
            let count = match line.operands.get(1) {
                Some(_) => line.operand(1)?,
                None => method.descriptor.parameter_length(true) as u8,
            };
            Invoke(InvokeType::Interface(count), method)
        }
        "invokedynamic" => InvokeDynamic(line.call_site()?),

        "new" => match line.class()? {
            RefType::Object(class) => New(class),
            other => return Err(format!("Cannot 'new' array '{}'", other.render_class_name())),
        },
        "newarray" => {
            let keyword: String = line.operand(0)?;
            let element = BaseType::from_keyword(&keyword)
                .ok_or_else(|| format!("Bad primitive array type '{}'", keyword))?;
            NewArray(element)
        }
        "anewarray" => ANewArray(line.class()?),
        "multianewarray" => MultiANewArray(line.class()?, line.operand(1)?),
        "arraylength" => ArrayLength,
        "athrow" => AThrow,
        "checkcast" => CheckCast(line.class()?),
        "instanceof" => InstanceOf(line.class()?),
        "monitorenter" => MonitorEnter,
        "monitorexit" => MonitorExit,

        mnemonic => match implicit_local(mnemonic) {
            Some(insn) => insn,
            None => return Err(format!("Unknown instruction '{}'", mnemonic)),
        },
    };
    Ok(insn)
}

/// Loads and stores with the local index built into the opcode (eg. `iload_2`)
fn implicit_local(mnemonic: &str) -> Option<Instruction> {
    use Instruction::*;

    let (base, idx) = mnemonic.split_once('_')?;
    let idx: u16 = match idx {
        "0" => 0,
        "1" => 1,
        "2" => 2,
        "3" => 3,
        _ => return None,
    };
    Some(match base {
        "iload" => ILoad(idx),
        "lload" => LLoad(idx),
        "fload" => FLoad(idx),
        "dload" => DLoad(idx),
        "aload" => ALoad(idx),
        "istore" => IStore(idx),
        "lstore" => LStore(idx),
        "fstore" => FStore(idx),
        "dstore" => DStore(idx),
        "astore" => AStore(idx),
        _ => return None,
    })
}

/// `javap` quotes names that aren't Java identifiers (`"<init>"`, `"[I"`)
fn unquote(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|name| name.strip_suffix('"'))
        .unwrap_or(name)
}

fn class_name(text: &str) -> Result<RefType<BinaryName>, String> {
    RefType::parse_class_name(unquote(text)).map_err(|err| err.to_string())
}

/// Split a resolved member reference like `java/lang/Object."<init>":()V`
///
/// The owner is omitted when it is the current class.
fn member_ref<'t>(
    text: &'t str,
    current_class: &BinaryName,
) -> Result<(RefType<BinaryName>, UnqualifiedName, &'t str), String> {
    let (path, descriptor) = text
        .rsplit_once(':')
        .ok_or_else(|| format!("Member reference '{}' has no descriptor", text))?;

    let (owner, name) = match path.strip_suffix('"') {
        Some(quoted) => {
            let start = quoted
                .rfind('"')
                .ok_or_else(|| format!("Unbalanced quotes in '{}'", path))?;
            (quoted[..start].strip_suffix('.'), &quoted[start + 1..])
        }
        None => match path.rsplit_once('.') {
            Some((owner, name)) => (Some(owner), name),
            None => (None, path),
        },
    };

    let owner = match owner {
        Some(owner) => class_name(owner)?,
        None => RefType::Object(current_class.clone()),
    };
    Ok((owner, UnqualifiedName::from_str(name)?, descriptor))
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_str(text: &str) -> Result<Instruction, String> {
        let current = BinaryName::from_str("Assert_args_4").unwrap();
        decode(&InstructionLine::split(text), &current)
    }

    #[test]
    fn splitting() {
        let line = InstructionLine::split(
            "invokeinterface #5,  2            // InterfaceMethod java/util/List.add:(Ljava/lang/Object;)Z",
        );
        assert_eq!(line.mnemonic, "invokeinterface");
        assert_eq!(line.operands, vec!["#5", "2"]);
        assert_eq!(
            line.comment,
            Some("InterfaceMethod java/util/List.add:(Ljava/lang/Object;)Z")
        );

        let line = InstructionLine::split("iinc          1, -1");
        assert_eq!(line.operands, vec!["1", "-1"]);
        assert_eq!(line.comment, None);
    }

    #[test]
    fn simple_instructions() {
        assert_eq!(decode_str("iload_1"), Ok(Instruction::ILoad(1)));
        assert_eq!(decode_str("astore        4"), Ok(Instruction::AStore(4)));
        assert_eq!(decode_str("iinc_w        300, 1"), Ok(Instruction::IInc(300, 1)));
        assert_eq!(decode_str("bipush        -7"), Ok(Instruction::BiPush(-7)));
        assert_eq!(
            decode_str("if_icmpne     23"),
            Ok(Instruction::IfICmp(OrdComparison::NE, Offset(23)))
        );
        assert_eq!(
            decode_str("ifnonnull     9"),
            Ok(Instruction::IfNull(EqComparison::NE, Offset(9)))
        );
        assert_eq!(
            decode_str("newarray       int"),
            Ok(Instruction::NewArray(BaseType::Int))
        );
        assert_eq!(decode_str("dup2_x1"), Ok(Instruction::Dup2X1));
    }

    #[test]
    fn constants() {
        assert_eq!(
            decode_str("ldc           #13                 // int -2147483648"),
            Ok(Instruction::Ldc(Constant::Integer(i32::MIN)))
        );
        assert_eq!(
            decode_str("ldc2_w        #20                 // long 100l"),
            Ok(Instruction::Ldc2(Constant::Long(100)))
        );
        assert_eq!(
            decode_str("ldc2_w        #22                 // double 2.5d"),
            Ok(Instruction::Ldc2(Constant::Double(2.5)))
        );
        assert_eq!(
            decode_str("ldc           #3                  // String see http://example.com"),
            Ok(Instruction::Ldc(Constant::String(String::from(
                "see http://example.com"
            ))))
        );
        assert_eq!(
            decode_str("ldc           #8                  // class \"[I\""),
            Ok(Instruction::Ldc(Constant::Class(RefType::parse("[I").unwrap())))
        );
    }

    #[test]
    fn member_references() {
        assert_eq!(
            decode_str("getstatic     #7                  // Field $assertionsDisabled:Z"),
            Ok(Instruction::GetStatic(FieldRef {
                owner: BinaryName::from_str("Assert_args_4").unwrap(),
                name: UnqualifiedName::ASSERTIONS_DISABLED,
                descriptor: FieldType::boolean(),
            }))
        );

        let init = decode_str(
            "invokespecial #19                 // Method java/lang/AssertionError.\"<init>\":()V",
        )
        .unwrap();
        assert_eq!(
            init,
            Instruction::Invoke(
                InvokeType::Special,
                MethodRef {
                    owner: RefType::Object(BinaryName::ASSERTIONERROR),
                    name: UnqualifiedName::INIT,
                    descriptor: MethodDescriptor::parse("()V").unwrap(),
                }
            )
        );

        let own = decode_str("invokevirtual #17                 // Method args:(I)I").unwrap();
        assert_eq!(
            own.invoked_method().map(|method| method.to_string()),
            Some(String::from("Assert_args_4.args:(I)I"))
        );

        let clone = decode_str(
            "invokevirtual #4                  // Method \"[I\".clone:()Ljava/lang/Object;",
        )
        .unwrap();
        assert_eq!(
            clone.invoked_method().map(|method| method.to_string()),
            Some(String::from("[I.clone:()Ljava/lang/Object;"))
        );

        let interface = decode_str(
            "invokeinterface #5,  2            // InterfaceMethod java/util/List.add:(Ljava/lang/Object;)Z",
        )
        .unwrap();
        assert!(matches!(
            interface,
            Instruction::Invoke(InvokeType::Interface(2), _)
        ));
    }

    #[test]
    fn invoke_dynamic() {
        let insn = decode_str(
            "invokedynamic #7,  0              // InvokeDynamic #0:makeConcatWithConstants:(I)Ljava/lang/String;",
        )
        .unwrap();
        match insn {
            Instruction::InvokeDynamic(call_site) => {
                assert_eq!(call_site.name.as_str(), "makeConcatWithConstants");
                assert_eq!(call_site.descriptor.parameters.len(), 1);
            }
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_lines() {
        assert!(decode_str("frobnicate").is_err());
        assert!(decode_str("iload").is_err());
        assert!(decode_str("goto          somewhere").is_err());
        assert!(decode_str("getstatic     #7").is_err());
        assert!(decode_str("getstatic     #7                  // Method foo:()V").is_err());
        assert!(decode_str("new           #2                  // class \"[I\"").is_err());
    }
}
