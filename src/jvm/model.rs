use super::{
    BinaryName, ClassAccessFlags, Instruction, MethodAccessFlags, MethodDescriptor,
    UnqualifiedName,
};
use crate::util::Offset;

/// Semantic representation of a class, as far as assertion analysis is concerned
#[derive(Debug, Clone)]
pub struct Class {
    pub name: BinaryName,
    pub access_flags: ClassAccessFlags,
    pub methods: Vec<Method>,
}

impl Class {
    pub fn new(name: BinaryName, access_flags: ClassAccessFlags) -> Class {
        Class {
            name,
            access_flags,
            methods: vec![],
        }
    }

    pub fn is_public(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::PUBLIC)
    }
}

/// Semantic representation of a method
#[derive(Debug, Clone)]
pub struct Method {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub access_flags: MethodAccessFlags,

    /// Method code implementation (absent for `abstract` and `native` methods)
    pub code: Option<Code>,
}

impl Method {
    pub fn is_public(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::PUBLIC)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }
}

/// Instruction along with its position in the method
#[derive(Debug, Clone, PartialEq)]
pub struct CodeInstruction {
    /// Offset of the instruction from the start of the code array
    pub offset: Offset,

    /// Source line, if the line number table covers this instruction
    pub line: Option<u32>,

    pub instruction: Instruction,
}

/// Method body: instructions in emission order
#[derive(Debug, Clone, Default)]
pub struct Code {
    pub instructions: Vec<CodeInstruction>,
}

/// Entry in a `LineNumberTable`: source line starting at a given offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start: Offset,
    pub line: u32,
}

impl Code {
    /// Build a method body, resolving source lines from a line number table
    ///
    /// An instruction belongs to the entry with the greatest start offset not past it. Entries
    /// may come in any order (`javac` repeats lines for loop conditions).
    pub fn new(instructions: Vec<(Offset, Instruction)>, line_numbers: &[LineNumber]) -> Code {
        let mut line_numbers: Vec<LineNumber> = line_numbers.to_vec();
        line_numbers.sort_by_key(|entry| entry.start);

        let instructions = instructions
            .into_iter()
            .map(|(offset, instruction)| {
                let line = match line_numbers.binary_search_by_key(&offset, |entry| entry.start) {
                    Ok(idx) => Some(line_numbers[idx].line),
                    Err(0) => None,
                    Err(idx) => Some(line_numbers[idx - 1].line),
                };
                CodeInstruction {
                    offset,
                    line,
                    instruction,
                }
            })
            .collect();
        Code { instructions }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_resolution() {
        let code = Code::new(
            vec![
                (Offset(0), Instruction::Nop),
                (Offset(1), Instruction::Nop),
                (Offset(2), Instruction::IConst0),
                (Offset(3), Instruction::IReturn),
            ],
            &[
                LineNumber {
                    start: Offset(2),
                    line: 7,
                },
                LineNumber {
                    start: Offset(1),
                    line: 5,
                },
            ],
        );
        let lines: Vec<Option<u32>> = code.instructions.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![None, Some(5), Some(7), Some(7)]);
    }
}
