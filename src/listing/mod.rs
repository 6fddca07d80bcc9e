//! Decoder for `javap` disassembly listings
//!
//! The analysis only needs a small part of a class file: class and method names, access flags,
//! descriptors, instructions and line numbers. All of these are in the output of
//! `javap -c -l -s -p`, which makes it a convenient input format (and a readable one, for tests).
//!
//! ```text
//! Compiled from "Answer.java"
//! public class me.alec.Answer {
//!   public static int answer();
//!     descriptor: ()I
//!     Code:
//!        0: bipush        42
//!        2: ireturn
//!     LineNumberTable:
//!       line 3: 0
//! }
//! ```
//!
//! Sections other than `Code` and `LineNumberTable` (local variable tables, stack maps, exception
//! tables, ...) are skipped. The `descriptor:` lines from `-s` are optional: without them, the
//! descriptor is rebuilt from the Java declaration (with generics erased).

mod header;
mod opcodes;

use crate::errors::Error;
use crate::jvm::{
    BinaryName, Class, Code, Instruction, LineNumber, Method, MethodAccessFlags,
    MethodDescriptor, ParseDescriptor, UnqualifiedName,
};
use crate::util::Offset;
use header::MemberHeader;
use opcodes::InstructionLine;

/// Decode every class in a listing
pub fn parse_listing(source: &str) -> Result<Vec<Class>, Error> {
    let mut parser = ListingParser::default();
    let mut last_line = 0;
    for (idx, line) in source.lines().enumerate() {
        last_line = idx + 1;
        parser
            .line(line)
            .map_err(|message| Error::MalformedListing {
                line: last_line,
                message,
            })?;
    }
    parser.finish().map_err(|message| Error::MalformedListing {
        line: last_line,
        message,
    })
}

/// Part of a method body being read
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Section {
    /// Right after the declaration (eg. `descriptor:`)
    Declaration,
    Code,
    LineNumbers,

    /// Any section we don't care about
    Other,
}

/// Method whose body is still being read
struct PendingMethod {
    name: UnqualifiedName,
    access_flags: MethodAccessFlags,
    descriptor: MethodDescriptor<BinaryName>,
    has_code: bool,
    instructions: Vec<(Offset, Instruction)>,
    line_numbers: Vec<LineNumber>,
}

/// `tableswitch` or `lookupswitch` whose cases are still being read
struct PendingSwitch {
    offset: Offset,
    is_table: bool,
    cases: Vec<(i32, Offset)>,
    default: Option<Offset>,
}

#[derive(Default)]
struct ListingParser {
    classes: Vec<Class>,
    class: Option<Class>,

    /// Current method (`None` also when inside a field)
    method: Option<PendingMethod>,
    section: Option<Section>,
    switch: Option<PendingSwitch>,
}

impl ListingParser {
    fn line(&mut self, line: &str) -> Result<(), String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        if self.switch.is_some() {
            return self.switch_case(trimmed);
        }

        match line.len() - line.trim_start().len() {
            0 => self.top_level(trimmed),
            1..=3 => self.member_header(trimmed),
            _ => self.member_body(trimmed),
        }
    }

    fn top_level(&mut self, trimmed: &str) -> Result<(), String> {
        if trimmed.starts_with("Compiled from") {
            Ok(())
        } else if trimmed == "}" {
            self.finish_method()?;
            let class = self
                .class
                .take()
                .ok_or_else(|| String::from("Unmatched '}'"))?;
            log::debug!(
                "Decoded class {} ({} methods)",
                class.name,
                class.methods.len()
            );
            self.classes.push(class);
            Ok(())
        } else if trimmed.ends_with('{') {
            if let Some(class) = &self.class {
                return Err(format!("Class {} is missing its closing '}}'", class.name));
            }
            let (name, access_flags) = header::parse_class_header(trimmed)?;
            self.class = Some(Class::new(name, access_flags));
            Ok(())
        } else {
            Err(format!("Unexpected '{}' outside of a class", trimmed))
        }
    }

    fn member_header(&mut self, trimmed: &str) -> Result<(), String> {
        if self.class.is_none() {
            return Err(format!("Unexpected '{}' outside of a class", trimmed));
        }
        self.finish_method()?;
        match header::parse_member_header(trimmed)? {
            MemberHeader::Field => (),
            MemberHeader::Method {
                name,
                access_flags,
                descriptor,
            } => {
                self.method = Some(PendingMethod {
                    name,
                    access_flags,
                    descriptor,
                    has_code: false,
                    instructions: vec![],
                    line_numbers: vec![],
                });
                self.section = Some(Section::Declaration);
            }
        }
        Ok(())
    }

    fn member_body(&mut self, trimmed: &str) -> Result<(), String> {
        let class_name = match &self.class {
            Some(class) => &class.name,
            None => return Err(format!("Unexpected '{}' outside of a class", trimmed)),
        };
        let method = match &mut self.method {
            Some(method) => method,
            None => return Ok(()), // field attributes
        };

        if let Some(descriptor) = trimmed.strip_prefix("descriptor:") {
            method.descriptor = MethodDescriptor::parse(descriptor.trim())
                .map_err(|err| format!("Bad method descriptor - {}", err))?;
            return Ok(());
        }
        match trimmed {
            "Code:" => {
                method.has_code = true;
                self.section = Some(Section::Code);
                return Ok(());
            }
            "LineNumberTable:" => {
                self.section = Some(Section::LineNumbers);
                return Ok(());
            }
            _ => (),
        }

        match self.section {
            Some(Section::Code) if trimmed.starts_with(|c: char| c.is_ascii_digit()) => {
                let (offset, rest) = trimmed
                    .split_once(':')
                    .ok_or_else(|| format!("Expected instruction but got '{}'", trimmed))?;
                let offset = Offset(
                    offset
                        .parse()
                        .map_err(|_| format!("Bad instruction offset '{}'", offset))?,
                );
                let line = InstructionLine::split(rest.trim());
                match line.mnemonic.trim_end_matches('{') {
                    "tableswitch" | "lookupswitch" => {
                        self.switch = Some(PendingSwitch {
                            offset,
                            is_table: line.mnemonic.starts_with("tableswitch"),
                            cases: vec![],
                            default: None,
                        });
                    }
                    _ => {
                        let insn = opcodes::decode(&line, class_name)?;
                        method.instructions.push((offset, insn));
                    }
                }
            }
            Some(Section::Code) if trimmed.starts_with("stack=") => (),
            Some(Section::LineNumbers) if trimmed.starts_with("line ") => {
                method.line_numbers.push(parse_line_number(trimmed)?);
            }
            _ => self.section = Some(Section::Other),
        }
        Ok(())
    }

    fn switch_case(&mut self, trimmed: &str) -> Result<(), String> {
        let switch = match &mut self.switch {
            Some(switch) => switch,
            None => return Ok(()),
        };
        if trimmed != "}" {
            let (key, target) = trimmed
                .split_once(':')
                .ok_or_else(|| format!("Expected switch case but got '{}'", trimmed))?;
            let target = Offset(
                target
                    .trim()
                    .parse()
                    .map_err(|_| format!("Bad switch target '{}'", target.trim()))?,
            );
            match key.trim() {
                "default" => switch.default = Some(target),
                key => {
                    let key = key
                        .parse()
                        .map_err(|_| format!("Bad switch key '{}'", key))?;
                    switch.cases.push((key, target));
                }
            }
            return Ok(());
        }

        let PendingSwitch {
            offset,
            is_table,
            cases,
            default,
        } = match self.switch.take() {
            Some(switch) => switch,
            None => return Ok(()),
        };
        let default = default.ok_or_else(|| format!("Switch at {} has no default", offset))?;
        let insn = if is_table {
            Instruction::TableSwitch {
                default,
                low: cases.first().map_or(0, |(key, _)| *key),
                targets: cases.into_iter().map(|(_, target)| target).collect(),
            }
        } else {
            Instruction::LookupSwitch {
                default,
                targets: cases,
            }
        };
        match &mut self.method {
            Some(method) => method.instructions.push((offset, insn)),
            None => return Err(String::from("Switch outside of a method")),
        }
        Ok(())
    }

    fn finish_method(&mut self) -> Result<(), String> {
        self.section = None;
        let method = match self.method.take() {
            Some(method) => method,
            None => return Ok(()),
        };
        let class = self
            .class
            .as_mut()
            .ok_or_else(|| String::from("Method outside of a class"))?;

        let code = if method.has_code {
            Some(Code::new(method.instructions, &method.line_numbers))
        } else {
            None
        };
        log::trace!("Decoded method {}.{}", class.name, method.name);
        class.methods.push(Method {
            name: method.name,
            descriptor: method.descriptor,
            access_flags: method.access_flags,
            code,
        });
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Class>, String> {
        if self.switch.is_some() {
            return Err(String::from("Listing ends inside a switch"));
        }
        if let Some(class) = &self.class {
            return Err(format!("Class {} is missing its closing '}}'", class.name));
        }
        self.finish_method()?;
        Ok(self.classes)
    }
}

/// Parse `line 12: 34` (source line 12 starts at offset 34)
fn parse_line_number(trimmed: &str) -> Result<LineNumber, String> {
    let bad = || format!("Bad line number entry '{}'", trimmed);
    let (line, start) = trimmed
        .strip_prefix("line ")
        .and_then(|entry| entry.split_once(':'))
        .ok_or_else(bad)?;
    Ok(LineNumber {
        start: Offset(start.trim().parse().map_err(|_| bad())?),
        line: line.trim().parse().map_err(|_| bad())?,
    })
}
