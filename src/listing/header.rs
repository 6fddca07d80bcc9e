//! Class and member declarations, as `javap` prints them
//!
//! These are Java source syntax (`public int add(int, java.lang.Object[]);`) rather than JVM
//! descriptors. Type arguments are erased since descriptors don't have them.

use crate::jvm::{
    BaseType, BinaryName, ClassAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name,
    UnqualifiedName,
};

/// Member declaration inside a class body
#[derive(Debug, PartialEq)]
pub enum MemberHeader {
    Field,
    Method {
        name: UnqualifiedName,
        access_flags: MethodAccessFlags,

        /// Descriptor derived from the Java types in the declaration (`javap -s` prints the
        /// exact one on the following line)
        descriptor: MethodDescriptor<BinaryName>,
    },
}

/// Parse a line like `public final class a.b.C extends a.b.D implements a.b.E {`
pub fn parse_class_header(text: &str) -> Result<(BinaryName, ClassAccessFlags), String> {
    let text = erase_type_arguments(text.trim_end_matches('{'));
    let mut access_flags = ClassAccessFlags::empty();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        access_flags |= ClassAccessFlags::from_keyword(token)
            .ok_or_else(|| format!("Unexpected '{}' in class declaration", token))?;
        if matches!(token, "class" | "interface" | "@interface" | "enum" | "record") {
            let name = tokens
                .next()
                .ok_or_else(|| String::from("Class declaration has no name"))?;
            return Ok((BinaryName::from_dotted(name)?, access_flags));
        }
    }
    Err(format!("'{}' is not a class declaration", text.trim()))
}

/// Parse a member declaration (trailing `;` included)
pub fn parse_member_header(text: &str) -> Result<MemberHeader, String> {
    let text = text
        .strip_suffix(';')
        .ok_or_else(|| format!("Expected member declaration but got '{}'", text))?
        .trim();

    if text == "static {}" {
        return Ok(MemberHeader::Method {
            name: UnqualifiedName::CLINIT,
            access_flags: MethodAccessFlags::STATIC,
            descriptor: MethodDescriptor {
                parameters: vec![],
                return_type: None,
            },
        });
    }

    let text = erase_type_arguments(text);
    let (open, close) = match (text.find('('), text.find(')')) {
        (Some(open), Some(close)) if open < close => (open, close),
        (None, None) => return Ok(MemberHeader::Field),
        _ => return Err(format!("Unbalanced parentheses in '{}'", text)),
    };

    let mut access_flags = MethodAccessFlags::empty();
    let mut rest = vec![];
    for token in text[..open].split_whitespace() {
        match MethodAccessFlags::from_keyword(token) {
            Some(flag) => access_flags |= flag,
            None => rest.push(token),
        }
    }

    let (name, return_type) = match rest.as_slice() {
        [_class_name] => (UnqualifiedName::INIT, None),
        [return_type, name] => {
            let return_type = match *return_type {
                "void" => None,
                other => Some(java_type(other)?),
            };
            (UnqualifiedName::from_str(name)?, return_type)
        }
        _ => return Err(format!("Cannot find the method name in '{}'", text)),
    };

    let mut parameters = vec![];
    for parameter in text[open + 1..close].split(',') {
        let parameter = parameter.trim();
        if parameter.is_empty() {
            continue;
        }
        if parameter.ends_with("...") {
            access_flags |= MethodAccessFlags::VARARGS;
        }
        parameters.push(java_type(parameter)?);
    }

    Ok(MemberHeader::Method {
        name,
        access_flags,
        descriptor: MethodDescriptor {
            parameters,
            return_type,
        },
    })
}

/// Convert a Java source type (`int`, `java.lang.String[]`, `long...`) to a field type
///
/// Type variables can't be resolved to their bound, so they are kept as (bogus) class names.
/// Only the width of parameters matters for the analysis, and that is still right.
fn java_type(text: &str) -> Result<FieldType<BinaryName>, String> {
    let mut base = text.trim();
    let mut dimensions = 0;
    if let Some(element) = base.strip_suffix("...") {
        base = element;
        dimensions += 1;
    }
    while let Some(element) = base.strip_suffix("[]") {
        base = element.trim_end();
        dimensions += 1;
    }

    let mut field_type = match BaseType::from_keyword(base) {
        Some(base_type) => FieldType::Base(base_type),
        None => FieldType::object(BinaryName::from_dotted(base)?),
    };
    for _ in 0..dimensions {
        field_type = FieldType::array(field_type);
    }
    Ok(field_type)
}

/// Drop everything between (possibly nested) angle brackets
fn erase_type_arguments(text: &str) -> String {
    let mut erased = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => erased.push(c),
            _ => (),
        }
    }
    erased
}
