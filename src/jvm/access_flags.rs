use bitflags::bitflags;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl ClassAccessFlags {
    /// Flag corresponding to a modifier keyword in a class declaration
    ///
    /// `class` and `enum` are included since `javap` prints them in the same position as the
    /// modifiers. Keywords with no flag (eg. `sealed`) map to the empty set.
    pub fn from_keyword(keyword: &str) -> Option<ClassAccessFlags> {
        Some(match keyword {
            "public" => ClassAccessFlags::PUBLIC,
            "final" => ClassAccessFlags::FINAL,
            "abstract" => ClassAccessFlags::ABSTRACT,
            "interface" => ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
            "@interface" => {
                ClassAccessFlags::ANNOTATION
                    | ClassAccessFlags::INTERFACE
                    | ClassAccessFlags::ABSTRACT
            }
            "enum" => ClassAccessFlags::ENUM,
            "class" | "record" | "sealed" | "non-sealed" | "strictfp" | "static" | "private"
            | "protected" => ClassAccessFlags::empty(),
            _ => return None,
        })
    }
}

impl MethodAccessFlags {
    /// Flag corresponding to a modifier keyword in a method declaration
    ///
    /// `default` (on interface methods) has no flag and maps to the empty set.
    pub fn from_keyword(keyword: &str) -> Option<MethodAccessFlags> {
        Some(match keyword {
            "public" => MethodAccessFlags::PUBLIC,
            "private" => MethodAccessFlags::PRIVATE,
            "protected" => MethodAccessFlags::PROTECTED,
            "static" => MethodAccessFlags::STATIC,
            "final" => MethodAccessFlags::FINAL,
            "synchronized" => MethodAccessFlags::SYNCHRONIZED,
            "native" => MethodAccessFlags::NATIVE,
            "abstract" => MethodAccessFlags::ABSTRACT,
            "strictfp" => MethodAccessFlags::STRICT,
            "default" => MethodAccessFlags::empty(),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(
            ClassAccessFlags::from_keyword("public"),
            Some(ClassAccessFlags::PUBLIC)
        );
        assert_eq!(
            ClassAccessFlags::from_keyword("class"),
            Some(ClassAccessFlags::empty())
        );
        assert_eq!(ClassAccessFlags::from_keyword("int"), None);
        assert_eq!(
            MethodAccessFlags::from_keyword("static"),
            Some(MethodAccessFlags::STATIC)
        );
        assert_eq!(MethodAccessFlags::from_keyword("void"), None);
    }
}
