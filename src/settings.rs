use crate::tracker::ExitIdiom;

bitflags::bitflags! {
    /// Families of diagnostics to look for
    pub struct Rules: u8 {
        /// Parameters checked inside `assert` (`DA_DONT_ASSERT_ARGS`)
        const ARGUMENTS = 0x01;

        /// Calls and stores inside `assert` (`DA_DONT_ASSERT_SIDE_EFFECT*`)
        const SIDE_EFFECTS = 0x02;
    }
}

impl Rules {
    pub fn from_keyword(keyword: &str) -> Option<Rules> {
        match keyword {
            "args" => Some(Rules::ARGUMENTS),
            "side-effects" => Some(Rules::SIDE_EFFECTS),
            _ => None,
        }
    }
}

pub struct Settings {
    /// Which classifiers to run
    pub rules: Rules,

    /// Instruction that ends an `assert` region
    pub exit_idiom: ExitIdiom,

    /// Only analyze public methods of public classes
    ///
    /// Assertions are a fine way to check arguments of methods that can't be called from outside
    /// the class, so non-public members are normally skipped.
    pub public_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rules: Rules::all(),
            exit_idiom: ExitIdiom::default(),
            public_only: true,
        }
    }
}
