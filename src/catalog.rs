//! Knowledge about which calls mutate observable state
//!
//! There are two sources of truth:
//!
//!   - a fixed list of well-known mutator names from the collections framework (`add`,
//!     `remove`, `offer`, ...). These are matched by bare name, regardless of which type declares
//!     the method, so an unrelated user-defined `add` is flagged too.
//!
//!   - a [`SideEffectOracle`], usually a [`SideEffectDatabase`] precomputed by some whole-program
//!     analysis, consulted for every other call.

use crate::errors::Error;
use crate::jvm::MethodRef;
use std::collections::{HashMap, HashSet};
use std::iter::FromIterator;

/// Mutator names flagged regardless of the type that declares them
///
/// The `...Occurence` spellings are intentional: they are matched exactly as written.
pub const SIDE_EFFECT_METHOD_NAMES: [&str; 12] = [
    "add",
    "addAll",
    "remove",
    "removeAll",
    "removeElement",        // Vector
    "retainAll",            // Vector
    "offer",                // Queue
    "offerFirst",           // Deque
    "offerLast",            // Deque
    "removeFirstOccurence", // Deque
    "removeLastOccurence",  // Deque
    "addIfAbsent",          // CopyOnWriteArrayList
];

/// What is known about the side effects of a method
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SideEffectVerdict {
    NoSideEffect,
    SideEffect,
    Unknown,
}

impl SideEffectVerdict {
    /// Keywords used in verdict files
    ///
    /// `object-side-effect` marks methods that only mutate their receiver, and is read as a
    /// side effect.
    pub fn from_keyword(keyword: &str) -> Option<SideEffectVerdict> {
        Some(match keyword {
            "no-side-effect" => SideEffectVerdict::NoSideEffect,
            "side-effect" | "object-side-effect" => SideEffectVerdict::SideEffect,
            "unknown" => SideEffectVerdict::Unknown,
            _ => return None,
        })
    }
}

/// Source of side effect verdicts for methods outside of [`SIDE_EFFECT_METHOD_NAMES`]
///
/// Oracles are consulted concurrently and must not change once analysis starts.
pub trait SideEffectOracle: Send + Sync {
    fn verdict(&self, method: &MethodRef) -> SideEffectVerdict;
}

/// Frozen table of verdicts, keyed by `owner.name:descriptor`
///
/// There is deliberately no way to add entries after construction.
#[derive(Debug, Default, Clone)]
pub struct SideEffectDatabase {
    verdicts: HashMap<String, SideEffectVerdict>,
}

impl SideEffectDatabase {
    /// Decode a verdict file
    ///
    /// Each non-empty line that isn't a `#` comment holds a method key and a verdict:
    ///
    /// ```text
    /// # owner.name:descriptor            verdict
    /// java/util/List.clear:()V            side-effect
    /// java/util/List.size:()I             no-side-effect
    /// ```
    pub fn parse(source: &str) -> Result<SideEffectDatabase, Error> {
        let mut verdicts = HashMap::new();
        for (idx, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |message: String| Error::MalformedDatabase {
                line: idx + 1,
                message,
            };

            let mut words = line.split_whitespace();
            let key = words.next().unwrap_or_default();
            let verdict = words
                .next()
                .ok_or_else(|| malformed(format!("Missing verdict for '{}'", key)))?;
            if let Some(extra) = words.next() {
                return Err(malformed(format!("Unexpected trailing '{}'", extra)));
            }
            if !key.contains('.') || !key.contains(":(") {
                return Err(malformed(format!(
                    "Expected 'owner.name:descriptor' but got '{}'",
                    key
                )));
            }
            let verdict = SideEffectVerdict::from_keyword(verdict)
                .ok_or_else(|| malformed(format!("Unknown verdict '{}'", verdict)))?;
            verdicts.insert(key.to_owned(), verdict);
        }
        log::debug!("Loaded {} side effect verdicts", verdicts.len());
        Ok(SideEffectDatabase { verdicts })
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

impl FromIterator<(String, SideEffectVerdict)> for SideEffectDatabase {
    fn from_iter<I: IntoIterator<Item = (String, SideEffectVerdict)>>(iter: I) -> Self {
        SideEffectDatabase {
            verdicts: iter.into_iter().collect(),
        }
    }
}

impl SideEffectOracle for SideEffectDatabase {
    fn verdict(&self, method: &MethodRef) -> SideEffectVerdict {
        self.verdicts
            .get(&method.to_string())
            .copied()
            .unwrap_or(SideEffectVerdict::Unknown)
    }
}

/// Decides whether a call inside an assertion is side-effecting
pub struct SideEffectCatalog {
    names: HashSet<&'static str>,
    oracle: Box<dyn SideEffectOracle>,
}

impl SideEffectCatalog {
    pub fn new(oracle: Box<dyn SideEffectOracle>) -> SideEffectCatalog {
        SideEffectCatalog {
            names: SIDE_EFFECT_METHOD_NAMES.iter().copied().collect(),
            oracle,
        }
    }

    /// Should a call to this method be treated as side-effecting?
    ///
    /// Only a confident [`SideEffectVerdict::SideEffect`] from the oracle counts.
    pub fn is_side_effecting(&self, method: &MethodRef) -> bool {
        if self.names.contains(method.name.as_ref()) {
            return true;
        }
        match self.oracle.verdict(method) {
            SideEffectVerdict::SideEffect => true,
            SideEffectVerdict::NoSideEffect | SideEffectVerdict::Unknown => false,
        }
    }
}

impl Default for SideEffectCatalog {
    /// Catalog with only the well-known names (every oracle lookup is unknown)
    fn default() -> Self {
        SideEffectCatalog::new(Box::new(SideEffectDatabase::default()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{BinaryName, MethodDescriptor, Name, ParseDescriptor, RefType, UnqualifiedName};

    fn method(owner: &str, name: &str, descriptor: &str) -> MethodRef {
        MethodRef {
            owner: RefType::Object(BinaryName::from_str(owner).unwrap()),
            name: UnqualifiedName::from_str(name).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
        }
    }

    #[test]
    fn names_match_on_any_owner() {
        let catalog = SideEffectCatalog::default();
        assert!(catalog.is_side_effecting(&method("java/util/List", "add", "(Ljava/lang/Object;)Z")));
        assert!(catalog.is_side_effecting(&method("me/alec/Counter", "add", "(I)I")));
        assert!(catalog.is_side_effecting(&method("java/util/Deque", "offerFirst", "(Ljava/lang/Object;)V")));
        assert!(!catalog.is_side_effecting(&method("java/util/List", "size", "()I")));
        assert!(!catalog.is_side_effecting(&method(
            "java/util/Deque",
            "removeFirstOccurrence",
            "(Ljava/lang/Object;)Z"
        )));
    }

    #[test]
    fn oracle_verdicts() {
        let database: SideEffectDatabase = vec![
            (String::from("java/util/List.clear:()V"), SideEffectVerdict::SideEffect),
            (String::from("java/util/List.size:()I"), SideEffectVerdict::NoSideEffect),
            (String::from("me/alec/Cache.get:(I)I"), SideEffectVerdict::Unknown),
        ]
        .into_iter()
        .collect();
        let catalog = SideEffectCatalog::new(Box::new(database));

        assert!(catalog.is_side_effecting(&method("java/util/List", "clear", "()V")));
        assert!(!catalog.is_side_effecting(&method("java/util/List", "size", "()I")));
        assert!(!catalog.is_side_effecting(&method("me/alec/Cache", "get", "(I)I")));
        assert!(!catalog.is_side_effecting(&method("me/alec/Cache", "put", "(II)V")));
    }

    #[test]
    fn parse_database() {
        let database = SideEffectDatabase::parse(
            "# verdicts\n\
             java/util/List.clear:()V   side-effect\n\
             \n\
             java/util/List.size:()I    no-side-effect\n\
             java/util/Iterator.next:()Ljava/lang/Object;    object-side-effect\n",
        )
        .unwrap();
        assert_eq!(database.len(), 3);
        assert_eq!(
            database.verdict(&method("java/util/Iterator", "next", "()Ljava/lang/Object;")),
            SideEffectVerdict::SideEffect
        );
        assert_eq!(
            database.verdict(&method("java/util/List", "clear", "()V")),
            SideEffectVerdict::SideEffect
        );
        assert_eq!(
            database.verdict(&method("java/util/List", "isEmpty", "()Z")),
            SideEffectVerdict::Unknown
        );
    }

    #[test]
    fn parse_database_errors() {
        assert!(matches!(
            SideEffectDatabase::parse("java/util/List.clear:()V\n"),
            Err(Error::MalformedDatabase { line: 1, .. })
        ));
        assert!(matches!(
            SideEffectDatabase::parse("\njava/util/List.clear:()V maybe\n"),
            Err(Error::MalformedDatabase { line: 2, .. })
        ));
        assert!(matches!(
            SideEffectDatabase::parse("clear side-effect\n"),
            Err(Error::MalformedDatabase { line: 1, .. })
        ));
    }
}
