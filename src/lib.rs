//! Find misused `assert` statements in compiled JVM methods
//!
//! `javac` compiles `assert cond;` into a guarded block: the synthetic `$assertionsDisabled`
//! field is read, and if assertions are enabled, the condition is evaluated and an
//! `AssertionError` is thrown when it fails. Since that block may never run, two things don't
//! belong in it:
//!
//!   - checks on the arguments of public methods, which should happen unconditionally
//!     ([`diagnostics::DiagnosticKind::ArgumentInAssert`])
//!
//!   - side effects, which would make the behaviour of the program depend on whether assertions
//!     are enabled ([`diagnostics::DiagnosticKind::SideEffectCallInAssert`] and
//!     [`diagnostics::DiagnosticKind::SideEffectStoreInAssert`])
//!
//! The [`detector::Detector`] walks the instructions of each method once, tracking an abstract
//! operand stack ([`provenance`]) and whether it is inside an `assert` block ([`tracker`]), and
//! hands instructions in those blocks to the [`classify`] rules.
//!
//! ```
//! use assertlint::{catalog::SideEffectCatalog, detector::Detector, listing, settings::Settings};
//!
//! # fn run() -> Result<(), assertlint::errors::Error> {
//! let source = [
//!     "public class Checked {",
//!     "  public static int check(int);",
//!     "    descriptor: (I)I",
//!     "    Code:",
//!     "       0: getstatic     #7     // Field $assertionsDisabled:Z",
//!     "       3: ifne          20",
//!     "       6: iload_0",
//!     "       7: bipush        10",
//!     "       9: if_icmplt     20",
//!     "      12: new           #13    // class java/lang/AssertionError",
//!     "      15: dup",
//!     "      16: invokespecial #15    // Method java/lang/AssertionError.\"<init>\":()V",
//!     "      19: athrow",
//!     "      20: iload_0",
//!     "      21: ireturn",
//!     "    LineNumberTable:",
//!     "      line 3: 0",
//!     "      line 4: 20",
//!     "}",
//! ]
//! .join("\n");
//! let classes = listing::parse_listing(&source)?;
//!
//! let settings = Settings::default();
//! let catalog = SideEffectCatalog::default();
//! let diagnostics = Detector::new(&settings, &catalog).analyze_classes(&classes);
//!
//! // `assert x < 10;` checks the parameter
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].to_string(), "DA_DONT_ASSERT_ARGS Checked.check line 3");
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

pub mod catalog;
pub mod classify;
pub mod detector;
pub mod diagnostics;
pub mod errors;
pub mod jvm;
pub mod listing;
pub mod provenance;
pub mod settings;
pub mod tracker;
pub mod util;
