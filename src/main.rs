use assertlint::catalog::{SideEffectCatalog, SideEffectDatabase};
use assertlint::detector::Detector;
use assertlint::diagnostics::{Diagnostic, DiagnosticKind};
use assertlint::errors::Error;
use assertlint::listing::parse_listing;
use assertlint::settings::{Rules, Settings};
use assertlint::tracker::ExitIdiom;

use clap::{command, value_parser, Arg, ArgAction};
use std::fs;
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = command!()
        .about("Finds misused assertions in disassembled JVM classes (`javap -c -l -s -p` output)")
        .arg(
            Arg::new("side-effects")
                .long("side-effects")
                .value_name("FILE")
                .help("Side effect verdicts for methods, one `owner.name:descriptor verdict` per line")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("rule")
                .long("rule")
                .help("Only run some rules (defaults to all of them)")
                .value_parser(["args", "side-effects"])
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exit-idiom")
                .long("exit-idiom")
                .help("Instruction ending an assertion: `new AssertionError` or its constructor call")
                .value_parser(["new", "init"])
                .default_value("new"),
        )
        .arg(
            Arg::new("all-members")
                .long("all-members")
                .help("Also analyze non-public methods and classes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_parser(["auto", "always", "never"])
                .default_value("auto"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Listing files, or directories to search for `*.javap` files")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let settings = Settings {
        rules: match matches.get_many::<String>("rule") {
            None => Rules::all(),
            Some(rules) => rules
                .filter_map(|rule| Rules::from_keyword(rule))
                .fold(Rules::empty(), |acc, rule| acc | rule),
        },
        exit_idiom: match matches.get_one::<String>("exit-idiom").map(String::as_str) {
            Some("init") => ExitIdiom::ConstructorCall,
            _ => ExitIdiom::Allocation,
        },
        public_only: !matches.get_flag("all-members"),
    };
    let color_choice = match matches.get_one::<String>("color").map(String::as_str) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    };

    let catalog = match matches.get_one::<PathBuf>("side-effects") {
        None => SideEffectCatalog::default(),
        Some(path) => {
            log::info!("Reading side effect verdicts from '{}'", path.display());
            let source = fs::read_to_string(path)?;
            let database = SideEffectDatabase::parse(&source)?;
            SideEffectCatalog::new(Box::new(database))
        }
    };

    // Find all of the listings
    let mut listings: Vec<PathBuf> = vec![];
    for input in matches.get_many::<PathBuf>("INPUT").into_iter().flatten() {
        if input.is_dir() {
            listings.extend(
                WalkDir::new(input)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .map(|e| e.into_path())
                    .filter(|e| e.is_file() && e.extension().map_or(false, |ex| ex == "javap")),
            );
        } else {
            listings.push(input.clone());
        }
    }

    let detector = Detector::new(&settings, &catalog);
    let stdout = StandardStream::stdout(color_choice);
    let mut count = 0;
    for listing in &listings {
        log::info!("Analyzing '{}'", listing.display());
        let diagnostics = analyze_listing(&detector, listing)?;
        count += diagnostics.len();

        let mut s = stdout.lock();
        for diagnostic in &diagnostics {
            print_diagnostic(&mut s, diagnostic)?;
        }
    }
    log::info!(
        "Found {} diagnostics in {} listings",
        count,
        listings.len()
    );

    Ok(())
}

fn analyze_listing(detector: &Detector, path: &Path) -> Result<Vec<Diagnostic>, Error> {
    let source = fs::read_to_string(path)?;
    let classes = parse_listing(&source).map_err(|err| {
        log::error!("Could not decode '{}'", path.display());
        err
    })?;
    Ok(detector.analyze_classes(&classes))
}

fn print_diagnostic(s: &mut impl WriteColor, diagnostic: &Diagnostic) -> std::io::Result<()> {
    let color = match diagnostic.kind {
        DiagnosticKind::ArgumentInAssert => Color::Yellow,
        DiagnosticKind::SideEffectCallInAssert | DiagnosticKind::SideEffectStoreInAssert => {
            Color::Red
        }
    };
    s.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(s, "{}", diagnostic.kind)?;
    s.reset()?;
    write!(s, " {}.{} line ", diagnostic.class, diagnostic.method)?;
    match diagnostic.line {
        Some(line) => writeln!(s, "{}", line),
        None => writeln!(s, "?"),
    }
}
