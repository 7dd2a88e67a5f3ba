//! # Loadcomb CLI Application
//!
//! Compiles a combination rule file and prints the resulting load
//! combinations, as text or as JSON for a downstream solver.
//!
//! ```text
//! combo_cli rules.txt --base g --base q --select '&^ULS' --json
//! ```
//!
//! Files ending in `.json` are rule-set documents; anything else is read as
//! plain rule text, one rule per line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combo_core::{load_rule_set, read_rule_lines, Combination, ComboResult, RuleSet};

#[derive(Parser, Debug)]
#[command(name = "combo_cli")]
#[command(about = "Expand load-case combination rules into concrete combinations")]
struct Args {
    /// Rule file: plain text, or a `.json` rule-set document
    file: PathBuf,

    /// Declare a base load case (repeatable)
    #[arg(long = "base", short = 'b', value_name = "NAME")]
    base: Vec<String>,

    /// Combination name, or `&REGEX` (repeatable); default prints all
    #[arg(long = "select", short = 's', value_name = "PATTERN")]
    select: Vec<String>,

    /// Print combinations as JSON
    #[arg(long)]
    json: bool,

    /// Override the alternative limit of the rule set
    #[arg(long, value_name = "N")]
    max_alternatives: Option<usize>,

    /// Resolve every rule up front
    #[arg(long)]
    eager: bool,
}

fn load(path: &Path) -> ComboResult<RuleSet> {
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        return load_rule_set(path);
    }

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut rule_set = RuleSet::new(title);
    rule_set.rules = read_rule_lines(path)?;
    Ok(rule_set)
}

fn run(args: &Args) -> ComboResult<Vec<Combination>> {
    let mut rule_set = load(&args.file)?;

    rule_set.base_cases.extend(args.base.iter().cloned());
    if let Some(limit) = args.max_alternatives {
        rule_set.settings.max_alternatives = Some(limit);
    }
    if args.eager {
        rule_set.settings.eager = true;
    }

    info!(
        file = %args.file.display(),
        rules = rule_set.rule_count(),
        "compiling rule set"
    );
    let registry = rule_set.compile()?;

    if args.select.is_empty() {
        registry.ordered_combinations()
    } else {
        registry.select(&args.select)
    }
}

fn print_text(combinations: &[Combination]) {
    for combination in combinations {
        let count = combination.len();
        println!(
            "{} ({} alternative{})",
            combination.name,
            count,
            if count == 1 { "" } else { "s" }
        );
        for (index, case) in combination.iter().enumerate() {
            println!("  [{}] {}", index, case);
        }
        if let Some(options) = &combination.options {
            if let Ok(json) = serde_json::to_string(options) {
                println!("  options: {}", json);
            }
        }
        println!();
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(combinations) if args.json => match serde_json::to_string_pretty(&combinations) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(combinations) => {
            print_text(&combinations);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}
