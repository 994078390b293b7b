use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use premia_core::{CalculationCriteria, Formula, Quantity};
use premia_eval::RatingResult;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Premia premium rating engine.
#[derive(Parser)]
#[command(name = "premia", version, about = "Data-driven premium rating engine")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula against calculation criteria
    Rate {
        /// Path to the formula JSON file
        #[arg(long)]
        formula: PathBuf,
        /// Path to the criteria JSON file
        #[arg(long)]
        criteria: PathBuf,
    },

    /// Compile a formula against criteria without evaluating it
    Check {
        /// Path to the formula JSON file
        #[arg(long)]
        formula: PathBuf,
        /// Path to the criteria JSON file
        #[arg(long)]
        criteria: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rate { formula, criteria } => {
            cmd_rate(&formula, &criteria, cli.output, cli.quiet);
        }
        Commands::Check { formula, criteria } => {
            cmd_check(&formula, &criteria, cli.output, cli.quiet);
        }
    }
}

fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::json!({ "error": msg });
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", msg);
            }
        }
    }
}

fn load_formula(path: &Path) -> Result<Formula, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("reading formula '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("parsing formula '{}': {}", path.display(), e))
}

fn load_criteria(path: &Path) -> Result<CalculationCriteria, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("reading criteria '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("parsing criteria '{}': {}", path.display(), e))
}

fn cmd_rate(formula_path: &Path, criteria_path: &Path, output: OutputFormat, quiet: bool) {
    let (formula, criteria) = match (load_formula(formula_path), load_criteria(criteria_path)) {
        (Ok(f), Ok(c)) => (f, c),
        (Err(e), _) | (_, Err(e)) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match premia_eval::rate(&formula, &criteria) {
        Ok(result) => match output {
            OutputFormat::Json => {
                let pretty = serde_json::to_string_pretty(&result.to_json())
                    .unwrap_or_else(|e| format!("serialization error: {}", e));
                println!("{}", pretty);
            }
            OutputFormat::Text => print_worksheet(&result, quiet),
        },
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn print_worksheet(result: &RatingResult, quiet: bool) {
    if !quiet {
        for (index, phase) in result.phases.iter().enumerate() {
            println!("#{:<3} {:<14} {}", index, phase.operation, phase.output.describe());
            if let Quantity::LineItems(items) = &phase.output {
                for item in &items.items {
                    match item.amount() {
                        Some(amount) => println!("       {:<24} {}", item.name, amount),
                        None => println!("       {:<24} (rejected)", item.name),
                    }
                }
                if let Some(regulatory) = items.regulatory {
                    println!("       {:<24} {}", "(regulatory)", regulatory);
                }
            }
        }
    }
    match result.premium() {
        Some(premium) => println!("premium: {}", premium),
        None => println!("premium: none"),
    }
}

fn cmd_check(formula_path: &Path, criteria_path: &Path, output: OutputFormat, quiet: bool) {
    let (formula, criteria) = match (load_formula(formula_path), load_criteria(criteria_path)) {
        (Ok(f), Ok(c)) => (f, c),
        (Err(e), _) | (_, Err(e)) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match premia_eval::compile(&formula, &criteria.schema()) {
        Ok(_) => match output {
            OutputFormat::Json => {
                let ok_json = serde_json::json!({
                    "ok": true,
                    "instructions": formula.instructions.len(),
                });
                println!("{}", ok_json);
            }
            OutputFormat::Text => {
                if !quiet {
                    println!(
                        "formula ok: {} instruction(s) resolved",
                        formula.instructions.len()
                    );
                }
            }
        },
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
