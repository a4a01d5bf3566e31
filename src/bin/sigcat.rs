//! Entrypoint for the declaration catalogue validator.
//!
//! Validates each catalogue file, prints the findings as text lines or one
//! JSON summary, and exits 0 when every file is clean, 1 when any file has
//! findings, and 2 when a file could not be read or its block structure is
//! broken.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use sigcat::config::ValidatorOptions;
use sigcat::logging::init_tracing;
use sigcat::{FileOutcome, analyze_path, exit_status, summary_json, validate_paths};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sigcat", version, about = "Validate declaration catalogue files")]
struct Cli {
    /// Catalogue files to validate.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// External type table (JSON) merged over the core table; repeatable.
    #[arg(long = "external-types", value_name = "PATH")]
    external_types: Vec<PathBuf>,

    /// Do not merge the built-in core type table.
    #[arg(long)]
    no_core_types: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print each catalogue in canonical form; findings go to stderr.
    #[arg(long)]
    print_catalogue: bool,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("sigcat: {err:#}");
            std::process::exit(2);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let options = ValidatorOptions::from_sources(&cli.external_types, !cli.no_core_types)?;

    if cli.print_catalogue {
        return print_catalogues(&cli, &options);
    }

    let outcomes = validate_paths(&cli.files, &options);
    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary_json(&outcomes))?);
        }
        OutputFormat::Text => {
            for outcome in &outcomes {
                match outcome {
                    FileOutcome::Checked(report) => print!("{}", report.render_text()),
                    FileOutcome::Fatal { error, .. } => eprintln!("sigcat: {error}"),
                }
            }
        }
    }
    Ok(exit_status(&outcomes))
}

fn print_catalogues(cli: &Cli, options: &ValidatorOptions) -> Result<i32> {
    let mut code = 0;
    for path in &cli.files {
        let analysis = analyze_path(path, options)?;
        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&analysis.catalogue)?);
            }
            OutputFormat::Text => print!("{}", analysis.catalogue),
        }
        eprint!("{}", analysis.report.render_text());
        if !analysis.report.is_clean() {
            code = 1;
        }
    }
    Ok(code)
}
