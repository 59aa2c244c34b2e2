//! Colguard command-line interface
//!
//! - `colguard validate`: validate a data file against a schema file
//! - `colguard schema show`: print a schema declaration

use clap::{Parser, Subcommand};
use colguard_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::validate::Outcome;

/// Exit code when the data does not conform
const EXIT_INVALID: u8 = 1;
/// Exit code for usage, I/O and schema errors
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "colguard", version, about = "Validate tabular data against declarative schemas")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a data file (csv, json, jsonl, parquet) against a schema
    Validate {
        /// Schema declaration (.json, .yaml, .yml)
        #[arg(short, long)]
        schema: PathBuf,

        /// Data file to validate
        #[arg(short, long)]
        data: PathBuf,

        /// Stop at the first failure instead of reporting all of them
        #[arg(long)]
        eager: bool,

        /// Worker threads for column-parallel validation
        #[arg(long, env = "COLGUARD_THREADS", default_value = "1")]
        threads: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Write the validated (coerced) table to this file (.parquet or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect schema declarations
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand, Debug)]
enum SchemaAction {
    /// Show the columns and options of a schema
    Show {
        /// Schema declaration (.json, .yaml, .yml)
        file: PathBuf,

        /// Print the normalized declaration as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "colguard",
        verbose: cli.verbose,
        log_file: cli.log_file.clone(),
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let result = match cli.command {
        Commands::Validate {
            schema,
            data,
            eager,
            threads,
            json,
            output,
        } => cli::validate::run(cli::validate::ValidateArgs {
            schema,
            data,
            eager,
            threads,
            json,
            output,
        }),
        Commands::Schema { action } => match action {
            SchemaAction::Show { file, json } => {
                cli::schema::show(&file, json).map(|()| Outcome::Valid)
            }
        },
    };

    match result {
        Ok(Outcome::Valid) => ExitCode::SUCCESS,
        Ok(Outcome::Invalid) => ExitCode::from(EXIT_INVALID),
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
