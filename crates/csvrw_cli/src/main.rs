//! csvrw CLI
//!
//! Command-line tools for reading CSV files and exercising the engines.
//!
//! # Commands
//!
//! - `print` - Print the records of a CSV file
//! - `stress` - Run the randomized write/read stress harness
//! - `version` - Show version information

mod commands;
mod util;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// csvrw command-line tools.
#[derive(Parser)]
#[command(name = "csvrw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a CSV file
    Print {
        /// Path to the CSV file
        path: PathBuf,

        /// Reject malformed quoting
        #[arg(short, long)]
        strict: bool,

        /// Translate CRLF inside quoted fields to LF
        #[arg(short, long)]
        text_mode: bool,

        /// Report lines without fields as empty records
        #[arg(short = 'e', long)]
        process_empty: bool,

        /// Do not probe for a UTF-8 byte-order mark
        #[arg(long)]
        skip_bom_check: bool,

        /// Field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Print only this record (1-based)
        #[arg(short, long)]
        record: Option<u64>,

        /// Read buffer size in bytes
        #[arg(short, long, default_value_t = csvrw_core::DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,

        /// Trim trailing spaces from displayed values
        #[arg(long)]
        trim: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run the randomized write/read stress harness
    Stress {
        /// Number of iterations, unlimited when omitted
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Generator seed, random when omitted
        #[arg(short, long)]
        seed: Option<u64>,

        /// Upper bound on records, fields and bytes per iteration
        #[arg(short, long, default_value_t = csvrw_testkit::DEFAULT_MAX_SPACE)]
        max_space: usize,

        /// Working directory for the scratch file and failure records
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Replay a saved failure record
        #[arg(short, long)]
        resume: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Print {
            path,
            strict,
            text_mode,
            process_empty,
            skip_bom_check,
            delimiter,
            record,
            buffer_size,
            trim,
            format,
        } => {
            let options = commands::print::PrintOptions {
                flags: csvrw_core::ReadFlags::none()
                    .strict_mode(strict)
                    .text_mode(text_mode)
                    .process_empty_records(process_empty)
                    .skip_utf8_bom_check(skip_bom_check),
                delimiter,
                record,
                buffer_size,
                trim,
            };
            commands::print::run(&path, &options, &format)?;
        }
        Commands::Stress {
            iterations,
            seed,
            max_space,
            dir,
            resume,
        } => {
            let dir = dir.unwrap_or_else(std::env::temp_dir);
            commands::stress::run(&dir, iterations, seed, max_space, resume.as_deref())?;
        }
        Commands::Version => {
            println!("csvrw CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("csvrw Core v{}", csvrw_core::VERSION);
        }
    }

    Ok(())
}
