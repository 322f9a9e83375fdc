//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Compile a csv++ template into a plain CSV file.
#[derive(Debug, Parser)]
#[command(name = "csvpp", version, about)]
pub struct Cli {
    /// Source file to compile (.csvpp)
    pub input: PathBuf,

    /// Write the compiled CSV here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Variables to define, as `name=value` pairs separated by commas
    #[arg(short, long, value_name = "PAIRS")]
    pub key_values: Option<String>,

    /// Number of empty columns to place before the output
    #[arg(short = 'x', long, value_name = "N")]
    pub offset_columns: Option<usize>,

    /// Number of empty rows to place before the output
    #[arg(short = 'y', long, value_name = "N")]
    pub offset_rows: Option<usize>,

    /// Copy an existing output file aside before overwriting it
    #[arg(short, long)]
    pub backup: bool,

    /// Create the output file's directory if it does not exist
    #[arg(short, long)]
    pub create: bool,

    /// Log compilation progress to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Read defaults from this TOML file instead of the user config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
