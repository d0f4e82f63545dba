//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use polars_cleaner::OutputFormat;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "data-cleaner",
    version,
    about = "🧼 Clean CSV/Excel files with deduplication, filtering, and enrichment",
    after_help = "Example: data-cleaner --input sample.xlsx --subset Email --lookup lookup.csv --lookup-key Email --lookup-fields User_Type,Region"
)]
pub struct Cli {
    /// Input file paths or glob patterns
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path (single input only)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Comma-separated columns for deduplication
    #[arg(short, long, value_delimiter = ',')]
    pub subset: Option<Vec<String>>,

    /// Comma-separated columns to keep
    #[arg(short, long, value_delimiter = ',', conflicts_with = "drop")]
    pub keep: Option<Vec<String>>,

    /// Comma-separated columns to drop
    #[arg(short, long, value_delimiter = ',')]
    pub drop: Option<Vec<String>>,

    /// Directory for converted files
    #[arg(long, env = "DATA_CLEANER_CONVERT_DIR")]
    pub convert_dir: Option<PathBuf>,

    /// Delimiter for .txt inputs (sniffed when omitted); `\t` for tab
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,

    /// Path to lookup file
    #[arg(long, requires_all = ["lookup_key", "lookup_fields"])]
    pub lookup: Option<PathBuf>,

    /// Column to join on
    #[arg(long, requires = "lookup")]
    pub lookup_key: Option<String>,

    /// Comma-separated fields to join from lookup
    #[arg(long, value_delimiter = ',', requires = "lookup")]
    pub lookup_fields: Option<Vec<String>>,

    /// Match lookup keys case-insensitively
    #[arg(long, requires = "lookup")]
    pub lookup_ignore_case: bool,

    /// Perform a dry run without writing output
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, env = "DATA_CLEANER_OUTPUT_FORMAT")]
    pub output_format: Option<FormatArg>,

    /// Number of worker threads for parallel processing
    #[arg(long, env = "DATA_CLEANER_NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// Disable caching of the lookup table
    #[arg(long)]
    pub no_cache: bool,

    /// JSON configuration file; flags override its values
    #[arg(long, env = "DATA_CLEANER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print a JSON report per input to stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ => {
            let bytes = value.as_bytes();
            if bytes.len() == 1 {
                Ok(bytes[0])
            } else {
                Err(format!("delimiter must be a single ASCII character, got {value:?}"))
            }
        }
    }
}
