//! Configuration types for reading, advising and cleaning

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CleanerResult;

/// Extensions accepted as pipeline or conversion input
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "csv", "parquet", "xls", "xlsx", "txt", "tsv", "json", "jsonl",
];

/// Extensions accepted for lookup tables
pub const SUPPORTED_LOOKUP_EXTENSIONS: &[&str] = &["csv", "parquet", "json", "jsonl", "xls", "xlsx"];

/// Delimiters tried when a text file has no explicit delimiter
pub const CANDIDATE_DELIMITERS: &[u8] = &[b',', b'\t', b';', b'|'];

/// Options passed to every format parser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Field delimiter for delimited text; `None` lets the parser decide
    pub delimiter: Option<u8>,
    pub has_header: bool,
    /// Rows used for schema inference on CSV-like input
    pub infer_schema_length: Option<usize>,
    /// Excel sheet by name; first sheet when unset
    pub sheet: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            infer_schema_length: Some(1000),
            sheet: None,
        }
    }
}

impl ReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

/// Thresholds used by the resource advisor
///
/// Sizes are in MiB, chunk sizes in rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Upper bound (exclusive) of the small bucket
    pub small_threshold_mb: f64,
    /// Upper bound (exclusive) of the medium bucket
    pub medium_threshold_mb: f64,
    /// Upper bound (exclusive) of the large bucket
    pub large_threshold_mb: f64,
    pub small_chunk_rows: usize,
    pub medium_chunk_rows: usize,
    pub large_chunk_rows: usize,
    /// Hard cap applied to every recommendation
    pub max_chunk_rows: usize,
    /// Floor for the memory-based size of oversized files
    pub min_oversized_chunk_rows: usize,
    /// Share of available memory one oversized chunk may use
    pub oversized_memory_share: f64,
    /// Estimated rows in one MiB of input
    pub rows_per_mb: f64,
    /// Estimated in-memory KiB per row
    pub memory_usage_factor: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            small_threshold_mb: 50.0,
            medium_threshold_mb: 500.0,
            large_threshold_mb: 2048.0,
            small_chunk_rows: 50_000,
            medium_chunk_rows: 100_000,
            large_chunk_rows: 200_000,
            max_chunk_rows: 500_000,
            min_oversized_chunk_rows: 50_000,
            oversized_memory_share: 0.2,
            rows_per_mb: 1000.0,
            memory_usage_factor: 0.7,
        }
    }
}

/// Output format of the cleaning pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Process-level defaults, loadable from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Directory for converted CSV files
    pub convert_dir: PathBuf,
    pub num_workers: usize,
    pub output_format: OutputFormat,
    pub use_cache: bool,
    pub advisor: AdvisorConfig,
    pub read: ReadOptions,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            convert_dir: PathBuf::from("./converted"),
            num_workers: 4,
            output_format: OutputFormat::Csv,
            use_cache: true,
            advisor: AdvisorConfig::default(),
            read: ReadOptions::default(),
        }
    }
}

impl CleanerConfig {
    /// Load from a JSON file; missing keys fall back to defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> CleanerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_convert_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.convert_dir = dir.into();
        self
    }

    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_use_cache(mut self, enable: bool) -> Self {
        self.use_cache = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cleaner_config_builder() {
        let config = CleanerConfig::default()
            .with_convert_dir("/tmp/out")
            .with_num_workers(0)
            .with_output_format(OutputFormat::Parquet)
            .with_use_cache(false);

        assert_eq!(config.convert_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.num_workers, 1);
        assert_eq!(config.output_format, OutputFormat::Parquet);
        assert!(!config.use_cache);
    }

    #[test]
    fn test_partial_json_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"num_workers": 8, "output_format": "parquet", "advisor": {{"max_chunk_rows": 300000}}}}"#
        )
        .unwrap();

        let config = CleanerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.output_format, OutputFormat::Parquet);
        assert_eq!(config.advisor.max_chunk_rows, 300_000);
        assert_eq!(config.advisor.small_chunk_rows, 50_000);
        assert!(config.use_cache);
    }

    #[test]
    fn test_read_options_default() {
        let options = ReadOptions::default();
        assert!(options.has_header);
        assert_eq!(options.delimiter, None);
        assert_eq!(options.with_delimiter(b'|').delimiter, Some(b'|'));
    }
}
