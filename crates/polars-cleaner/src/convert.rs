//! Conversion of non-CSV inputs to CSV
//!
//! CSV and Parquet are read directly by the cleaning pipeline and pass
//! through untouched. Everything else is parsed through the format registry
//! and written to `<output_dir>/<stem>.converted.csv`.

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::advisor::{ResourceAdvisor, ResourceAdvisory};
use crate::config::{ReadOptions, ALLOWED_EXTENSIONS};
use crate::error::{CleanerError, CleanerResult};
use crate::formats::{extension_of, FormatRegistry};
use crate::perf::format_file_size;
use crate::validation::validate_file_path;

/// Extensions the pipeline reads without conversion
pub const PASSTHROUGH_EXTENSIONS: &[&str] = &["csv", "parquet"];

/// Converts tabular inputs to CSV
pub struct Converter {
    registry: FormatRegistry,
    read_options: ReadOptions,
    advisor: ResourceAdvisor,
}

impl Converter {
    pub fn new() -> Self {
        Self {
            registry: FormatRegistry::new(),
            read_options: ReadOptions::default(),
            advisor: ResourceAdvisor::default(),
        }
    }

    /// Delimiter for `.txt` inputs; sniffed when unset
    pub fn with_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.read_options.delimiter = delimiter;
        self
    }

    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    /// Advisor whose verdict decides the size and memory warnings
    pub fn with_advisor(mut self, advisor: ResourceAdvisor) -> Self {
        self.advisor = advisor;
        self
    }

    /// Path of a CSV (or Parquet) file holding the data in `input`
    pub fn convert_to_csv_if_needed(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> CleanerResult<PathBuf> {
        self.convert_with_advisory(input, output_dir)
            .map(|(path, _)| path)
    }

    /// Like [`convert_to_csv_if_needed`](Self::convert_to_csv_if_needed),
    /// also returning the resource advisory computed for `input`
    pub fn convert_with_advisory(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> CleanerResult<(PathBuf, ResourceAdvisory)> {
        validate_file_path(input, ALLOWED_EXTENSIONS)?;
        let advisory = self.advisor.advise_path(input)?;

        let extension = extension_of(input).unwrap_or_default();
        if PASSTHROUGH_EXTENSIONS.contains(&extension.as_str()) {
            tracing::info!(
                "ℹ️ Skipping conversion. File already in supported format: {}",
                input.display()
            );
            return Ok((input.to_path_buf(), advisory));
        }

        std::fs::create_dir_all(output_dir)?;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CleanerError::InvalidPath(input.display().to_string()))?;
        let output = output_dir.join(format!("{stem}.converted.csv"));

        let size = std::fs::metadata(input)?.len();
        tracing::info!(
            "🔄 Converting .{} file ({}) to CSV: {}",
            extension,
            format_file_size(size),
            input.display()
        );
        let mut df = self.registry.load(input, &self.read_options).map_err(|e| {
            log_conversion_hint(&e);
            e
        })?;
        tracing::info!("📊 Loaded {} rows, {} columns", df.height(), df.width());

        if df.height() == 0 || df.width() == 0 {
            return Err(CleanerError::EmptyInput(input.to_path_buf()));
        }

        let mut file = File::create(&output)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

        tracing::info!("✅ Successfully converted to CSV: {}", output.display());
        Ok((output, advisory))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert with default read options and an optional `.txt` delimiter
pub fn convert_to_csv_if_needed(
    input: &Path,
    output_dir: &Path,
    delimiter: Option<u8>,
) -> CleanerResult<PathBuf> {
    Converter::new()
        .with_delimiter(delimiter)
        .convert_to_csv_if_needed(input, output_dir)
}

fn log_conversion_hint(error: &CleanerError) {
    let message = error.to_string().to_lowercase();
    if message.contains("utf-8") || message.contains("utf8") || message.contains("encoding") {
        tracing::info!("💡 Tip: The file may not be UTF-8 encoded. Re-save it as UTF-8 and retry");
    } else if message.contains("delimiter") || message.contains("separator") || message.contains("field") {
        tracing::info!("💡 Tip: Try specifying a custom delimiter with --delimiter option");
    } else if message.contains("memory") {
        tracing::info!("💡 Tip: File might be too large. Consider splitting it into smaller chunks");
    }
}
