//! CSV, TSV and free-form delimited text

use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{FormatParser, ParseError};
use crate::config::{ReadOptions, CANDIDATE_DELIMITERS};

/// Delimited text parser
///
/// With a fixed separator the file is read as-is. Without one the
/// delimiter comes from `ReadOptions::delimiter` or is sniffed from the
/// first non-empty line.
pub struct DelimitedParser {
    separator: Option<u8>,
}

impl DelimitedParser {
    pub fn csv() -> Self {
        Self {
            separator: Some(b','),
        }
    }

    pub fn tsv() -> Self {
        Self {
            separator: Some(b'\t'),
        }
    }

    /// Delimiter decided per file
    pub fn sniffing() -> Self {
        Self { separator: None }
    }

    fn resolve_separator(&self, path: &Path, options: &ReadOptions) -> std::io::Result<u8> {
        if let Some(sep) = self.separator {
            return Ok(sep);
        }
        if let Some(sep) = options.delimiter {
            return Ok(sep);
        }
        let sep = sniff_delimiter(path)?;
        tracing::info!("Detected delimiter {:?} for {}", sep as char, path.display());
        Ok(sep)
    }
}

impl FormatParser for DelimitedParser {
    fn name(&self) -> &'static str {
        match self.separator {
            Some(b',') => "csv",
            Some(b'\t') => "tsv",
            _ => "text",
        }
    }

    fn parse(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame, ParseError> {
        let separator = self.resolve_separator(path, options)?;

        let df = CsvReadOptions::default()
            .with_has_header(options.has_header)
            .with_infer_schema_length(options.infer_schema_length)
            .map_parse_options(|parse| parse.with_separator(separator))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Ok(df)
    }
}

/// Pick the candidate delimiter that occurs most often in the first non-empty line
///
/// Falls back to `,` when none occur.
pub fn sniff_delimiter(path: &Path) -> std::io::Result<u8> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let best = CANDIDATE_DELIMITERS
            .iter()
            .map(|&c| (c, line.bytes().filter(|&b| b == c).count()))
            .filter(|&(_, n)| n > 0)
            .max_by_key(|&(_, n)| n)
            .map(|(c, _)| c);
        return Ok(best.unwrap_or(b','));
    }
    Ok(b',')
}
