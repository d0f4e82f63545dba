//! Parquet and JSON readers backed by polars

use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use super::{FormatParser, ParseError};
use crate::config::ReadOptions;

pub struct ParquetParser;

impl FormatParser for ParquetParser {
    fn name(&self) -> &'static str {
        "parquet"
    }

    fn parse(&self, path: &Path, _options: &ReadOptions) -> Result<DataFrame, ParseError> {
        let df = ParquetReader::new(File::open(path)?).finish()?;
        Ok(df)
    }
}

/// JSON array of records, or newline-delimited records
pub struct JsonParser {
    lines: bool,
}

impl JsonParser {
    pub fn json() -> Self {
        Self { lines: false }
    }

    pub fn json_lines() -> Self {
        Self { lines: true }
    }
}

impl FormatParser for JsonParser {
    fn name(&self) -> &'static str {
        if self.lines {
            "jsonl"
        } else {
            "json"
        }
    }

    fn parse(&self, path: &Path, _options: &ReadOptions) -> Result<DataFrame, ParseError> {
        let format = if self.lines {
            JsonFormat::JsonLines
        } else {
            JsonFormat::Json
        };

        let df = JsonReader::new(File::open(path)?)
            .with_json_format(format)
            .finish()?;
        Ok(df)
    }
}
