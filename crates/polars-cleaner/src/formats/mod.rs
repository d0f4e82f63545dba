//! Format dispatch by file extension
//!
//! Every reader implements the `FormatParser` trait and is registered under
//! one or more lowercase extensions. Callers load files through the
//! [`FormatRegistry`], which owns extension checks and maps parser failures
//! onto `CleanerError::LoadFailure`; new formats are added by registering a
//! parser, without touching cache or join code.

use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

mod columnar;
mod delimited;
mod excel;
mod traits;

pub use columnar::{JsonParser, ParquetParser};
pub use delimited::{sniff_delimiter, DelimitedParser};
pub use excel::ExcelParser;
pub use traits::{FormatParser, ParseError};

use crate::config::{ReadOptions, SUPPORTED_LOOKUP_EXTENSIONS};
use crate::error::{CleanerError, CleanerResult};

/// Lowercase extension of `path` without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Registry mapping extensions to parsers
#[derive(Clone)]
pub struct FormatRegistry {
    parsers: HashMap<String, Arc<dyn FormatParser>>,
}

impl FormatRegistry {
    /// Registry with every built-in input format
    pub fn new() -> Self {
        let mut registry = Self::lookup_formats();
        registry.register("tsv", Arc::new(DelimitedParser::tsv()));
        registry.register("txt", Arc::new(DelimitedParser::sniffing()));
        registry
    }

    /// Registry limited to the formats accepted for lookup tables
    pub fn lookup_formats() -> Self {
        let mut registry = Self::empty();
        registry.register("csv", Arc::new(DelimitedParser::csv()));
        registry.register("parquet", Arc::new(ParquetParser));
        registry.register("json", Arc::new(JsonParser::json()));
        registry.register("jsonl", Arc::new(JsonParser::json_lines()));
        let excel: Arc<dyn FormatParser> = Arc::new(ExcelParser);
        registry.register("xls", excel.clone());
        registry.register("xlsx", excel);
        debug_assert!(SUPPORTED_LOOKUP_EXTENSIONS
            .iter()
            .all(|ext| registry.supports(ext)));
        registry
    }

    /// Registry with no parsers
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Add or replace the parser for `extension`
    pub fn register(&mut self, extension: &str, parser: Arc<dyn FormatParser>) {
        self.parsers
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), parser);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.parsers.contains_key(&extension.to_ascii_lowercase())
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.parsers.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// Parser registered for `path`'s extension
    pub fn parser_for(&self, path: &Path) -> CleanerResult<Arc<dyn FormatParser>> {
        let extension = extension_of(path).unwrap_or_default();
        self.parsers
            .get(&extension)
            .cloned()
            .ok_or_else(|| CleanerError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
    }

    /// Resolve the parser, check the file exists, and parse it
    ///
    /// Fails with `UnsupportedFormat`, `NotFound` or `LoadFailure`, in that order.
    pub fn load(&self, path: &Path, options: &ReadOptions) -> CleanerResult<DataFrame> {
        let parser = self.parser_for(path)?;
        if !path.is_file() {
            return Err(CleanerError::NotFound(path.to_path_buf()));
        }

        tracing::debug!("Parsing {} as {}", path.display(), parser.name());
        parser.parse(path, options).map_err(|e| {
            tracing::error!("Failed to load {}: {}", path.display(), e);
            CleanerError::load_failure(path, e)
        })
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
