//! Core trait for format parsers

use polars::prelude::*;
use std::path::Path;

use crate::config::ReadOptions;

/// Error raised by a parser; mapped to `CleanerError::LoadFailure` by the registry
pub type ParseError = Box<dyn std::error::Error + Send + Sync>;

/// Reads one file format into a DataFrame
///
/// Implementations only parse. Extension dispatch, existence checks and
/// error mapping are handled by [`FormatRegistry`](super::FormatRegistry).
pub trait FormatParser: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Parse the file at `path`
    fn parse(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame, ParseError>;
}
