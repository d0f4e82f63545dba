//! Polars Tabular Cleaning
//!
//! This crate cleans tabular files with Polars, focusing on the messy
//! spreadsheets and exports that land in data pipelines:
//!
//! - **Format Conversion**: Excel, JSON, JSONL, TSV and delimited text to CSV
//! - **Column Normalization**: Case and punctuation insensitive headers
//! - **Deduplication**: Stable, keep-first, by subset or whole row
//! - **Lookup Enrichment**: Cached lookup tables joined with first-match-wins
//! - **Resource Advice**: Chunk sizing and memory-safety checks per file
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use polars::prelude::*;
//! use polars_cleaner::{JoinSpec, LookupCache, LookupJoiner};
//!
//! # fn main() -> polars_cleaner::CleanerResult<()> {
//! let cache = Arc::new(LookupCache::new());
//! let joiner = LookupJoiner::new(cache);
//!
//! let main = df!("Email" => ["a@x.com", "b@x.com"])?;
//! let spec = JoinSpec::new("email", ["region"]);
//!
//! // Appends `region` from the lookup table; row count is unchanged
//! let enriched = joiner.apply(&main, "regions.csv", &spec, true)?;
//! assert_eq!(enriched.height(), 2);
//! # Ok(())
//! # }
//! ```

mod advisor;
mod batch;
mod config;
mod convert;
mod error;
pub mod formats;
mod lookup;
mod memory;
mod normalize;
mod perf;
mod pipeline;
mod validation;

pub use advisor::{ResourceAdvisor, ResourceAdvisory, SizeBucket};
pub use batch::{expand_inputs, BatchRunner};
pub use config::{
    AdvisorConfig, CleanerConfig, OutputFormat, ReadOptions, ALLOWED_EXTENSIONS,
    CANDIDATE_DELIMITERS, SUPPORTED_LOOKUP_EXTENSIONS,
};
pub use convert::{convert_to_csv_if_needed, Converter};
pub use error::{CleanerError, CleanerResult, JoinSide};
pub use formats::{FormatParser, FormatRegistry, ParseError};
pub use lookup::{
    canonical_path, left_join_first_match, validate_join, CacheStats, JoinOutcome, JoinSpec,
    LookupCache, LookupCacheEntry, LookupJoiner,
};
pub use memory::{log_system_info, MemoryProbe};
pub use normalize::{column_names, normalize, normalize_all, normalize_frame, normalize_list};
pub use perf::{format_duration, format_file_size, PerformanceSummary, PerformanceTracker, StepMetrics};
pub use pipeline::{
    dedupe, drop_columns, keep_columns, write_frame, CleanOptions, CleanReport, CleaningPipeline,
    LookupRequest,
};
pub use validation::{
    read_header_line, suggest_similar_columns, validate_columns_exist, validate_file_path,
    validate_header, validate_header_line,
};
