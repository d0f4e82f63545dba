//! Lookup enrichment
//!
//! [`LookupCache`] loads and normalizes lookup tables once per process;
//! [`LookupJoiner`] validates a [`JoinSpec`] and left-joins the requested
//! columns onto a main frame.

mod cache;
mod join;

pub use cache::{canonical_path, CacheStats, LookupCache, LookupCacheEntry};
pub use join::{left_join_first_match, validate_join, JoinOutcome, JoinSpec, LookupJoiner};
