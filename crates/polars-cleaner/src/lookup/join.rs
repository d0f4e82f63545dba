//! Left-join enrichment of a main frame from a cached lookup table

use polars::prelude::*;
use polars_core::utils::try_get_supertype;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::cache::LookupCache;
use crate::error::{CleanerError, CleanerResult, JoinSide};
use crate::normalize::{column_names, normalize, normalize_frame, normalize_list};
use crate::validation::suggest_similar_columns;

const ROW_INDEX: &str = "__polars_cleaner_row_nr";
const MATCH_MARKER: &str = "__lookup_matched";
const JOIN_KEY: &str = "__lookup_key";

/// Names of the temporary columns used during one join
struct HelperColumns {
    row_index: String,
    marker: String,
    key: String,
}

impl HelperColumns {
    /// Helper names absent from both frames
    fn free_in(main: &DataFrame, lookup: &DataFrame) -> Self {
        let taken: HashSet<String> = column_names(main)
            .into_iter()
            .chain(column_names(lookup))
            .collect();
        Self {
            row_index: free_name(ROW_INDEX, &taken),
            marker: free_name(MATCH_MARKER, &taken),
            key: free_name(JOIN_KEY, &taken),
        }
    }
}

fn free_name(base: &str, taken: &HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 0usize;
    while taken.contains(&name) {
        suffix += 1;
        name = format!("{base}_{suffix}");
    }
    name
}

/// Join key and the lookup columns to append
///
/// Names are normalized before use, so `"E-mail"` and `"e_mail"` are equivalent.
/// Key values match exactly unless `ignore_key_case` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub key: String,
    pub return_columns: Vec<String>,
    /// Compare string keys after lowercasing both sides
    pub ignore_key_case: bool,
}

impl JoinSpec {
    pub fn new<I, S>(key: impl Into<String>, return_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            return_columns: return_columns.into_iter().map(Into::into).collect(),
            ignore_key_case: false,
        }
    }

    pub fn with_ignore_key_case(mut self, ignore: bool) -> Self {
        self.ignore_key_case = ignore;
        self
    }

    /// Copy with key and return columns normalized
    ///
    /// Return columns equal to the key are dropped, as are repeats.
    pub fn normalized(&self) -> Self {
        let key = normalize(&self.key);
        let mut seen = HashSet::new();
        let return_columns = normalize_list(&self.return_columns)
            .into_iter()
            .filter(|c| *c != key && seen.insert(c.clone()))
            .collect();
        Self {
            key,
            return_columns,
            ignore_key_case: self.ignore_key_case,
        }
    }
}

/// Enriched frame plus the number of main rows without a lookup match
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub frame: DataFrame,
    pub unmatched_rows: usize,
}

/// Check a normalized join spec against normalized frames
///
/// Fails before any join work with `MissingJoinKey`, `MissingReturnColumn`
/// or `ReturnColumnCollision`, in that order.
pub fn validate_join(main: &DataFrame, lookup: &DataFrame, spec: &JoinSpec) -> CleanerResult<()> {
    let main_columns = column_names(main);
    let lookup_columns = column_names(lookup);

    if !main_columns.contains(&spec.key) {
        return Err(CleanerError::MissingJoinKey {
            key: spec.key.clone(),
            side: JoinSide::Main,
            available: main_columns,
        });
    }
    if !lookup_columns.contains(&spec.key) {
        return Err(CleanerError::MissingJoinKey {
            key: spec.key.clone(),
            side: JoinSide::Lookup,
            available: lookup_columns,
        });
    }

    let missing: Vec<String> = spec
        .return_columns
        .iter()
        .filter(|c| !lookup_columns.contains(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        for name in &missing {
            let suggestions = suggest_similar_columns(name, &lookup_columns, 3);
            if !suggestions.is_empty() {
                tracing::warn!("Lookup field '{}' not found. Did you mean: {:?}?", name, suggestions);
            }
        }
        return Err(CleanerError::MissingReturnColumn { missing });
    }

    let collisions: Vec<String> = spec
        .return_columns
        .iter()
        .filter(|c| main_columns.contains(c))
        .cloned()
        .collect();
    if !collisions.is_empty() {
        return Err(CleanerError::ReturnColumnCollision {
            columns: collisions,
        });
    }

    Ok(())
}

/// Left join keeping every main row once and in order
///
/// Duplicate lookup keys resolve to their first occurrence. Null keys never
/// match. Both frames must already be normalized and validated.
pub fn left_join_first_match(
    main: &DataFrame,
    lookup: &DataFrame,
    spec: &JoinSpec,
) -> CleanerResult<JoinOutcome> {
    let helpers = HelperColumns::free_in(main, lookup);
    let main_dtype = main.column(&spec.key)?.dtype();
    let lookup_dtype = lookup.column(&spec.key)?.dtype();
    // supertype, so no key value is truncated into a false match
    let key_dtype = try_get_supertype(main_dtype, lookup_dtype)?;

    let main_key =
        join_key_column(main, &spec.key, &key_dtype, spec.ignore_key_case, &helpers.key)?;
    let lookup_key =
        join_key_column(lookup, &spec.key, &key_dtype, spec.ignore_key_case, &helpers.key)?;

    let mut columns = vec![lookup_key];
    for name in &spec.return_columns {
        columns.push(lookup.column(name)?.clone());
    }
    let mut right = DataFrame::new(columns)?.unique_stable(
        Some(&[helpers.key.clone()]),
        UniqueKeepStrategy::First,
        None,
    )?;
    let height = right.height();
    right.with_column(Column::new(helpers.marker.as_str().into(), vec![true; height]))?;

    let mut left = main.with_row_index(helpers.row_index.as_str().into(), None)?;
    left.with_column(main_key)?;

    let joined = left
        .left_join(&right, [helpers.key.as_str()], [helpers.key.as_str()])?
        .sort([helpers.row_index.as_str()], SortMultipleOptions::default())?;

    if joined.height() != main.height() {
        return Err(CleanerError::RowCountMismatch {
            expected: main.height(),
            actual: joined.height(),
        });
    }

    let unmatched_rows = joined.column(&helpers.marker)?.null_count();
    let frame = joined
        .drop(&helpers.row_index)?
        .drop(&helpers.key)?
        .drop(&helpers.marker)?;

    Ok(JoinOutcome {
        frame,
        unmatched_rows,
    })
}

/// Key column of `df` cast to `dtype`, optionally lowercased, renamed to `name`
fn join_key_column(
    df: &DataFrame,
    key: &str,
    dtype: &DataType,
    fold_case: bool,
    name: &str,
) -> CleanerResult<Column> {
    let mut column = df.column(key)?.cast(dtype)?;
    if fold_case && column.dtype() == &DataType::String {
        let folded: StringChunked = column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_lowercase))
            .collect();
        column = folded.into_column();
    }
    Ok(column.with_name(name.into()))
}

/// Applies lookup enrichment through a shared cache
#[derive(Clone)]
pub struct LookupJoiner {
    cache: Arc<LookupCache>,
}

impl LookupJoiner {
    pub fn new(cache: Arc<LookupCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    /// Enrich `main` with `spec.return_columns` from the table at `lookup_path`
    ///
    /// The result has normalized column names and exactly `main.height()` rows.
    pub fn apply(
        &self,
        main: &DataFrame,
        lookup_path: impl AsRef<Path>,
        spec: &JoinSpec,
        use_cache: bool,
    ) -> CleanerResult<DataFrame> {
        self.apply_with_report(main, lookup_path, spec, use_cache)
            .map(|outcome| outcome.frame)
    }

    /// Same as [`apply`](Self::apply), also reporting unmatched rows
    pub fn apply_with_report(
        &self,
        main: &DataFrame,
        lookup_path: impl AsRef<Path>,
        spec: &JoinSpec,
        use_cache: bool,
    ) -> CleanerResult<JoinOutcome> {
        let lookup_path = lookup_path.as_ref();
        let start = Instant::now();

        let main = normalize_frame(main)?;
        let lookup = self.cache.get(lookup_path, use_cache)?;
        let spec = spec.normalized();

        validate_join(&main, &lookup, &spec)?;
        let outcome = left_join_first_match(&main, &lookup, &spec)?;

        tracing::info!(
            event = "lookup_join",
            lookup = %lookup_path.display(),
            key = %spec.key,
            return_columns = ?spec.return_columns,
            rows = outcome.frame.height(),
            unmatched_rows = outcome.unmatched_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "Lookup join complete"
        );
        if outcome.unmatched_rows > 0 {
            tracing::warn!(
                "⚠️ {} of {} rows had no match in {}",
                outcome.unmatched_rows,
                outcome.frame.height(),
                lookup_path.display()
            );
        }

        Ok(outcome)
    }
}
