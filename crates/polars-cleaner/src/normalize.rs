//! Column name normalization
//!
//! Every column name is lowercased and each maximal run of characters that
//! are not letters, digits or `_` is collapsed to a single `_`. The same rule
//! is applied to main data, lookup tables and user-supplied column lists so
//! that comparisons are insensitive to case and punctuation.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::error::{CleanerError, CleanerResult};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid pattern"));

/// Normalize a single column name
///
/// # Example
/// ```rust
/// use polars_cleaner::normalize;
///
/// assert_eq!(normalize("User Type"), "user_type");
/// assert_eq!(normalize("E-mail (primary)"), "e_mail_primary_");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(name: &str) -> String {
    NON_WORD.replace_all(&name.to_lowercase(), "_").into_owned()
}

/// Normalize a list of names, failing if two distinct names collide
pub fn normalize_all<I, S>(names: I) -> CleanerResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashMap<String, Vec<String>> = HashMap::new();
    let mut normalized = Vec::new();

    for name in names {
        let raw = name.as_ref();
        let canonical = normalize(raw);
        seen.entry(canonical.clone()).or_default().push(raw.to_string());
        normalized.push(canonical);
    }

    // Report the first collision in column order
    for canonical in &normalized {
        if let Some(raws) = seen.get(canonical) {
            if raws.len() > 1 {
                return Err(CleanerError::AmbiguousColumns {
                    normalized: canonical.clone(),
                    columns: raws.clone(),
                });
            }
        }
    }

    Ok(normalized)
}

/// Normalize a user-supplied list without collision checks
pub fn normalize_list<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().map(|n| normalize(n.as_ref())).collect()
}

/// Column names of `df` as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Return a copy of `df` with normalized column names
pub fn normalize_frame(df: &DataFrame) -> CleanerResult<DataFrame> {
    let names = normalize_all(column_names(df))?;
    let mut renamed = df.clone();
    renamed.set_column_names(names.iter().map(|n| n.as_str()))?;
    Ok(renamed)
}
