//! Input validation: header lines, file paths and column presence

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CleanerError, CleanerResult};
use crate::formats::extension_of;
use crate::normalize::column_names;

static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\w\s,.\-@()\[\]{}:;'"+=<>?/\\*&%$#!~`|]+$"#).expect("valid pattern")
});

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s]+").expect("valid pattern"));

/// Check that a CSV header line holds only expected characters
///
/// Word characters (any script), whitespace and common punctuation are
/// accepted. Blank lines are rejected.
pub fn validate_header_line(header: &str) -> bool {
    let trimmed = header.trim();
    !trimmed.is_empty() && HEADER_PATTERN.is_match(trimmed)
}

/// First line of a text file, without the line terminator
pub fn read_header_line(path: &Path) -> CleanerResult<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read and check the header of a delimited file
pub fn validate_header(path: &Path) -> CleanerResult<String> {
    let header = read_header_line(path)?;
    if !validate_header_line(&header) {
        return Err(CleanerError::InvalidHeader(header));
    }
    Ok(header)
}

/// Validate a path for safety, presence, readability and extension
///
/// `allowed_extensions` are lowercase and without the dot; an empty slice
/// accepts any extension.
pub fn validate_file_path(path: &Path, allowed_extensions: &[&str]) -> CleanerResult<()> {
    let display = path.to_string_lossy();
    if display.is_empty() || display.contains("..") {
        return Err(CleanerError::InvalidPath(
            "path is empty or contains '..'".to_string(),
        ));
    }

    if !path.exists() {
        return Err(CleanerError::NotFound(path.to_path_buf()));
    }

    if let Err(e) = File::open(path) {
        return Err(match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                CleanerError::PermissionDenied(path.to_path_buf())
            }
            _ => CleanerError::Io(e),
        });
    }

    if !allowed_extensions.is_empty() {
        let extension = extension_of(path).unwrap_or_default();
        if !allowed_extensions.contains(&extension.as_str()) {
            return Err(CleanerError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            });
        }
    }

    Ok(())
}

/// Fail with `MissingColumns` unless every name in `columns` is present
pub fn validate_columns_exist(
    df: &DataFrame,
    columns: &[String],
    operation: &str,
) -> CleanerResult<()> {
    let available = column_names(df);
    let present: HashSet<&str> = available.iter().map(|s| s.as_str()).collect();
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| !present.contains(c.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    for name in &missing {
        let suggestions = suggest_similar_columns(name, &available, 3);
        if !suggestions.is_empty() {
            tracing::warn!("Column '{}' not found for {}. Did you mean: {:?}?", name, operation, suggestions);
        }
    }

    Err(CleanerError::MissingColumns {
        operation: operation.to_string(),
        missing,
        available,
    })
}

fn similarity_score(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let a_tokens: HashSet<&str> = TOKEN_SPLIT.split(&a).collect();
    let b_tokens: HashSet<&str> = TOKEN_SPLIT.split(&b).collect();
    let total = a_tokens.union(&b_tokens).count();
    if total == 0 {
        return 0.0;
    }
    a_tokens.intersection(&b_tokens).count() as f64 / total as f64
}

/// Up to `max_suggestions` names from `available` resembling `target`, best first
pub fn suggest_similar_columns(
    target: &str,
    available: &[String],
    max_suggestions: usize,
) -> Vec<String> {
    let mut scored: Vec<(&String, f64)> = available
        .iter()
        .map(|col| (col, similarity_score(target, col)))
        .filter(|&(_, score)| score > 0.2)
        .collect();
    // Stable sort keeps column order among equal scores
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(col, _)| col.clone())
        .collect()
}
