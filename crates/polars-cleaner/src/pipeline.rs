//! Single-file cleaning pipeline
//!
//! Load, normalize headers, deduplicate, keep or drop columns, optionally
//! enrich from a lookup table, then write the result. Each stage runs as a
//! named step of the shared [`PerformanceTracker`].

use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{OutputFormat, ReadOptions};
use crate::error::{CleanerError, CleanerResult};
use crate::formats::FormatRegistry;
use crate::lookup::{JoinSpec, LookupCache, LookupJoiner};
use crate::normalize::{normalize_frame, normalize_list};
use crate::perf::PerformanceTracker;
use crate::validation::validate_columns_exist;

/// Lookup table and join to apply after deduplication
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub path: PathBuf,
    pub spec: JoinSpec,
}

/// What to do with one input file
///
/// Column names may be given in any case or punctuation; they are
/// normalized the same way as the file's headers.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub input: PathBuf,
    /// Defaults to `<stem>.cleaned.<ext>` next to the input
    pub output: Option<PathBuf>,
    /// Deduplication columns; all columns when unset
    pub subset: Option<Vec<String>>,
    pub keep: Option<Vec<String>>,
    pub drop: Option<Vec<String>>,
    pub lookup: Option<LookupRequest>,
    pub dry_run: bool,
    pub output_format: OutputFormat,
    pub use_cache: bool,
}

impl CleanOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            subset: None,
            keep: None,
            drop: None,
            lookup: None,
            dry_run: false,
            output_format: OutputFormat::Csv,
            use_cache: true,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_subset(mut self, columns: Vec<String>) -> Self {
        self.subset = Some(columns);
        self
    }

    pub fn with_keep(mut self, columns: Vec<String>) -> Self {
        self.keep = Some(columns);
        self
    }

    pub fn with_drop(mut self, columns: Vec<String>) -> Self {
        self.drop = Some(columns);
        self
    }

    pub fn with_lookup(mut self, path: impl Into<PathBuf>, spec: JoinSpec) -> Self {
        self.lookup = Some(LookupRequest {
            path: path.into(),
            spec,
        });
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Output path, explicit or derived from the input
    pub fn resolved_output(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let file_name = format!("{stem}.cleaned.{}", self.output_format.extension());
        match self.input.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Outcome of cleaning one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub input: PathBuf,
    /// `None` on a dry run
    pub output: Option<PathBuf>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub unmatched_lookup_rows: Option<usize>,
    pub columns: Vec<String>,
}

/// Runs [`CleanOptions`] against files
#[derive(Clone)]
pub struct CleaningPipeline {
    registry: Arc<FormatRegistry>,
    read_options: ReadOptions,
    joiner: LookupJoiner,
    tracker: Arc<PerformanceTracker>,
}

impl CleaningPipeline {
    pub fn new(cache: Arc<LookupCache>) -> Self {
        Self {
            registry: Arc::new(FormatRegistry::new()),
            read_options: ReadOptions::default(),
            joiner: LookupJoiner::new(cache),
            tracker: Arc::new(PerformanceTracker::new()),
        }
    }

    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<PerformanceTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.tracker
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        self.joiner.cache()
    }

    /// Clean one file end to end
    pub fn clean_file(&self, options: &CleanOptions) -> CleanerResult<CleanReport> {
        if options.keep.is_some() && options.drop.is_some() {
            return Err(CleanerError::Config(
                "keep and drop columns are mutually exclusive".to_string(),
            ));
        }

        let tracker = &self.tracker;
        let raw = tracker.step("Load input", || {
            self.registry.load(&options.input, &self.read_options)
        })?;
        let rows_in = raw.height();

        let df = tracker.step("Normalize columns", || normalize_frame(&raw))?;
        drop(raw);

        let mut df = tracker.step("Remove duplicates", || {
            dedupe(&df, options.subset.as_deref())
        })?;
        let duplicates_removed = rows_in - df.height();
        tracing::info!("🧹 Removed {} duplicate rows", duplicates_removed);

        if let Some(keep) = &options.keep {
            df = tracker.step("Keep columns", || keep_columns(&df, keep))?;
        } else if let Some(columns) = &options.drop {
            df = tracker.step("Drop columns", || drop_columns(&df, columns))?;
        }

        let mut unmatched_lookup_rows = None;
        if let Some(lookup) = &options.lookup {
            let outcome = tracker.step("Lookup enrichment", || {
                self.joiner
                    .apply_with_report(&df, &lookup.path, &lookup.spec, options.use_cache)
            })?;
            unmatched_lookup_rows = Some(outcome.unmatched_rows);
            df = outcome.frame;
        }

        let output = if options.dry_run {
            tracing::info!("🔎 Dry run: {} rows would be written", df.height());
            None
        } else {
            let path = options.resolved_output();
            tracker.step("Write output", || {
                write_frame(&mut df, &path, options.output_format)
            })?;
            Some(path)
        };

        Ok(CleanReport {
            input: options.input.clone(),
            output,
            rows_in,
            rows_out: df.height(),
            duplicates_removed,
            unmatched_lookup_rows,
            columns: crate::normalize::column_names(&df),
        })
    }
}

/// Drop repeated rows keeping the first, optionally comparing only `subset`
pub fn dedupe(df: &DataFrame, subset: Option<&[String]>) -> CleanerResult<DataFrame> {
    let subset = match subset {
        Some(columns) if !columns.is_empty() => {
            let columns = normalize_list(columns);
            validate_columns_exist(df, &columns, "deduplication")?;
            Some(columns)
        }
        _ => None,
    };
    Ok(df.unique_stable(subset.as_deref(), UniqueKeepStrategy::First, None)?)
}

/// Keep only `columns`, in the given order
pub fn keep_columns(df: &DataFrame, columns: &[String]) -> CleanerResult<DataFrame> {
    let columns = normalize_list(columns);
    validate_columns_exist(df, &columns, "keep")?;
    Ok(df.select(columns)?)
}

pub fn drop_columns(df: &DataFrame, columns: &[String]) -> CleanerResult<DataFrame> {
    let columns = normalize_list(columns);
    validate_columns_exist(df, &columns, "drop")?;
    Ok(df.drop_many(columns))
}

/// Write `df` as CSV (with header) or Parquet, creating parent directories
pub fn write_frame(df: &mut DataFrame, path: &Path, format: OutputFormat) -> CleanerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    match format {
        OutputFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        OutputFormat::Parquet => {
            ParquetWriter::new(file).finish(df)?;
        }
    }
    tracing::info!("💾 Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pipeline() -> CleaningPipeline {
        CleaningPipeline::new(Arc::new(LookupCache::new()))
    }

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_default_output_path() {
        let options = CleanOptions::new("/data/in/users.xlsx");
        assert_eq!(options.resolved_output(), PathBuf::from("/data/in/users.cleaned.csv"));

        let options = options.with_output_format(OutputFormat::Parquet);
        assert_eq!(
            options.resolved_output(),
            PathBuf::from("/data/in/users.cleaned.parquet")
        );
    }

    #[test]
    fn test_dedupe_by_subset_keeps_first() {
        let dir = TempDir::new().unwrap();
        let input = write(
            &dir,
            "users.csv",
            "Email,Name\na@x.com,first\nb@x.com,bee\na@x.com,second\n",
        );

        let report = pipeline()
            .clean_file(&CleanOptions::new(&input).with_subset(vec!["EMAIL".to_string()]))
            .unwrap();

        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_out, 2);
        assert_eq!(report.duplicates_removed, 1);

        let output = report.output.unwrap();
        assert_eq!(output, dir.path().join("users.cleaned.csv"));
        let text = std::fs::read_to_string(output).unwrap();
        assert_eq!(text, "email,name\na@x.com,first\nb@x.com,bee\n");
    }

    #[test]
    fn test_full_row_dedupe_and_drop() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "rows.csv", "id,Note\n1,x\n1,x\n1,y\n");

        let report = pipeline()
            .clean_file(
                &CleanOptions::new(&input)
                    .with_drop(vec!["note".to_string()])
                    .with_dry_run(true),
            )
            .unwrap();

        assert_eq!(report.rows_out, 2);
        assert_eq!(report.columns, vec!["id"]);
        assert!(report.output.is_none());
        assert!(!dir.path().join("rows.cleaned.csv").exists());
    }

    #[test]
    fn test_keep_and_lookup_to_parquet() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "main.csv", "Email,Name,Age\na@x.com,ann,30\nc@x.com,cy,40\n");
        let lookup = write(&dir, "lookup.csv", "email,User Type\na@x.com,admin\n");
        let output = dir.path().join("out").join("enriched.parquet");

        let options = CleanOptions::new(&input)
            .with_keep(vec!["email".to_string(), "name".to_string()])
            .with_lookup(&lookup, JoinSpec::new("Email", ["user_type"]))
            .with_output(&output)
            .with_output_format(OutputFormat::Parquet);
        let report = pipeline().clean_file(&options).unwrap();

        assert_eq!(report.unmatched_lookup_rows, Some(1));
        assert_eq!(report.columns, vec!["email", "name", "user_type"]);

        let df = ParquetReader::new(File::open(&output).unwrap()).finish().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("user_type").unwrap().null_count(), 1);
    }

    #[test]
    fn test_keep_and_drop_conflict() {
        let options = CleanOptions::new("unused.csv")
            .with_keep(vec!["a".to_string()])
            .with_drop(vec!["b".to_string()]);
        assert!(matches!(pipeline().clean_file(&options), Err(CleanerError::Config(_))));
    }

    #[test]
    fn test_missing_subset_column() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "users.csv", "email\na\n");

        let err = pipeline()
            .clean_file(&CleanOptions::new(&input).with_subset(vec!["phone".to_string()]))
            .unwrap_err();
        assert!(matches!(err, CleanerError::MissingColumns { .. }));
    }

    #[test]
    fn test_steps_are_tracked() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "users.csv", "email\na\n");
        let pipeline = pipeline();

        pipeline
            .clean_file(&CleanOptions::new(&input).with_dry_run(true))
            .unwrap();

        let names: Vec<String> = pipeline
            .tracker()
            .summary()
            .steps
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Load input", "Normalize columns", "Remove duplicates"]);
    }
}
