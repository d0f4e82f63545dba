//! Process-lifetime cache of normalized lookup tables
//!
//! Entries are keyed by canonical absolute path and never evicted; lookup
//! tables are expected to be few and small next to the main data. The
//! mutex is held across check, load and insert so concurrent callers never
//! parse the same file twice.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::ReadOptions;
use crate::error::CleanerResult;
use crate::formats::FormatRegistry;
use crate::normalize::normalize_frame;

/// A loaded, normalized lookup table
#[derive(Debug, Clone)]
pub struct LookupCacheEntry {
    pub frame: DataFrame,
    pub loaded_at: DateTime<Utc>,
    /// Parser that produced the frame
    pub format: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Parses performed, cached or not
    pub loads: u64,
}

/// Absolute path with `.` and `..` resolved lexically
///
/// The filesystem is not consulted, so cached entries stay addressable
/// even if the file is later removed.
pub fn canonical_path(path: &Path) -> CleanerResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut canonical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                canonical.pop();
            }
            other => canonical.push(other.as_os_str()),
        }
    }
    Ok(canonical)
}

/// Cache of lookup tables shared by every join in the process
pub struct LookupCache {
    registry: FormatRegistry,
    read_options: ReadOptions,
    entries: Mutex<HashMap<PathBuf, LookupCacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl LookupCache {
    /// Cache reading csv, parquet, json, jsonl, xls and xlsx
    pub fn new() -> Self {
        Self::with_registry(FormatRegistry::lookup_formats())
    }

    /// Cache using a custom set of parsers
    pub fn with_registry(registry: FormatRegistry) -> Self {
        Self {
            registry,
            read_options: ReadOptions::default(),
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn with_read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    /// Normalized lookup frame for `path`
    ///
    /// With `use_cache` a stored entry is returned without touching storage,
    /// and a fresh load is stored. Without it the file is always re-parsed
    /// and the cache is left as it was.
    pub fn get(&self, path: impl AsRef<Path>, use_cache: bool) -> CleanerResult<DataFrame> {
        let key = canonical_path(path.as_ref())?;

        if !use_cache {
            let entry = self.load(&key)?;
            tracing::info!("📤 Lookup loaded without caching: {}", key.display());
            return Ok(entry.frame);
        }

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache HIT for lookup: {}", key.display());
            tracing::info!("🔁 Using cached lookup DataFrame.");
            return Ok(entry.frame.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Cache MISS for lookup: {}", key.display());
        let entry = self.load(&key)?;
        let frame = entry.frame.clone();
        entries.insert(key.clone(), entry);
        tracing::info!("✅ Cached lookup DataFrame from: {}", key.display());

        Ok(frame)
    }

    fn load(&self, path: &Path) -> CleanerResult<LookupCacheEntry> {
        let start = Instant::now();
        let parser = self.registry.parser_for(path)?;
        let raw = self.registry.load(path, &self.read_options)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        let frame = normalize_frame(&raw)?;

        tracing::info!(
            event = "lookup_load",
            path = %path.display(),
            format = parser.name(),
            rows = frame.height(),
            columns = frame.width(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Loaded lookup table"
        );

        Ok(LookupCacheEntry {
            frame,
            loaded_at: Utc::now(),
            format: parser.name(),
        })
    }

    /// Cached entry for `path`, if any
    pub fn entry(&self, path: impl AsRef<Path>) -> Option<LookupCacheEntry> {
        let key = canonical_path(path.as_ref()).ok()?;
        self.entries.lock().get(&key).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entry(path).is_some()
    }

    /// Drop every entry and zero the counters
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        tracing::info!("Lookup cache reset ({} entries dropped)", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanerError;
    use crate::formats::{FormatParser, ParseError};
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Parser that counts calls and returns a fixed table
    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    impl FormatParser for CountingParser {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn parse(&self, _path: &Path, _options: &ReadOptions) -> Result<DataFrame, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(df!("Email" => ["a@x.com"], "Region" => ["US"])?)
        }
    }

    fn counting_cache() -> (LookupCache, Arc<AtomicUsize>, TempDir, PathBuf) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = FormatRegistry::empty();
        registry.register(
            "csv",
            Arc::new(CountingParser {
                calls: calls.clone(),
            }),
        );

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lookup.csv");
        std::fs::write(&path, "ignored").unwrap();

        (LookupCache::with_registry(registry), calls, dir, path)
    }

    #[test]
    fn test_cached_get_parses_once() {
        let (cache, calls, _dir, path) = counting_cache();

        let first = cache.get(&path, true).unwrap();
        let second = cache.get(&path, true).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.equals(&second));
        assert_eq!(cache.stats(), CacheStats { entries: 1, hits: 1, misses: 1, loads: 1 });
    }

    #[test]
    fn test_uncached_get_always_parses() {
        let (cache, calls, _dir, path) = counting_cache();

        cache.get(&path, false).unwrap();
        cache.get(&path, false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());

        cache.get(&path, true).unwrap();
        cache.get(&path, false).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_equivalent_paths_share_an_entry() {
        let (cache, calls, dir, path) = counting_cache();
        let dotted = dir.path().join(".").join("sub").join("..").join("lookup.csv");

        cache.get(&path, true).unwrap();
        cache.get(&dotted, true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_entry_survives_file_removal() {
        let (cache, _calls, _dir, path) = counting_cache();
        cache.get(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(cache.get(&path, true).is_ok());
        assert!(matches!(cache.get(&path, false), Err(CleanerError::NotFound(_))));
    }

    #[test]
    fn test_reset_forces_reload() {
        let (cache, calls, _dir, path) = counting_cache();
        cache.get(&path, true).unwrap();
        cache.reset();
        assert!(cache.is_empty());

        cache.get(&path, true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_columns_are_normalized_and_timestamped() {
        let (cache, _calls, _dir, path) = counting_cache();
        let before = Utc::now();
        let frame = cache.get(&path, true).unwrap();

        assert_eq!(crate::normalize::column_names(&frame), vec!["email", "region"]);
        let entry = cache.entry(&path).unwrap();
        assert!(entry.loaded_at >= before);
        assert_eq!(entry.format, "counting");
    }

    #[test]
    fn test_load_errors() {
        let cache = LookupCache::new();
        let dir = TempDir::new().unwrap();

        let txt = dir.path().join("lookup.txt");
        std::fs::write(&txt, "a,b").unwrap();
        assert!(matches!(cache.get(&txt, true), Err(CleanerError::UnsupportedFormat { .. })));

        let missing = dir.path().join("missing.csv");
        assert!(matches!(cache.get(&missing, true), Err(CleanerError::NotFound(_))));

        let distinct = dir.path().join("distinct.csv");
        let mut file = std::fs::File::create(&distinct).unwrap();
        writeln!(file, "Email,E-mail\na,b").unwrap();
        drop(file);
        // "email" and "e_mail" do not collide
        assert!(cache.get(&distinct, true).is_ok());

        let clash = dir.path().join("clash.csv");
        std::fs::write(&clash, "Email,EMAIL\na,b\n").unwrap();
        assert!(matches!(cache.get(&clash, true), Err(CleanerError::AmbiguousColumns { .. })));
        assert!(!cache.contains(&clash));
    }

    #[test]
    fn test_concurrent_gets_load_once() {
        let (cache, calls, _dir, path) = counting_cache();
        let cache = Arc::new(cache);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let cache = cache.clone();
                let path = path.clone();
                scope.spawn(move || {
                    cache.get(&path, true).unwrap();
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 7);
    }
}
