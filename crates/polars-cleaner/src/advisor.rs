//! Chunk sizing and memory-safety advice
//!
//! The advisor classifies an input by size, recommends a chunk row count and
//! flags inputs whose estimated in-memory footprint exceeds the available
//! memory. `advise` is pure; `advise_path` probes the filesystem and the OS
//! before delegating to it.

use serde::Serialize;
use std::path::Path;
use std::time::Instant;

use crate::config::AdvisorConfig;
use crate::error::{CleanerError, CleanerResult};
use crate::memory::MemoryProbe;
use crate::perf::format_file_size;

const MIB: f64 = 1024.0 * 1024.0;

/// Size class of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
    Oversized,
}

/// Result of one advisory call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAdvisory {
    pub bucket: SizeBucket,
    /// Recommended rows per batch
    pub chunk_rows: usize,
    /// Estimated in-memory size of the fully loaded file
    pub estimated_memory_mb: f64,
    /// The estimate exceeds the available memory
    pub unsafe_to_load: bool,
}

/// Stateless advisor over a fixed set of thresholds
#[derive(Debug, Clone, Default)]
pub struct ResourceAdvisor {
    config: AdvisorConfig,
}

impl ResourceAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn bucket_for(&self, file_size_mb: f64) -> SizeBucket {
        if file_size_mb < self.config.small_threshold_mb {
            SizeBucket::Small
        } else if file_size_mb < self.config.medium_threshold_mb {
            SizeBucket::Medium
        } else if file_size_mb < self.config.large_threshold_mb {
            SizeBucket::Large
        } else {
            SizeBucket::Oversized
        }
    }

    /// Estimated memory needed to hold the whole file, in MiB
    pub fn estimate_memory_mb(&self, file_size_mb: f64) -> f64 {
        let rows = file_size_mb.max(0.0) * self.config.rows_per_mb;
        rows * self.config.memory_usage_factor / 1024.0
    }

    /// Recommend a chunk size and flag unsafe loads
    pub fn advise(&self, file_size_mb: f64, available_memory_mb: f64) -> ResourceAdvisory {
        let bucket = self.bucket_for(file_size_mb);
        let baseline = match bucket {
            SizeBucket::Small => self.config.small_chunk_rows,
            SizeBucket::Medium => self.config.medium_chunk_rows,
            SizeBucket::Large => self.config.large_chunk_rows,
            SizeBucket::Oversized => {
                // ~100 rows per MiB of the memory share
                let by_memory =
                    (available_memory_mb.max(0.0) * self.config.oversized_memory_share * 100.0)
                        as usize;
                by_memory.max(self.config.min_oversized_chunk_rows)
            }
        };
        let chunk_rows = baseline.min(self.config.max_chunk_rows);

        let estimated_memory_mb = self.estimate_memory_mb(file_size_mb);
        ResourceAdvisory {
            bucket,
            chunk_rows,
            estimated_memory_mb,
            unsafe_to_load: estimated_memory_mb > available_memory_mb,
        }
    }

    /// Advise for a file on disk using the currently available memory
    pub fn advise_path(&self, path: &Path) -> CleanerResult<ResourceAdvisory> {
        let start = Instant::now();
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CleanerError::NotFound(path.to_path_buf()),
            _ => CleanerError::Io(e),
        })?;
        let file_size_mb = metadata.len() as f64 / MIB;
        let file_size = format_file_size(metadata.len());
        let available_mb = MemoryProbe::new().available_mb();

        let advisory = self.advise(file_size_mb, available_mb);

        tracing::info!(
            event = "resource_advisory",
            path = %path.display(),
            file_size = %file_size,
            file_size_mb,
            available_mb,
            bucket = ?advisory.bucket,
            chunk_rows = advisory.chunk_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "Resource advisory computed"
        );
        if advisory.bucket == SizeBucket::Oversized {
            tracing::warn!(
                "⚠️ Large file detected: {}. Consider using streaming mode.",
                file_size
            );
        }
        if advisory.unsafe_to_load {
            tracing::warn!(
                "⚠️ Low memory: {:.2}GB available for an estimated {:.2}GB in memory",
                available_mb / 1024.0,
                advisory.estimated_memory_mb / 1024.0
            );
        }

        Ok(advisory)
    }
}
