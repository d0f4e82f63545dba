//! Parallel cleaning of many input files

use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{CleanerError, CleanerResult};
use crate::pipeline::{CleanOptions, CleanReport, CleaningPipeline};

/// Runs a [`CleaningPipeline`] over many inputs on a bounded worker pool
///
/// Every worker shares the pipeline's lookup cache, so a lookup table used
/// by several inputs is parsed once.
pub struct BatchRunner {
    pipeline: CleaningPipeline,
    num_workers: usize,
    buffer_size: usize,
}

impl BatchRunner {
    pub fn new(pipeline: CleaningPipeline) -> Self {
        let num_workers = rayon::current_num_threads();
        Self {
            pipeline,
            num_workers,
            buffer_size: num_workers * 2,
        }
    }

    /// Set the number of worker threads
    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.max(1);
        self
    }

    /// Set the result channel capacity (for backpressure)
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Clean every job; results come back in job order
    ///
    /// A failing job does not stop the others.
    pub fn run(&self, jobs: Vec<CleanOptions>) -> CleanerResult<Vec<CleanerResult<CleanReport>>> {
        let total = jobs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_workers)
            .thread_name(|i| format!("cleaner-worker-{i}"))
            .build()
            .map_err(|e| CleanerError::Config(format!("Failed to build worker pool: {e}")))?;

        tracing::info!(
            "Starting batch: {} files, {} workers",
            total,
            self.num_workers
        );

        let (tx, rx): (Sender<(usize, CleanerResult<CleanReport>)>, Receiver<_>) =
            bounded(self.buffer_size);
        let pipeline = self.pipeline.clone();
        let completed = Arc::new(AtomicUsize::new(0));

        let mut results: Vec<Option<CleanerResult<CleanReport>>> =
            (0..total).map(|_| None).collect();

        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    jobs.par_iter().enumerate().for_each_with(
                        (tx, completed),
                        |(tx, counter), (index, job)| {
                            let result = pipeline.clean_file(job);
                            if let Err(e) = &result {
                                tracing::error!("❌ {}: {}", job.input.display(), e);
                            }
                            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                            tracing::debug!(
                                "Completed file {}/{}: {}",
                                done,
                                total,
                                job.input.display()
                            );
                            if tx.send((index, result)).is_err() {
                                tracing::warn!("Receiver dropped, stopping batch");
                            }
                        },
                    );
                });
            });

            for (index, result) in rx.iter() {
                results[index] = Some(result);
            }
        });

        let results: Vec<CleanerResult<CleanReport>> = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(CleanerError::Config(format!("batch job {index} produced no result")))
                })
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(
            "Batch completed: {} succeeded, {} failed",
            total - failed,
            failed
        );
        Ok(results)
    }
}

/// Expand glob patterns into a sorted, de-duplicated list of files
///
/// A pattern without wildcards that names an existing file is kept as is.
pub fn expand_inputs<I, S>(patterns: I) -> CleanerResult<Vec<PathBuf>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matches: Vec<PathBuf> = glob::glob(pattern)
            .map_err(|e| CleanerError::Config(format!("Invalid glob pattern '{pattern}': {e}")))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();

        if matches.is_empty() {
            tracing::warn!("No files matched '{}'", pattern);
        }
        paths.extend(matches);
    }

    paths.sort();
    paths.dedup();
    if paths.is_empty() {
        return Err(CleanerError::Config("no input files matched".to_string()));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{JoinSpec, LookupCache};
    use tempfile::TempDir;

    fn create_inputs(dir: &TempDir, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.path().join(format!("input_{i}.csv"));
                let mut body = String::from("email,score\n");
                for row in 0..=i {
                    body.push_str(&format!("u{row}@x.com,{row}\n"));
                }
                body.push_str("u0@x.com,0\n");
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_results_in_job_order() {
        let dir = TempDir::new().unwrap();
        let inputs = create_inputs(&dir, 6);
        let lookup = dir.path().join("lookup.csv");
        std::fs::write(&lookup, "email,tier\nu0@x.com,gold\n").unwrap();

        let cache = Arc::new(LookupCache::new());
        let runner = BatchRunner::new(CleaningPipeline::new(cache.clone()))
            .with_num_workers(3)
            .with_buffer_size(1);

        let jobs = inputs
            .iter()
            .map(|p| {
                CleanOptions::new(p)
                    .with_dry_run(true)
                    .with_lookup(&lookup, JoinSpec::new("email", ["tier"]))
            })
            .collect();
        let results = runner.run(jobs).unwrap();

        assert_eq!(results.len(), 6);
        for (i, result) in results.iter().enumerate() {
            let report = result.as_ref().unwrap();
            assert_eq!(report.input, inputs[i]);
            assert_eq!(report.rows_out, i + 1);
            assert_eq!(report.duplicates_removed, 1);
        }
        assert_eq!(cache.stats().loads, 1);
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let mut inputs = create_inputs(&dir, 2);
        inputs.insert(1, dir.path().join("missing.csv"));

        let runner = BatchRunner::new(CleaningPipeline::new(Arc::new(LookupCache::new())))
            .with_num_workers(2);
        let jobs = inputs.iter().map(|p| CleanOptions::new(p).with_dry_run(true)).collect();
        let results = runner.run(jobs).unwrap();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CleanerError::NotFound(_))));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_expand_inputs() {
        let dir = TempDir::new().unwrap();
        create_inputs(&dir, 3);
        let pattern = format!("{}/input_*.csv", dir.path().display());
        let exact = dir.path().join("input_1.csv").display().to_string();

        let paths = expand_inputs([pattern, exact]).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths.windows(2).all(|w| w[0] < w[1]));

        let none = format!("{}/*.xlsx", dir.path().display());
        assert!(matches!(expand_inputs([none]), Err(CleanerError::Config(_))));
    }
}
