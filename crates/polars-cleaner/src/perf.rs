//! Step timing and memory bookkeeping
//!
//! `PerformanceTracker::step` wraps a fallible closure, logs its start and
//! finish (or failure) with duration and resident-memory delta, and records
//! the metrics so a summary can be printed at the end of a run.

use parking_lot::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::memory::{log_system_info, MemoryProbe};

/// Metrics for one completed step
#[derive(Debug, Clone, Serialize)]
pub struct StepMetrics {
    pub name: String,
    pub duration_secs: f64,
    pub memory_delta_mb: f64,
    pub memory_current_mb: f64,
    pub succeeded: bool,
    pub finished_at: DateTime<Utc>,
}

/// Totals for a tracked run
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub total_secs: f64,
    pub total_memory_delta_mb: f64,
    pub current_memory_mb: f64,
    pub step_count: usize,
    pub steps: Vec<StepMetrics>,
}

/// Clock and memory reading a summary is measured against
struct Baseline {
    started: Instant,
    memory_mb: f64,
}

/// Records step metrics across a run; shareable between threads
pub struct PerformanceTracker {
    baseline: Mutex<Baseline>,
    probe: Mutex<MemoryProbe>,
    steps: Mutex<Vec<StepMetrics>>,
    system_info_logged: Mutex<bool>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        let mut probe = MemoryProbe::new();
        let memory_mb = probe.process_rss_mb();
        Self {
            baseline: Mutex::new(Baseline {
                started: Instant::now(),
                memory_mb,
            }),
            probe: Mutex::new(probe),
            steps: Mutex::new(Vec::new()),
            system_info_logged: Mutex::new(false),
        }
    }

    fn rss_mb(&self) -> f64 {
        self.probe.lock().process_rss_mb()
    }

    /// Run `f` as a named step
    ///
    /// The step is recorded whether `f` succeeds or fails; errors are
    /// returned unchanged.
    pub fn step<T, E, F>(&self, name: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display,
    {
        {
            let mut logged = self.system_info_logged.lock();
            if !*logged {
                log_system_info();
                *logged = true;
            }
        }

        let mem_before = self.rss_mb();
        let start = Instant::now();
        tracing::info!("🚀 Starting step: {}", name);

        let result = f();

        let duration = start.elapsed().as_secs_f64();
        let mem_after = self.rss_mb();
        let mem_delta = mem_after - mem_before;

        match &result {
            Ok(_) => {
                let time_marker = if duration < 1.0 {
                    "⚡"
                } else if duration < 10.0 {
                    "✅"
                } else {
                    "🐌"
                };
                tracing::info!(
                    step = name,
                    duration_secs = duration,
                    memory_delta_mb = mem_delta,
                    "{} Finished step: {} | Time: {} | Memory Δ: {:+.2} MB (now {:.2} MB)",
                    time_marker,
                    name,
                    format_duration(duration),
                    mem_delta,
                    mem_after
                );
            }
            Err(e) => {
                tracing::error!(
                    step = name,
                    duration_secs = duration,
                    "❌ Failed step: {} | Time: {} | Memory: {:.2} MB | Error: {}",
                    name,
                    format_duration(duration),
                    mem_after,
                    e
                );
            }
        }

        self.steps.lock().push(StepMetrics {
            name: name.to_string(),
            duration_secs: duration,
            memory_delta_mb: mem_delta,
            memory_current_mb: mem_after,
            succeeded: result.is_ok(),
            finished_at: Utc::now(),
        });

        result
    }

    pub fn summary(&self) -> PerformanceSummary {
        let current = self.rss_mb();
        let (total_secs, start_memory_mb) = {
            let baseline = self.baseline.lock();
            (baseline.started.elapsed().as_secs_f64(), baseline.memory_mb)
        };
        let steps = self.steps.lock().clone();
        PerformanceSummary {
            total_secs,
            total_memory_delta_mb: current - start_memory_mb,
            current_memory_mb: current,
            step_count: steps.len(),
            steps,
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        let rule = "=".repeat(60);

        tracing::info!("{}", rule);
        tracing::info!("🎯 PERFORMANCE SUMMARY");
        tracing::info!("{}", rule);
        tracing::info!("⏱️  Total Runtime: {}", format_duration(summary.total_secs));
        tracing::info!("💾 Memory Delta: {:+.2} MB", summary.total_memory_delta_mb);
        tracing::info!("🔄 Steps Completed: {}", summary.step_count);
        for step in &summary.steps {
            tracing::info!(
                "   • {}: {}, Δ{:+.2}MB",
                step.name,
                format_duration(step.duration_secs),
                step.memory_delta_mb
            );
        }
        tracing::info!("{}", rule);
    }

    /// Forget recorded steps and restart the clock
    pub fn reset(&self) {
        let memory_mb = self.rss_mb();
        *self.baseline.lock() = Baseline {
            started: Instant::now(),
            memory_mb,
        };
        self.steps.lock().clear();
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Human readable duration
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        format!("{}m {:.0}s", minutes as u64, seconds - minutes * 60.0)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds - hours * 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u64, minutes as u64)
    }
}

/// Human readable byte count
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}
