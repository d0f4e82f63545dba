//! Command execution

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use polars_cleaner::{
    expand_inputs, validate_header, BatchRunner, CleanOptions, CleanReport, CleanerConfig,
    CleaningPipeline, Converter, JoinSpec, LookupCache, PerformanceTracker, ResourceAdvisor,
};

use crate::cli::Cli;

/// Merge the config file (if any) with command-line overrides
pub fn resolve_config(cli: &Cli) -> Result<CleanerConfig> {
    let mut config = match &cli.config {
        Some(path) => CleanerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CleanerConfig::default(),
    };

    if let Some(dir) = &cli.convert_dir {
        config = config.with_convert_dir(dir);
    }
    if let Some(workers) = cli.num_workers {
        config = config.with_num_workers(workers);
    }
    if let Some(format) = cli.output_format {
        config = config.with_output_format(format.into());
    }
    if cli.no_cache {
        config = config.with_use_cache(false);
    }
    if let Some(delimiter) = cli.delimiter {
        config.read.delimiter = Some(delimiter);
    }
    Ok(config)
}

/// Convert and header-check one input, returning the file the pipeline reads
fn prepare_input(
    input: &Path,
    converter: &Converter,
    tracker: &PerformanceTracker,
    convert_dir: &Path,
) -> Result<PathBuf> {
    let (file_path, advisory) = tracker
        .step("Convert to CSV if needed", || {
            converter.convert_with_advisory(input, convert_dir)
        })
        .with_context(|| format!("Conversion error for {}", input.display()))?;
    tracing::debug!(
        "{}: {:?} bucket, {} rows per chunk",
        input.display(),
        advisory.bucket,
        advisory.chunk_rows
    );

    if file_path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
        let header = tracker
            .step("Validate header", || validate_header(&file_path))
            .with_context(|| format!("Failed to validate header of {}", file_path.display()))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        println!("📌 Cleaned header columns:");
        println!("{}", columns.join(", "));
    }

    Ok(file_path)
}

fn build_options(cli: &Cli, config: &CleanerConfig, input: PathBuf) -> CleanOptions {
    let mut options = CleanOptions::new(input)
        .with_dry_run(cli.dry_run)
        .with_output_format(config.output_format)
        .with_use_cache(config.use_cache);
    options.output = cli.output.clone();
    options.subset = cli.subset.clone();
    options.keep = cli.keep.clone();
    options.drop = cli.drop.clone();

    if let (Some(path), Some(key), Some(fields)) = (&cli.lookup, &cli.lookup_key, &cli.lookup_fields) {
        let spec = JoinSpec::new(key.as_str(), fields.iter().map(String::as_str))
            .with_ignore_key_case(cli.lookup_ignore_case);
        options = options.with_lookup(path, spec);
    }
    options
}

/// Run the cleaner; returns the number of failed inputs
pub fn execute(cli: &Cli) -> Result<usize> {
    let config = resolve_config(cli)?;
    let inputs = expand_inputs(&cli.input)?;
    if inputs.len() > 1 && cli.output.is_some() {
        bail!("--output can only be used with a single input file");
    }

    let tracker = Arc::new(PerformanceTracker::new());
    let converter = Converter::new()
        .with_read_options(config.read.clone())
        .with_advisor(ResourceAdvisor::new(config.advisor.clone()));

    let mut jobs = Vec::with_capacity(inputs.len());
    let mut failed = 0;
    for input in &inputs {
        match prepare_input(input, &converter, &tracker, &config.convert_dir) {
            Ok(file_path) => jobs.push(build_options(cli, &config, file_path)),
            Err(e) => {
                tracing::error!("{e:#}");
                eprintln!("❌ {e:#}");
                failed += 1;
            }
        }
    }

    let cache = Arc::new(LookupCache::new().with_read_options(config.read.clone()));
    let pipeline = CleaningPipeline::new(cache)
        .with_read_options(config.read.clone())
        .with_tracker(tracker.clone());

    let results = if jobs.len() == 1 {
        vec![pipeline.clean_file(&jobs[0])]
    } else {
        BatchRunner::new(pipeline)
            .with_num_workers(config.num_workers)
            .run(jobs)?
    };

    for result in results {
        match result {
            Ok(report) => print_report(&report, cli.json)?,
            Err(e) => {
                tracing::error!("Cleaning error: {e}");
                eprintln!("❌ Cleaning error: {e}");
                failed += 1;
            }
        }
    }

    tracker.log_summary();
    Ok(failed)
}

fn print_report(report: &CleanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    match &report.output {
        Some(path) => println!("✅ Cleaning complete! Output saved to: {}", path.display()),
        None => println!("🔎 Dry run complete! No output file created."),
    }
    println!(
        "   {} rows in, {} rows out, {} duplicates removed",
        report.rows_in, report.rows_out, report.duplicates_removed
    );
    if let Some(unmatched) = report.unmatched_lookup_rows {
        println!("   {unmatched} rows without a lookup match");
    }
    Ok(())
}
