use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;
use polars_cleaner::{
    dedupe, left_join_first_match, normalize, JoinSpec, LookupCache, LookupJoiner,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn create_main_frame(rows: usize) -> DataFrame {
    let email = Column::new(
        "email".into(),
        (0..rows).map(|i| format!("user{}@x.com", i % (rows / 2).max(1))).collect::<Vec<_>>(),
    );
    let score = Column::new("score".into(), (0..rows as i64).collect::<Vec<_>>());
    DataFrame::new(vec![email, score]).unwrap()
}

fn create_lookup_frame(rows: usize) -> DataFrame {
    let email = Column::new(
        "email".into(),
        (0..rows).map(|i| format!("user{}@x.com", i)).collect::<Vec<_>>(),
    );
    let region = Column::new(
        "region".into(),
        (0..rows).map(|i| ["US", "EU", "APAC"][i % 3]).collect::<Vec<_>>(),
    );
    DataFrame::new(vec![email, region]).unwrap()
}

fn write_lookup_csv(path: &PathBuf, rows: usize) {
    let mut df = create_lookup_frame(rows);
    CsvWriter::new(&mut std::fs::File::create(path).unwrap())
        .include_header(true)
        .finish(&mut df)
        .unwrap();
}

fn bench_normalize(c: &mut Criterion) {
    let headers: Vec<String> = (0..200).map(|i| format!("Customer Field #{i} (Primary)")).collect();

    c.bench_function("normalize_200_headers", |b| {
        b.iter(|| {
            for header in &headers {
                black_box(normalize(black_box(header)));
            }
        });
    });
}

fn bench_dedupe(c: &mut Criterion) {
    let df = create_main_frame(100_000);
    let subset = vec!["email".to_string()];

    c.bench_function("dedupe_100k_by_email", |b| {
        b.iter(|| {
            let out = dedupe(black_box(&df), Some(subset.as_slice())).unwrap();
            black_box(out);
        });
    });
}

fn bench_join(c: &mut Criterion) {
    let main = create_main_frame(100_000);
    let lookup = create_lookup_frame(50_000);
    let spec = JoinSpec::new("email", ["region"]);

    c.bench_function("left_join_first_match_100k", |b| {
        b.iter(|| {
            let out = left_join_first_match(black_box(&main), &lookup, &spec).unwrap();
            black_box(out);
        });
    });
}

fn bench_cached_vs_uncached(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let lookup_path = temp_dir.path().join("lookup.csv");
    write_lookup_csv(&lookup_path, 50_000);

    let main = create_main_frame(10_000);
    let spec = JoinSpec::new("email", ["region"]);
    let joiner = LookupJoiner::new(Arc::new(LookupCache::new()));

    let mut group = c.benchmark_group("lookup_cache");

    group.bench_function("cached", |b| {
        b.iter(|| {
            let out = joiner.apply(black_box(&main), &lookup_path, &spec, true).unwrap();
            black_box(out);
        });
    });

    group.bench_function("uncached", |b| {
        b.iter(|| {
            let out = joiner.apply(black_box(&main), &lookup_path, &spec, false).unwrap();
            black_box(out);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_dedupe,
    bench_join,
    bench_cached_vs_uncached
);
criterion_main!(benches);
