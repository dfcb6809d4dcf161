use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qwick::{build_with_options, BuildOptions, Compression, Database, MemTable};

fn sample_database(dir: &tempfile::TempDir, compression: Compression) -> Database {
    let mut table = MemTable::new();
    for i in 0..10_000u64 {
        table.insert(
            format!("key:{i:06}"),
            format!("value payload number {i}, padded for realism {i:032}"),
        );
    }

    let path = dir.path().join("bench.qwick");
    build_with_options(
        &table,
        &path,
        BuildOptions {
            compression,
            ..BuildOptions::default()
        },
    )
    .unwrap();
    Database::open(&path).unwrap()
}

/// Benchmark point lookups on a 10K-entry store
fn bench_point_lookup(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let db = sample_database(&dir, Compression::Auto);
    let mut group = c.benchmark_group("point_lookup");

    group.bench_function("get_raw_hit", |b| {
        b.iter(|| db.get_raw(black_box(b"key:005000")).unwrap());
    });

    group.bench_function("get_raw_miss", |b| {
        b.iter(|| db.get_raw(black_box(b"key:999999")).unwrap());
    });

    let mut scratch = Vec::new();
    group.bench_function("find_decoded", |b| {
        b.iter(|| {
            let value = db.find(black_box(b"key:005000"), &mut scratch).unwrap();
            black_box(value);
        });
    });

    group.finish();
}

/// Benchmark prefix walks over a 1K-key band
fn bench_prefix_walk(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let db = sample_database(&dir, Compression::Auto);
    let mut group = c.benchmark_group("prefix_walk");

    group.bench_function("raw", |b| {
        b.iter(|| {
            let mut count = 0u64;
            db.prefix_raw(black_box(b"key:005"), |_, _| {
                count += 1;
                true
            })
            .unwrap();
            black_box(count)
        });
    });

    let mut scratch = Vec::new();
    group.bench_function("decoded", |b| {
        b.iter(|| {
            let mut count = 0u64;
            db.prefix(black_box(b"key:005"), &mut scratch, |_, v| {
                count += v.len() as u64;
                true
            })
            .unwrap();
            black_box(count)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_point_lookup, bench_prefix_walk);
criterion_main!(benches);
