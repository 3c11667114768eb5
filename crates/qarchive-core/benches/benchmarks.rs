//! Criterion benchmarks for archive loading and schema transpilation.
//!
//! Fixtures are pre-parsed outside the benchmark loop to measure only the
//! binding/transpile logic, not JSON parsing or file I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use qarchive_core::{
    transpile, Archive, ArchiveSchema, Container, LeafPolicy, LoadOptions, MemoryContainer,
    TranspileOptions,
};

fn load_fixture(dir: &str, name: &str) -> Value {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests");
    let path = Path::new(fixtures_dir).join(dir).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

fn bench_transpile(c: &mut Criterion) {
    let source = load_fixture("schemas", "qarchive_source.json");
    let options = TranspileOptions::default();

    c.bench_function("transpile/qarchive_source", |b| {
        b.iter(|| transpile(black_box(&source), black_box(&options)).unwrap())
    });
}

fn bench_open(c: &mut Criterion) {
    let tree = load_fixture("containers", "geom_opt.json");
    let container: Arc<dyn Container> = Arc::new(MemoryContainer::from_json(&tree).unwrap());
    let schema = ArchiveSchema::qchem().unwrap();
    let lazy = LoadOptions::default();
    let eager = LoadOptions {
        leaf_policy: LeafPolicy::Eager,
        ..LoadOptions::default()
    };

    c.bench_function("open/geom_opt_lazy", |b| {
        b.iter(|| Archive::open(Arc::clone(&container), black_box(&schema), &lazy).unwrap())
    });
    c.bench_function("open/geom_opt_eager", |b| {
        b.iter(|| Archive::open(Arc::clone(&container), black_box(&schema), &eager).unwrap())
    });
}

fn bench_index(c: &mut Criterion) {
    let tree = load_fixture("containers", "geom_opt.json");
    let container: Arc<dyn Container> = Arc::new(MemoryContainer::from_json(&tree).unwrap());
    let schema = ArchiveSchema::qchem().unwrap();

    // A fresh archive per iteration so the index is rebuilt every time.
    c.bench_function("index/geom_opt_energy", |b| {
        b.iter(|| {
            let archive =
                Archive::open(Arc::clone(&container), &schema, &LoadOptions::default()).unwrap();
            archive.index().read(black_box("energy")).unwrap()
        })
    });
}

criterion_group!(benches, bench_transpile, bench_open, bench_index);
criterion_main!(benches);
