//! Criterion micro-benchmarks for grid coloring and catalog queries.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use halo_bench::{reference_spec, stress_spec};
use halo_coloring::{color, BoxColorer, PartitionKind};
use halo_core::Color;

/// Benchmark: Color every block of the 32-color reference grid.
fn bench_color_reference(c: &mut Criterion) {
    let spec = reference_spec();

    c.bench_function("color_reference_32", |b| {
        b.iter(|| {
            let catalog = color(black_box(&spec)).unwrap();
            black_box(&catalog);
        });
    });
}

/// Benchmark: Color every block of the 256-color stress grid.
fn bench_color_stress(c: &mut Criterion) {
    let spec = stress_spec();

    c.bench_function("color_stress_256", |b| {
        b.iter(|| {
            let catalog = color(black_box(&spec)).unwrap();
            black_box(&catalog);
        });
    });
}

/// Benchmark: Color a single interior block of the stress grid, the
/// per-process cost in a distributed launch.
fn bench_color_local_stress(c: &mut Criterion) {
    let spec = stress_spec();
    // Block (3, 3, 1): surrounded on every side.
    let interior = [Color(3 * 32 + 3 * 4 + 1)];

    c.bench_function("color_local_stress_interior", |b| {
        b.iter(|| {
            let catalog = BoxColorer::color_local(black_box(&spec), &interior).unwrap();
            black_box(&catalog);
        });
    });
}

/// Benchmark: Full consistency check of the reference catalog.
fn bench_validate_reference(c: &mut Criterion) {
    let catalog = color(&reference_spec()).unwrap();

    c.bench_function("validate_reference_32", |b| {
        b.iter(|| {
            black_box(&catalog).validate().unwrap();
        });
    });
}

/// Benchmark: Count entities of every color and region kind.
fn bench_entity_counts(c: &mut Criterion) {
    let catalog = color(&reference_spec()).unwrap();
    let kinds = [
        PartitionKind::Exclusive,
        PartitionKind::Shared,
        PartitionKind::Owned,
        PartitionKind::Ghost,
        PartitionKind::All,
    ];

    c.bench_function("entity_counts_reference_32", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for &color in catalog.colors() {
                for kind in kinds {
                    total += catalog.entity_count(color, kind);
                }
            }
            black_box(total);
        });
    });
}

criterion_group!(
    benches,
    bench_color_reference,
    bench_color_stress,
    bench_color_local_stress,
    bench_validate_reference,
    bench_entity_counts,
);
criterion_main!(benches);
