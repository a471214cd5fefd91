//! End-to-end ghost exchange example.
//!
//! Demonstrates: build config → color the grid → ThreadedRuntime → Jacobi
//! diffusion rounds that read ghosts and write owned cells → inspect the
//! per-color synchronization counters.

use std::sync::Arc;

use halo_bench::{exchange_config, INPUT, OUTPUT};
use halo_coloring::{color, PartitionKind};
use halo_runtime::{Runtime, TaskSpec, ThreadedRuntime};
use halo_test_utils::{init_tracing, DenseFieldStore};

const N: i64 = 48;
const ROUNDS: u32 = 50;

/// Average of the cell and its in-grid face neighbors.
fn jacobi(p: &[i64], read: &dyn Fn(&[i64]) -> f64) -> f64 {
    let mut sum = read(p);
    let mut count = 1.0;
    for (d, delta) in [(0, -1), (0, 1), (1, -1), (1, 1)] {
        let mut q = p.to_vec();
        q[d] += delta;
        if (0..N).contains(&q[d]) {
            sum += read(&q);
            count += 1.0;
        }
    }
    sum / count
}

fn main() {
    init_tracing();
    println!("=== Halo Ghost Exchange Example ===\n");

    let config = exchange_config(N, 3);
    let catalog = color(&config.spec).unwrap();
    println!("{N}x{N} grid, {} colors", catalog.total_colors());
    for info in catalog.coloring_info() {
        println!(
            "  color {}: {} exclusive, {} shared, {} ghost, {} neighbors",
            info.color,
            info.exclusive,
            info.shared,
            info.ghost,
            info.shared_users.len()
        );
    }

    // A hot square in the middle of the grid.
    let store = Arc::new(DenseFieldStore::new(&catalog, &[INPUT, OUTPUT]));
    for &c in catalog.colors() {
        let owned = &catalog.partition_of(c).unwrap().owned;
        store.fill(c, INPUT, owned, |p| {
            if (20..28).contains(&p[0]) && (20..28).contains(&p[1]) {
                100.0
            } else {
                0.0
            }
        });
    }

    let mut rt = ThreadedRuntime::new(config, store.clone()).unwrap();
    let step = TaskSpec::new("jacobi").reads(INPUT).writes(OUTPUT);
    let publish = TaskSpec::new("publish").writes(INPUT);

    rt.spmd(&|ctx| {
        let me = ctx.color();
        let owned = ctx.catalog().partition_of(me).unwrap().owned.clone();
        for _ in 0..ROUNDS {
            ctx.execute(&step, || {
                store.update(me, INPUT, OUTPUT, &owned, jacobi);
                Ok::<_, String>(())
            })?;
            ctx.execute(&publish, || {
                store.update(me, OUTPUT, INPUT, &owned, |p, read| read(p));
                Ok::<_, String>(())
            })?;
        }
        Ok(())
    })
    .unwrap();

    // Gather the owned cells of every color.
    let mut total = 0.0;
    let mut peak = f64::NEG_INFINITY;
    for &c in catalog.colors() {
        for region in catalog.boxes(c, PartitionKind::Owned) {
            for p in region.points() {
                let v = store.get(c, INPUT, &p);
                total += v;
                peak = peak.max(v);
            }
        }
    }
    println!("\nAfter {ROUNDS} rounds: total heat {total:.1}, peak {peak:.3}");

    for &c in catalog.colors() {
        let stats = rt.coordinator(c).unwrap().stats(INPUT).unwrap();
        println!(
            "  color {c}: {} synced reads, {} cached reads, {} shared writes",
            stats.synced_reads, stats.cached_reads, stats.shared_writes
        );
    }
}
