use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use halo_coloring::{color, linearize, ColoringResult, GridBox, GridSpec, ThruDim};
use halo_core::{Color, FieldAccess, FieldId, Privileges, SyncError};
use halo_sync::{
    BarrierHandle, BarrierRegistry, GhostSyncCoordinator, GhostTransfer, SyncConfig, TaskLauncher,
};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const U: FieldId = FieldId(0);

fn setup(spec: &GridSpec) -> (ColoringResult, Arc<BarrierRegistry>) {
    let catalog = color(spec).unwrap();
    let registry = Arc::new(BarrierRegistry::from_catalog(&catalog, &[U]));
    (catalog, registry)
}

fn coordinator(
    c: Color,
    catalog: &ColoringResult,
    registry: &Arc<BarrierRegistry>,
    config: SyncConfig,
) -> GhostSyncCoordinator {
    GhostSyncCoordinator::new(c, catalog, &[U], Arc::clone(registry), config).unwrap()
}

/// Per-color copies of the whole grid; each color only trusts its owned
/// and ghost cells.
struct Store {
    strides: Vec<u64>,
    buffers: Vec<Mutex<Vec<i64>>>,
}

impl Store {
    fn new(catalog: &ColoringResult) -> Self {
        let strides = catalog.spec().strides().to_vec();
        let len = strides.iter().product::<u64>() as usize;
        let buffers = (0..catalog.total_colors())
            .map(|_| Mutex::new(vec![0; len]))
            .collect();
        Self { strides, buffers }
    }

    fn fill(&self, c: Color, region: &GridBox, value: i64) {
        let mut buf = self.buffers[c.index()].lock().unwrap();
        for p in region.points() {
            buf[linearize(&p, &self.strides).unwrap()] = value;
        }
    }

    fn all_equal(&self, c: Color, region: &GridBox, value: i64) -> bool {
        let buf = self.buffers[c.index()].lock().unwrap();
        region
            .points()
            .all(|p| buf[linearize(&p, &self.strides).unwrap()] == value)
    }
}

impl GhostTransfer for Store {
    fn transfer(&self, _field: FieldId, owner: Color, reader: Color, pieces: &[GridBox]) {
        let values: Vec<(usize, i64)> = {
            let src = self.buffers[owner.index()].lock().unwrap();
            pieces
                .iter()
                .flat_map(|b| b.points())
                .map(|p| {
                    let i = linearize(&p, &self.strides).unwrap();
                    (i, src[i])
                })
                .collect()
        };
        let mut dst = self.buffers[reader.index()].lock().unwrap();
        for (i, v) in values {
            dst[i] = v;
        }
    }
}

struct NoCopy;

impl GhostTransfer for NoCopy {
    fn transfer(&self, _: FieldId, _: Color, _: Color, _: &[GridBox]) {}
}

fn line() -> GridSpec {
    GridSpec::new(vec![8], vec![2], 1, 0, ThruDim::Restricted)
}

#[test]
fn consumer_read_waits_for_owner_publish() {
    let (catalog, registry) = setup(&line());
    let mut a = coordinator(Color(0), &catalog, &registry, SyncConfig::default());
    let mut b = coordinator(Color(1), &catalog, &registry, SyncConfig::default());
    let a_barrier = registry.id_of(Color(0), U).unwrap();

    let b_done = Arc::new(AtomicBool::new(false));
    let reader = {
        let b_done = Arc::clone(&b_done);
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            // B publishes its own cells, then blocks on A's phase 0.
            b.prolog(
                &FieldAccess::new(U, Privileges::read_all()),
                &mut TaskLauncher::new("read"),
                &NoCopy,
            )
            .unwrap();
            assert!(registry.get(a_barrier).unwrap().is_published(0));
            b_done.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!b_done.load(Ordering::SeqCst), "B read before A published");

    a.prolog(
        &FieldAccess::new(U, Privileges::read_all()),
        &mut TaskLauncher::new("read"),
        &NoCopy,
    )
    .unwrap();
    reader.join().unwrap();
    assert!(b_done.load(Ordering::SeqCst));
}

#[test]
fn owner_write_waits_for_consumer_arrival() {
    let (catalog, registry) = setup(&line());
    let mut a = coordinator(Color(0), &catalog, &registry, SyncConfig::default());
    let a_barrier = registry.id_of(Color(0), U).unwrap();
    let b_barrier = registry.id_of(Color(1), U).unwrap();

    // B publishes phase 0; A reads (publishing its own phase 0).
    registry.arrive(BarrierHandle::owner(b_barrier), 1).unwrap();
    a.prolog(
        &FieldAccess::new(U, Privileges::read_all()),
        &mut TaskLauncher::new("read"),
        &NoCopy,
    )
    .unwrap();

    let mut launcher = TaskLauncher::new("update");
    a.prolog(
        &FieldAccess::new(U, Privileges::write_owned()),
        &mut launcher,
        &NoCopy,
    )
    .unwrap();

    // B has not consumed phase 0 yet: the write must not start.
    let err = launcher
        .wait_all(&registry, Some(Duration::from_millis(20)))
        .unwrap_err();
    assert!(matches!(err, SyncError::SynchronizationDeadlock { phase: 1, .. }));

    let started = Arc::new(AtomicBool::new(false));
    let writer = {
        let started = Arc::clone(&started);
        let registry = Arc::clone(&registry);
        let launcher = launcher.clone();
        thread::spawn(move || {
            launcher
                .wait_all(&registry, Some(Duration::from_secs(10)))
                .unwrap();
            started.store(true, Ordering::SeqCst);
        })
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!started.load(Ordering::SeqCst), "A wrote before B consumed");

    // B's consumer arrival on A's phase 0 releases the write.
    registry
        .arrive(BarrierHandle::consumer(a_barrier), 1)
        .unwrap();
    writer.join().unwrap();
    assert!(started.load(Ordering::SeqCst));
}

#[test]
fn missing_neighbor_trips_watchdog_instead_of_hanging() {
    let (catalog, registry) = setup(&line());
    let config = SyncConfig::with_wait_timeout(Duration::from_millis(30));
    let mut a = coordinator(Color(0), &catalog, &registry, config);
    let err = a
        .prolog(
            &FieldAccess::new(U, Privileges::read_all()),
            &mut TaskLauncher::new("read"),
            &NoCopy,
        )
        .unwrap_err();
    match err {
        SyncError::SynchronizationDeadlock { phase, waited, .. } => {
            assert_eq!(phase, 0);
            assert!(waited >= Duration::from_millis(30));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn jittered_rounds_always_see_current_ghosts() {
    const ROUNDS: i64 = 25;
    let spec = GridSpec::new(vec![12, 12], vec![2, 2], 2, 0, ThruDim::Unrestricted);
    let (catalog, registry) = setup(&spec);
    let store = Store::new(&catalog);
    let config = SyncConfig::with_wait_timeout(Duration::from_secs(10));
    let timeout = config.wait_timeout;

    thread::scope(|s| {
        for &c in catalog.colors() {
            let mut coord = coordinator(c, &catalog, &registry, config.clone());
            let (catalog, registry, store) = (&catalog, &registry, &store);
            s.spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE + u64::from(c.0));
                let owned = catalog.partition_of(c).unwrap().owned.clone();
                let ghosts: Vec<GridBox> = catalog
                    .ghost_of(c)
                    .unwrap()
                    .iter()
                    .map(|g| g.bounds.clone())
                    .collect();
                let read = FieldAccess::new(U, Privileges::read_all());
                let write = FieldAccess::new(U, Privileges::write_owned());

                for round in 0..ROUNDS {
                    thread::sleep(Duration::from_micros(rng.next_u64() % 300));

                    let mut launcher = TaskLauncher::new("check");
                    coord.prolog(&read, &mut launcher, store).unwrap();
                    launcher.wait_all(registry, timeout).unwrap();
                    for g in &ghosts {
                        assert!(store.all_equal(c, g, round), "color {c} round {round}");
                    }
                    launcher.arrive_all(registry).unwrap();
                    coord.epilog(&read).unwrap();

                    thread::sleep(Duration::from_micros(rng.next_u64() % 300));

                    let mut launcher = TaskLauncher::new("update");
                    coord.prolog(&write, &mut launcher, store).unwrap();
                    launcher.wait_all(registry, timeout).unwrap();
                    store.fill(c, &owned, round + 1);
                    launcher.arrive_all(registry).unwrap();
                    coord.epilog(&write).unwrap();
                }

                let stats = coord.stats(U).unwrap();
                assert_eq!(stats.synced_reads, ROUNDS as u64);
                assert_eq!(stats.shared_writes, ROUNDS as u64);
                assert_eq!(stats.cached_reads, 0);
            });
        }
    });
}
