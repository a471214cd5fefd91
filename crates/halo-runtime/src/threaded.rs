//! One OS thread per color, standing in for one process per color.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use halo_coloring::ColoringResult;
use halo_core::Color;
use halo_sync::{BarrierRegistry, GhostSyncCoordinator, GhostTransfer};
use tracing::{debug, warn};

use crate::config::{RuntimeConfig, RuntimeError};
use crate::runtime::{ColorContext, ColorProgram, ColorSet, Runtime};

/// Runs every color of the decomposition on its own named thread.
///
/// Each `spmd` call spawns scoped threads, gives each its color's
/// coordinator, and joins them all. Colors only interact through the
/// shared barrier registry and the [`GhostTransfer`].
///
/// Threads start running the program only once every color has been
/// spawned; if a spawn fails, the threads already spawned return without
/// running and the spawn error is reported.
///
/// A color that fails stops arriving on barriers. Without a
/// [`wait_timeout`](halo_sync::SyncConfig::wait_timeout) its neighbors
/// then block forever; with one they fail and the run returns the first
/// error in color order.
pub struct ThreadedRuntime {
    config: RuntimeConfig,
    catalog: ColoringResult,
    registry: Arc<BarrierRegistry>,
    coordinators: Vec<GhostSyncCoordinator>,
    transfer: Arc<dyn GhostTransfer + Send + Sync>,
}

impl ThreadedRuntime {
    /// Color the grid and build one coordinator per color.
    pub fn new(
        config: RuntimeConfig,
        transfer: Arc<dyn GhostTransfer + Send + Sync>,
    ) -> Result<Self, RuntimeError> {
        let ColorSet {
            catalog,
            registry,
            coordinators,
        } = ColorSet::build(&config)?;
        debug!(colors = coordinators.len(), "threaded runtime ready");
        Ok(Self {
            config,
            catalog,
            registry,
            coordinators,
            transfer,
        })
    }

    /// The config this runtime was built from.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Coordinator of `color`, if the runtime hosts it.
    pub fn coordinator(&self, color: Color) -> Option<&GhostSyncCoordinator> {
        self.coordinators.iter().find(|c| c.color() == color)
    }
}

/// Holds spawned color threads until the whole set is up.
struct StartGate {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl StartGate {
    fn new(colors: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(colors);
        Self { tx, rx }
    }

    /// Blocks until the gate opens; `false` if it was aborted.
    fn waiter(&self) -> impl FnOnce() -> bool + Send + 'static {
        let rx = self.rx.clone();
        move || rx.recv().is_ok()
    }

    /// Release `waiters` blocked threads.
    fn open(self, waiters: usize) {
        for _ in 0..waiters {
            // Capacity covers every waiter, so this never blocks.
            let _ = self.tx.send(());
        }
    }

    /// Release every waiter without running.
    fn abort(self) {
        drop(self);
    }
}

impl Runtime for ThreadedRuntime {
    fn name(&self) -> &'static str {
        "threaded"
    }

    fn num_colors(&self) -> usize {
        self.coordinators.len()
    }

    fn catalog(&self) -> &ColoringResult {
        &self.catalog
    }

    fn barriers(&self) -> &Arc<BarrierRegistry> {
        &self.registry
    }

    fn spmd(&mut self, program: &ColorProgram<'_>) -> Result<(), RuntimeError> {
        debug!(runtime = "threaded", colors = self.coordinators.len(), "spmd start");
        let catalog = &self.catalog;
        let transfer: &(dyn GhostTransfer + Send + Sync) = &*self.transfer;
        let config = &self.config;

        thread::scope(|s| {
            let gate = StartGate::new(self.coordinators.len());
            let mut handles = Vec::with_capacity(self.coordinators.len());
            let mut first_error = None;
            for coordinator in self.coordinators.iter_mut() {
                let color = coordinator.color();
                let started = gate.waiter();
                let spawned = thread::Builder::new()
                    .name(config.thread_name(color))
                    .spawn_scoped(s, move || {
                        if !started() {
                            debug!(%color, "start aborted");
                            return Ok(());
                        }
                        let mut ctx = ColorContext::new(coordinator, catalog, transfer);
                        let result = program(&mut ctx);
                        debug!(%color, launches = ctx.launches(), ok = result.is_ok(), "color finished");
                        result
                    });
                match spawned {
                    Ok(handle) => handles.push((color, handle)),
                    Err(e) => {
                        warn!(%color, error = %e, "failed to spawn color thread");
                        first_error = Some(RuntimeError::ThreadSpawn {
                            color,
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
            if first_error.is_none() {
                gate.open(handles.len());
            } else {
                gate.abort();
            }

            for (color, handle) in handles {
                let outcome = match handle.join() {
                    Ok(Ok(())) => continue,
                    Ok(Err(source)) => RuntimeError::Task { color, source },
                    Err(_) => RuntimeError::ThreadPanicked { color },
                };
                warn!(%color, error = %outcome, "color failed");
                first_error.get_or_insert(outcome);
            }
            first_error.map_or(Ok(()), Err)
        })
    }
}
