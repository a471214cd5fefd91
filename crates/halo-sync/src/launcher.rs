//! Per-launch barrier bookkeeping.

use std::time::Duration;

use halo_core::SyncError;

use crate::barrier::BarrierHandle;
use crate::registry::BarrierRegistry;

/// Barriers a single task launch must wait on before running and arrive
/// on after completing.
///
/// The prolog fills it in; the executor drains it around the task body.
#[derive(Clone, Debug, Default)]
pub struct TaskLauncher {
    name: String,
    wait_barriers: Vec<BarrierHandle>,
    arrival_barriers: Vec<BarrierHandle>,
}

impl TaskLauncher {
    /// A launcher for the named task with no barriers attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait on `handle` before the task runs.
    pub fn add_wait_barrier(&mut self, handle: BarrierHandle) {
        self.wait_barriers.push(handle);
    }

    /// Arrive once on `handle` after the task completes.
    ///
    /// Callers must also raise the owner quota of the handle's phase
    /// (see [`BarrierRegistry::alter_arrival_count`]) before any
    /// consumer could observe the phase as published.
    pub fn add_arrival_barrier(&mut self, handle: BarrierHandle) {
        self.arrival_barriers.push(handle);
    }

    /// Handles waited on before the task runs.
    pub fn wait_barriers(&self) -> &[BarrierHandle] {
        &self.wait_barriers
    }

    /// Handles arrived on after the task completes.
    pub fn arrival_barriers(&self) -> &[BarrierHandle] {
        &self.arrival_barriers
    }

    /// Block on every wait barrier, in registration order.
    pub fn wait_all(
        &self,
        registry: &BarrierRegistry,
        timeout: Option<Duration>,
    ) -> Result<(), SyncError> {
        for &handle in &self.wait_barriers {
            registry.wait(handle, timeout)?;
        }
        Ok(())
    }

    /// Arrive once on every arrival barrier.
    pub fn arrive_all(&self, registry: &BarrierRegistry) -> Result<(), SyncError> {
        for &handle in &self.arrival_barriers {
            registry.arrive(handle, 1)?;
        }
        Ok(())
    }
}
