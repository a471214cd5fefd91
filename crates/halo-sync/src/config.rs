//! Synchronization settings.

use std::time::Duration;

/// Settings for the ghost synchronization protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Watchdog for barrier waits. `None` (the default) waits forever.
    ///
    /// When set, a wait that makes no progress for this long fails with
    /// [`SyncError::SynchronizationDeadlock`](halo_core::SyncError::SynchronizationDeadlock)
    /// instead of hanging the run.
    pub wait_timeout: Option<Duration>,
}

impl SyncConfig {
    /// Config with a watchdog timeout on every barrier wait.
    pub fn with_wait_timeout(timeout: Duration) -> Self {
        Self {
            wait_timeout: Some(timeout),
        }
    }
}
