//! Ghost synchronization for colored grids.
//!
//! Every (owner color, field) pair gets a [`PhaseBarrier`] held in a
//! shared [`BarrierRegistry`]. A per-color [`GhostSyncCoordinator`]
//! inspects each task's declared [`Privileges`](halo_core::Privileges)
//! and, before the task runs:
//!
//! - on a ghost read of stale data, publishes the color's own shared
//!   cells and pulls every neighbor's through a [`GhostTransfer`];
//! - on a shared write, attaches the own barrier to the [`TaskLauncher`]
//!   so the write cannot start until neighbors have consumed the
//!   previous phase.
//!
//! # Ordering Guarantees
//!
//! - A color never overwrites its shared cells for phase `N + 1` before
//!   every dependent color arrived for phase `N`.
//! - No color reads ghost data for phase `N` before the owner published
//!   phase `N`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod barrier;
pub mod config;
pub mod coordinator;
pub mod launcher;
pub mod registry;

pub use barrier::{BarrierHandle, BarrierId, PhaseBarrier, Role};
pub use config::SyncConfig;
pub use coordinator::{FieldSyncState, FieldSyncStats, GhostSyncCoordinator, GhostTransfer};
pub use launcher::TaskLauncher;
pub use registry::BarrierRegistry;
