//! Per-color ghost synchronization: the prolog/epilog pair wrapped around
//! every task launch.
//!
//! For each field the coordinator keeps a sticky `ghost_is_readable`
//! flag, the color's own owner handle, and one consumer handle per ghost
//! owner. A ghost read on a stale field publishes the color's own shared
//! cells, then pulls every neighbor's shared cells in catalog order. A
//! shared write attaches the own handle to the launch so the write waits
//! for the previous phase to be consumed and publishes on completion.

use std::sync::Arc;

use halo_coloring::{ColoringResult, GridBox};
use halo_core::{AccessMode, Color, FieldAccess, FieldId, SyncError};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::barrier::BarrierHandle;
use crate::config::SyncConfig;
use crate::launcher::TaskLauncher;
use crate::registry::BarrierRegistry;

/// Moves ghost data between colors.
///
/// The coordinator decides *when* a copy is safe; implementors decide
/// *how* cells travel (shared memory, message passing, a test recorder).
pub trait GhostTransfer {
    /// Copy the cells of `pieces` of `field` from `owner`'s shared
    /// region into `reader`'s ghost region.
    fn transfer(&self, field: FieldId, owner: Color, reader: Color, pieces: &[GridBox]);
}

/// Counters kept per field per color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldSyncStats {
    /// Ghost reads that ran the full handshake and copied data.
    pub synced_reads: u64,
    /// Ghost reads served from already-valid ghosts.
    pub cached_reads: u64,
    /// Launches that wrote the shared region.
    pub shared_writes: u64,
    /// Phases of the own barrier this color has published.
    pub phases_published: u64,
}

/// Synchronization state of one field on one color.
#[derive(Clone, Debug)]
pub struct FieldSyncState {
    field: FieldId,
    ghost_is_readable: bool,
    own: BarrierHandle,
    owners: Vec<(Color, BarrierHandle)>,
    stats: FieldSyncStats,
}

impl FieldSyncState {
    /// The field.
    pub fn field(&self) -> FieldId {
        self.field
    }

    /// Whether the local ghost copy reflects the owners' latest publish.
    pub fn is_ghost_readable(&self) -> bool {
        self.ghost_is_readable
    }

    /// This color's owner handle.
    pub fn own(&self) -> BarrierHandle {
        self.own
    }

    /// Consumer handles, one per ghost owner, in catalog order.
    pub fn owners(&self) -> &[(Color, BarrierHandle)] {
        &self.owners
    }

    /// Accumulated counters.
    pub fn stats(&self) -> FieldSyncStats {
        self.stats
    }
}

/// Runs the synchronization prolog and epilog for one color.
pub struct GhostSyncCoordinator {
    color: Color,
    registry: Arc<BarrierRegistry>,
    config: SyncConfig,
    pieces: IndexMap<Color, Vec<GridBox>>,
    fields: IndexMap<FieldId, FieldSyncState>,
}

impl GhostSyncCoordinator {
    /// Build the coordinator for `color` over `fields`.
    ///
    /// Fails with [`SyncError::InvalidColoring`] when the catalog does not
    /// describe `color`, or when a barrier the protocol needs (own or a
    /// ghost owner's) is missing from `registry`.
    pub fn new(
        color: Color,
        catalog: &ColoringResult,
        fields: &[FieldId],
        registry: Arc<BarrierRegistry>,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        let owners = catalog
            .ghost_owners(color)
            .ok_or_else(|| SyncError::InvalidColoring {
                color,
                reason: "color is not described by the coloring catalog".into(),
            })?;

        let mut pieces = IndexMap::with_capacity(owners.len());
        for &owner in &owners {
            let boxes: Vec<GridBox> = catalog
                .ghosts_from(color, owner)
                .into_iter()
                .map(|g| g.bounds.clone())
                .collect();
            pieces.insert(owner, boxes);
        }

        let barrier_of = |owner: Color, field: FieldId| {
            registry
                .id_of(owner, field)
                .ok_or_else(|| SyncError::InvalidColoring {
                    color,
                    reason: format!("no barrier registered for color {owner} field {field}"),
                })
        };

        let mut states = IndexMap::with_capacity(fields.len());
        for &field in fields {
            let own = BarrierHandle::owner(barrier_of(color, field)?);
            let mut handles = Vec::with_capacity(owners.len());
            for &owner in &owners {
                handles.push((owner, BarrierHandle::consumer(barrier_of(owner, field)?)));
            }
            states.insert(
                field,
                FieldSyncState {
                    field,
                    ghost_is_readable: false,
                    own,
                    owners: handles,
                    stats: FieldSyncStats::default(),
                },
            );
        }

        debug!(
            %color,
            fields = fields.len(),
            ghost_owners = owners.len(),
            "ghost sync coordinator ready"
        );
        Ok(Self {
            color,
            registry,
            config,
            pieces,
            fields: states,
        })
    }

    /// The color this coordinator serves.
    pub fn color(&self) -> Color {
        self.color
    }

    /// The shared barrier registry.
    pub fn registry(&self) -> &Arc<BarrierRegistry> {
        &self.registry
    }

    /// Active settings.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Colors this color copies ghosts from, in catalog order.
    pub fn ghost_owners(&self) -> impl Iterator<Item = Color> + '_ {
        self.pieces.keys().copied()
    }

    /// State of `field`, if registered.
    pub fn field_state(&self, field: FieldId) -> Option<&FieldSyncState> {
        self.fields.get(&field)
    }

    /// Counters of `field`, if registered.
    pub fn stats(&self, field: FieldId) -> Option<FieldSyncStats> {
        self.fields.get(&field).map(FieldSyncState::stats)
    }

    /// Whether `field`'s ghosts are currently valid, if registered.
    pub fn is_ghost_readable(&self, field: FieldId) -> Option<bool> {
        self.fields.get(&field).map(FieldSyncState::is_ghost_readable)
    }

    /// Prepare one field access of a launch.
    ///
    /// A ghost read (plain or read-write) on stale ghosts blocks until
    /// every owner has published and the data has been copied through
    /// `transfer`. A write-only ghost access is rejected. A shared write
    /// only registers barriers on `launcher`; the executor waits on them
    /// before running the task.
    pub fn prolog(
        &mut self,
        access: &FieldAccess,
        launcher: &mut TaskLauncher,
        transfer: &dyn GhostTransfer,
    ) -> Result<(), SyncError> {
        let privileges = access.privileges;
        if privileges.ghost == AccessMode::Write {
            return Err(SyncError::UnsupportedAccess {
                field: access.field,
                privileges,
            });
        }
        let color = self.color;
        let timeout = self.config.wait_timeout;
        let registry = &self.registry;
        let state = self
            .fields
            .get_mut(&access.field)
            .ok_or(SyncError::UnknownField {
                field: access.field,
            })?;

        if privileges.ghost.reads() {
            if state.ghost_is_readable {
                state.stats.cached_reads += 1;
                trace!(%color, field = %access.field, task = launcher.name(), "ghosts already valid");
            } else {
                // Publish our own shared cells for the phase just written.
                registry.arrive(state.own, 1)?;
                state.own = state.own.advance();
                state.stats.phases_published += 1;

                for (owner, handle) in state.owners.iter_mut() {
                    let owner = *owner;
                    registry.wait(*handle, timeout)?;
                    if let Some(boxes) = self.pieces.get(&owner) {
                        transfer.transfer(access.field, owner, color, boxes);
                    }
                    registry.arrive(*handle, 1)?;
                    *handle = handle.advance();
                }
                state.ghost_is_readable = true;
                state.stats.synced_reads += 1;
                debug!(
                    %color,
                    field = %access.field,
                    task = launcher.name(),
                    phase = state.own.phase,
                    "ghosts synchronized"
                );
            }
        }

        if privileges.writes_shared() {
            registry.alter_arrival_count(state.own, 1)?;
            launcher.add_wait_barrier(state.own);
            launcher.add_arrival_barrier(state.own);
            trace!(
                %color,
                field = %access.field,
                task = launcher.name(),
                phase = state.own.phase,
                "shared write registered"
            );
        }
        Ok(())
    }

    /// Finish one field access after the launch completed.
    ///
    /// A shared write leaves every neighbor's mirror stale. All colors
    /// run the same task sequence, so each one invalidates its own
    /// ghosts on the same launch.
    pub fn epilog(&mut self, access: &FieldAccess) -> Result<(), SyncError> {
        let color = self.color;
        let state = self
            .fields
            .get_mut(&access.field)
            .ok_or(SyncError::UnknownField {
                field: access.field,
            })?;
        if access.privileges.writes_shared() {
            state.ghost_is_readable = false;
            state.stats.shared_writes += 1;
            debug!(%color, field = %access.field, "ghosts invalidated by shared write");
        }
        Ok(())
    }
}

impl std::fmt::Debug for GhostSyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhostSyncCoordinator")
            .field("color", &self.color)
            .field("fields", &self.fields.len())
            .field("ghost_owners", &self.pieces.len())
            .finish()
    }
}
