//! Arena of phase barriers, one per (owner color, field).

use halo_coloring::ColoringResult;
use halo_core::{Color, FieldId, SyncError};
use indexmap::IndexMap;
use std::time::Duration;
use tracing::debug;

use crate::barrier::{BarrierHandle, BarrierId, PhaseBarrier, Role};

/// Owns every phase barrier of a run and routes handles to them.
///
/// Barriers live in a flat arena indexed by [`BarrierId`]; handles carry
/// the index, never a reference. The registry is built once from the
/// coloring catalog and shared behind an `Arc` by all colors.
#[derive(Debug, Default)]
pub struct BarrierRegistry {
    barriers: Vec<PhaseBarrier>,
    index: IndexMap<(Color, FieldId), BarrierId>,
}

impl BarrierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one barrier per represented color and field.
    ///
    /// A barrier's consumer count is the number of distinct colors that
    /// read the owner's shared cells.
    pub fn from_catalog(catalog: &ColoringResult, fields: &[FieldId]) -> Self {
        let mut registry = Self::new();
        for &color in catalog.colors() {
            let consumers = catalog.shared_users(color).map_or(0, |u| u.len()) as u32;
            for &field in fields {
                registry.register(color, field, consumers);
            }
        }
        debug!(
            barriers = registry.len(),
            colors = catalog.colors().len(),
            fields = fields.len(),
            "barrier registry built"
        );
        registry
    }

    /// Add a barrier for (`owner`, `field`), or return the existing one.
    pub fn register(&mut self, owner: Color, field: FieldId, consumers: u32) -> BarrierId {
        if let Some(&id) = self.index.get(&(owner, field)) {
            return id;
        }
        let id = BarrierId(self.barriers.len() as u32);
        self.barriers
            .push(PhaseBarrier::new(id, owner, field, consumers));
        self.index.insert((owner, field), id);
        id
    }

    /// Number of barriers.
    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    /// Whether the registry holds no barriers.
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Barrier id for (`owner`, `field`).
    pub fn id_of(&self, owner: Color, field: FieldId) -> Option<BarrierId> {
        self.index.get(&(owner, field)).copied()
    }

    /// Look up a barrier.
    pub fn get(&self, id: BarrierId) -> Option<&PhaseBarrier> {
        self.barriers.get(id.0 as usize)
    }

    /// Iterate all barriers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PhaseBarrier> {
        self.barriers.iter()
    }

    fn resolve(&self, handle: BarrierHandle) -> Result<&PhaseBarrier, SyncError> {
        self.get(handle.barrier).ok_or(SyncError::UnknownBarrier {
            barrier: handle.barrier.0,
        })
    }

    /// Arrive `count` times on the handle's phase in the handle's role.
    pub fn arrive(&self, handle: BarrierHandle, count: u64) -> Result<(), SyncError> {
        self.resolve(handle)?.arrive(handle.role, handle.phase, count);
        Ok(())
    }

    /// Block until the handle's gate opens. See [`PhaseBarrier::wait`].
    pub fn wait(&self, handle: BarrierHandle, timeout: Option<Duration>) -> Result<(), SyncError> {
        self.resolve(handle)?
            .wait(handle.role, handle.phase, timeout)
    }

    /// The handle for the next phase.
    pub fn advance(&self, handle: BarrierHandle) -> BarrierHandle {
        handle.advance()
    }

    /// Raise the owner quota of the handle's phase.
    ///
    /// Only owner handles carry a quota; a consumer handle is rejected.
    pub fn alter_arrival_count(&self, handle: BarrierHandle, delta: u64) -> Result<(), SyncError> {
        let barrier = self.resolve(handle)?;
        if handle.role != Role::Owner {
            return Err(SyncError::InvalidColoring {
                color: barrier.owner(),
                reason: "arrival count raised through a consumer handle".into(),
            });
        }
        barrier.alter_arrival_count(handle.phase, delta);
        Ok(())
    }
}
