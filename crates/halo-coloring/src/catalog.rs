//! The partition catalog: per-color region boxes produced by the colorer.
//!
//! A [`ColoringResult`] is built once, checked with
//! [`validate`](ColoringResult::validate), and then shared read-only by
//! the storage layer (which sizes buffers from [`ColoringInfo`]) and the
//! synchronization layer (which only reads the shared/ghost color lists).

use halo_core::Color;
use smallvec::SmallVec;

use crate::region::GridBox;
use crate::spec::{GridSpec, ThruDim};

/// A color's halo-inflated box and the metadata needed to address it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionBox {
    /// Owned box inflated by `nhalo`, clipped to the grid.
    pub bounds: GridBox,
    /// The un-halo'd block this color owns.
    pub owned: GridBox,
    /// Global grid extents, for linearizing indices.
    pub strides: SmallVec<[u64; 4]>,
    /// Inter-color halo width.
    pub nhalo: u32,
    /// Boundary padding width.
    pub nhalo_domain: u32,
    /// Adjacency restriction the box was computed with.
    pub thru_dim: ThruDim,
    /// Faces where the halo inflation was clipped by the global boundary:
    /// `onbnd[2d]` is the low face of dimension `d`, `onbnd[2d + 1]` the
    /// high face. All false when `nhalo` is zero.
    pub onbnd: SmallVec<[bool; 8]>,
}

impl PartitionBox {
    /// Whether the low (`high == false`) or high face of dimension `d`
    /// was clipped by the global boundary.
    pub fn on_boundary(&self, d: usize, high: bool) -> bool {
        self.onbnd[2 * d + usize::from(high)]
    }
}

/// Cells of a color that no other color reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExclusiveBox {
    /// Region bounds; empty when the block is thinner than two halos.
    pub bounds: GridBox,
    /// The owning color.
    pub color: Color,
}

/// A piece of a color's owned cells that neighbors mirror as ghosts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedBox {
    /// Piece bounds.
    pub bounds: GridBox,
    /// Colors reading this piece as ghost, ascending.
    pub colors: Vec<Color>,
}

/// A local mirror of a neighbor's shared piece.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GhostBox {
    /// Piece bounds, identical to the owner's shared piece.
    pub bounds: GridBox,
    /// Colors owning this piece as shared.
    pub colors: Vec<Color>,
}

/// Padding outside the global boundary. Owned by no color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainHaloBox {
    /// Padding bounds; always outside `[0, grid_size)`.
    pub bounds: GridBox,
}

/// A global bookkeeping box spanning several colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayBox {
    /// Box bounds.
    pub bounds: GridBox,
}

/// Region class selector with its partition bitmask.
///
/// A zero bit marks an included class: bit 0 exclusive, bit 1 shared,
/// bit 2 ghost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    /// Exclusive cells only.
    Exclusive,
    /// Shared cells only.
    Shared,
    /// Ghost cells only.
    Ghost,
    /// Exclusive and shared cells.
    Owned,
    /// Every cell a color stores.
    All,
}

impl PartitionKind {
    /// The bitmask value.
    pub fn mask(self) -> u8 {
        match self {
            Self::Exclusive => 0b110,
            Self::Shared => 0b101,
            Self::Ghost => 0b011,
            Self::Owned => 0b100,
            Self::All => 0b000,
        }
    }

    /// Whether exclusive cells are selected.
    pub fn includes_exclusive(self) -> bool {
        self.mask() & 0b001 == 0
    }

    /// Whether shared cells are selected.
    pub fn includes_shared(self) -> bool {
        self.mask() & 0b010 == 0
    }

    /// Whether ghost cells are selected.
    pub fn includes_ghost(self) -> bool {
        self.mask() & 0b100 == 0
    }
}

/// Per-color entity counts and adjacency, the storage layer's view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColoringInfo {
    /// The described color.
    pub color: Color,
    /// Exclusive cell count.
    pub exclusive: u64,
    /// Shared cell count.
    pub shared: u64,
    /// Ghost cell count.
    pub ghost: u64,
    /// Colors reading this color's shared cells.
    pub shared_users: Vec<Color>,
    /// Colors this color copies ghosts from.
    pub ghost_owners: Vec<Color>,
}

impl ColoringInfo {
    /// Cells the color must store locally.
    pub fn total(&self) -> u64 {
        self.exclusive + self.shared + self.ghost
    }
}

/// The complete partition catalog, one slot per represented color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColoringResult {
    pub(crate) spec: GridSpec,
    pub(crate) colors: Vec<Color>,
    pub(crate) partition: Vec<PartitionBox>,
    pub(crate) exclusive: Vec<ExclusiveBox>,
    pub(crate) shared: Vec<Vec<SharedBox>>,
    pub(crate) ghost: Vec<Vec<GhostBox>>,
    pub(crate) domain_halo: Vec<Vec<DomainHaloBox>>,
    pub(crate) overlay: Vec<OverlayBox>,
}

impl ColoringResult {
    /// The spec this catalog was derived from.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Colors described by the catalog, ascending. Slot `i` describes `colors()[i]`.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Total colors in the decomposition (not just the represented ones).
    pub fn total_colors(&self) -> usize {
        self.spec.num_colors()
    }

    /// Slot index of `color`, if represented.
    pub fn slot(&self, color: Color) -> Option<usize> {
        self.colors.binary_search(&color).ok()
    }

    /// Partition boxes, by slot.
    pub fn partition(&self) -> &[PartitionBox] {
        &self.partition
    }

    /// Exclusive boxes, by slot.
    pub fn exclusive(&self) -> &[ExclusiveBox] {
        &self.exclusive
    }

    /// Shared pieces, by slot.
    pub fn shared(&self) -> &[Vec<SharedBox>] {
        &self.shared
    }

    /// Ghost pieces, by slot.
    pub fn ghost(&self) -> &[Vec<GhostBox>] {
        &self.ghost
    }

    /// Domain-halo boxes, by slot.
    pub fn domain_halo(&self) -> &[Vec<DomainHaloBox>] {
        &self.domain_halo
    }

    /// Global overlay boxes.
    pub fn overlay(&self) -> &[OverlayBox] {
        &self.overlay
    }

    /// Partition box of `color`.
    pub fn partition_of(&self, color: Color) -> Option<&PartitionBox> {
        self.slot(color).map(|s| &self.partition[s])
    }

    /// Exclusive box of `color`.
    pub fn exclusive_of(&self, color: Color) -> Option<&ExclusiveBox> {
        self.slot(color).map(|s| &self.exclusive[s])
    }

    /// Shared pieces of `color`.
    pub fn shared_of(&self, color: Color) -> Option<&[SharedBox]> {
        self.slot(color).map(|s| self.shared[s].as_slice())
    }

    /// Ghost pieces of `color`.
    pub fn ghost_of(&self, color: Color) -> Option<&[GhostBox]> {
        self.slot(color).map(|s| self.ghost[s].as_slice())
    }

    /// Domain-halo boxes of `color`.
    pub fn domain_halo_of(&self, color: Color) -> Option<&[DomainHaloBox]> {
        self.slot(color).map(|s| self.domain_halo[s].as_slice())
    }

    /// Colors reading `color`'s shared cells, ascending and deduplicated.
    pub fn shared_users(&self, color: Color) -> Option<Vec<Color>> {
        let shared = self.shared_of(color)?;
        let mut users: Vec<Color> = shared.iter().flat_map(|s| s.colors.iter().copied()).collect();
        users.sort_unstable();
        users.dedup();
        Some(users)
    }

    /// Colors `color` copies ghosts from, in catalog order, deduplicated.
    pub fn ghost_owners(&self, color: Color) -> Option<Vec<Color>> {
        let ghost = self.ghost_of(color)?;
        let mut owners: Vec<Color> = Vec::new();
        for owner in ghost.iter().flat_map(|g| g.colors.iter().copied()) {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        Some(owners)
    }

    /// Ghost pieces of `color` owned by `owner`, in catalog order.
    pub fn ghosts_from(&self, color: Color, owner: Color) -> Vec<&GhostBox> {
        self.ghost_of(color)
            .map(|g| g.iter().filter(|b| b.colors.contains(&owner)).collect())
            .unwrap_or_default()
    }

    /// Boxes of one region class for `color`.
    pub fn boxes(&self, color: Color, kind: PartitionKind) -> Vec<GridBox> {
        let Some(slot) = self.slot(color) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if kind.includes_exclusive() && !self.exclusive[slot].bounds.is_empty() {
            out.push(self.exclusive[slot].bounds.clone());
        }
        if kind.includes_shared() {
            out.extend(self.shared[slot].iter().map(|s| s.bounds.clone()));
        }
        if kind.includes_ghost() {
            out.extend(self.ghost[slot].iter().map(|g| g.bounds.clone()));
        }
        out
    }

    /// Cell count of one region class for `color`.
    pub fn entity_count(&self, color: Color, kind: PartitionKind) -> u64 {
        self.boxes(color, kind).iter().map(GridBox::volume).sum()
    }

    /// Storage summary for every represented color.
    pub fn coloring_info(&self) -> Vec<ColoringInfo> {
        self.colors
            .iter()
            .map(|&color| ColoringInfo {
                color,
                exclusive: self.entity_count(color, PartitionKind::Exclusive),
                shared: self.entity_count(color, PartitionKind::Shared),
                ghost: self.entity_count(color, PartitionKind::Ghost),
                shared_users: self.shared_users(color).unwrap_or_default(),
                ghost_owners: self.ghost_owners(color).unwrap_or_default(),
            })
            .collect()
    }

    /// Largest per-color storage requirement, the uniform buffer length
    /// a storage layer allocates for every color.
    pub fn max_entities(&self) -> u64 {
        self.coloring_info()
            .iter()
            .map(ColoringInfo::total)
            .max()
            .unwrap_or(0)
    }
}
