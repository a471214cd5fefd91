//! Standard grids and field ids shared across test suites.
//!
//! - [`cube_spec`]: 10×10×10, 2×2×1 colors, face-only, halo 1, padding 1.
//! - [`line_spec`]: 8 cells, 2 colors, halo 1.
//! - [`square_spec`]: 12×12, 2×2 colors, halo 1, caller-chosen adjacency.

use halo_coloring::{GridSpec, ThruDim};
use halo_core::FieldId;

/// Primary field.
pub const U: FieldId = FieldId(0);

/// Secondary field.
pub const V: FieldId = FieldId(1);

pub fn cube_spec() -> GridSpec {
    GridSpec::new(vec![10, 10, 10], vec![2, 2, 1], 1, 1, ThruDim::Dim(0))
}

pub fn line_spec() -> GridSpec {
    GridSpec::new(vec![8], vec![2], 1, 0, ThruDim::Restricted)
}

pub fn square_spec(thru_dim: ThruDim) -> GridSpec {
    GridSpec::new(vec![12, 12], vec![2, 2], 1, 0, thru_dim)
}
