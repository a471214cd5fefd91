//! Strongly-typed identifiers and the [`Point`] type alias.

use smallvec::SmallVec;
use std::fmt;

/// Identifies a color: one statically assigned subdomain of the grid.
///
/// Colors are numbered row-major over the color lattice, so
/// `Color(n)` is the n-th block when the last dimension varies fastest.
/// One color corresponds to one process (or one worker thread under the
/// threaded runtime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(pub u32);

impl Color {
    /// The color as a slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Color {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a data field registered on the colored index space.
///
/// Each field gets its own set of phase barriers, so ghost consistency
/// is tracked per field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A point in global grid index space.
///
/// Uses `SmallVec<[i64; 4]>` to avoid heap allocation for grids up to
/// 4 dimensions. Components are signed because domain-halo boxes sit
/// outside `[0, grid_size)`.
pub type Point = SmallVec<[i64; 4]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_index_and_display() {
        let c = Color::from(7);
        assert_eq!(c.index(), 7);
        assert_eq!(c.to_string(), "7");
    }

    #[test]
    fn colors_order_by_id() {
        let mut colors = vec![Color(3), Color(0), Color(2)];
        colors.sort();
        assert_eq!(colors, vec![Color(0), Color(2), Color(3)]);
    }
}
