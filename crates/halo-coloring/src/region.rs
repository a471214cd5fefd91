//! Axis-aligned boxes in global grid index space.

use halo_core::Point;
use smallvec::SmallVec;

/// An axis-aligned box with inclusive integer bounds.
///
/// A box whose `lower` exceeds `upper` in any dimension is empty. Empty
/// boxes are legal values: a thin block can have an empty exclusive
/// region, for example.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridBox {
    /// Minimum corner (inclusive).
    pub lower: Point,
    /// Maximum corner (inclusive).
    pub upper: Point,
}

impl GridBox {
    /// Create a box from its two corners.
    pub fn new(lower: Point, upper: Point) -> Self {
        debug_assert_eq!(lower.len(), upper.len(), "corner dimensionality differs");
        Self { lower, upper }
    }

    /// Create a box from corner slices.
    pub fn from_slices(lower: &[i64], upper: &[i64]) -> Self {
        Self::new(SmallVec::from_slice(lower), SmallVec::from_slice(upper))
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.lower.len()
    }

    /// Whether the box contains no cells.
    pub fn is_empty(&self) -> bool {
        self.lower.iter().zip(&self.upper).any(|(lo, hi)| lo > hi)
    }

    /// Number of cells along dimension `d` (zero when empty there).
    pub fn extent(&self, d: usize) -> u64 {
        let (lo, hi) = (self.lower[d], self.upper[d]);
        if lo > hi {
            0
        } else {
            (hi - lo + 1) as u64
        }
    }

    /// Total number of cells, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (0..self.ndim())
            .map(|d| self.extent(d))
            .fold(1u64, u64::saturating_mul)
    }

    /// Whether `point` lies inside the box.
    pub fn contains_point(&self, point: &[i64]) -> bool {
        point.len() == self.ndim()
            && point
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(x, (lo, hi))| lo <= x && x <= hi)
    }

    /// Whether every cell of `other` lies inside `self`.
    ///
    /// An empty `other` is contained in anything.
    pub fn contains_box(&self, other: &GridBox) -> bool {
        if other.is_empty() {
            return true;
        }
        (0..self.ndim()).all(|d| self.lower[d] <= other.lower[d] && other.upper[d] <= self.upper[d])
    }

    /// The overlap of two boxes (possibly empty).
    pub fn intersect(&self, other: &GridBox) -> GridBox {
        let lower = self
            .lower
            .iter()
            .zip(&other.lower)
            .map(|(a, b)| *a.max(b))
            .collect();
        let upper = self
            .upper
            .iter()
            .zip(&other.upper)
            .map(|(a, b)| *a.min(b))
            .collect();
        GridBox::new(lower, upper)
    }

    /// Whether the two boxes share at least one cell.
    pub fn intersects(&self, other: &GridBox) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Grow the box by `width` cells on every face.
    pub fn inflate(&self, width: i64) -> GridBox {
        GridBox::new(
            self.lower.iter().map(|x| x - width).collect(),
            self.upper.iter().map(|x| x + width).collect(),
        )
    }

    /// Iterate the cells of the box in row-major order (last dimension fastest).
    pub fn points(&self) -> BoxPoints<'_> {
        let next = if self.is_empty() {
            None
        } else {
            Some(self.lower.clone())
        };
        BoxPoints { bounds: self, next }
    }
}

/// Row-major cell iterator returned by [`GridBox::points`].
pub struct BoxPoints<'a> {
    bounds: &'a GridBox,
    next: Option<Point>,
}

impl Iterator for BoxPoints<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        let mut d = succ.len();
        loop {
            if d == 0 {
                break;
            }
            d -= 1;
            if succ[d] < self.bounds.upper[d] {
                succ[d] += 1;
                self.next = Some(succ);
                break;
            }
            succ[d] = self.bounds.lower[d];
        }
        Some(current)
    }
}

/// Row-major linear offset of `point` in a grid with the given extents.
///
/// Returns `None` when the point is outside `[0, strides)`.
pub fn linearize(point: &[i64], strides: &[u64]) -> Option<usize> {
    if point.len() != strides.len() {
        return None;
    }
    let mut offset: u64 = 0;
    for (&x, &n) in point.iter().zip(strides) {
        if x < 0 || x as u64 >= n {
            return None;
        }
        offset = offset * n + x as u64;
    }
    usize::try_from(offset).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(lower: &[i64], upper: &[i64]) -> GridBox {
        GridBox::from_slices(lower, upper)
    }

    #[test]
    fn volume_and_emptiness() {
        assert_eq!(b(&[0, 0], &[4, 9]).volume(), 50);
        assert!(b(&[3, 0], &[2, 9]).is_empty());
        assert_eq!(b(&[3, 0], &[2, 9]).volume(), 0);
        assert_eq!(b(&[3, 0], &[2, 9]).extent(1), 10);
    }

    #[test]
    fn huge_volume_saturates() {
        let huge = b(&[0, 0, 0], &[1 << 30, 1 << 30, 1 << 30]);
        assert_eq!(huge.volume(), u64::MAX);
    }

    #[test]
    fn intersect_overlapping_and_disjoint() {
        let a = b(&[0, 0], &[4, 4]);
        let c = b(&[3, 2], &[8, 8]);
        assert_eq!(a.intersect(&c), b(&[3, 2], &[4, 4]));
        assert!(a.intersects(&c));
        assert!(!a.intersects(&b(&[5, 0], &[9, 4])));
    }

    #[test]
    fn containment() {
        let outer = b(&[0, 0, 0], &[9, 9, 9]);
        assert!(outer.contains_box(&b(&[1, 1, 1], &[9, 2, 3])));
        assert!(!outer.contains_box(&b(&[-1, 0, 0], &[0, 0, 0])));
        assert!(outer.contains_box(&b(&[5, 5, 5], &[4, 4, 4])));
        assert!(outer.contains_point(&[9, 0, 3]));
        assert!(!outer.contains_point(&[9, 0]));
    }

    #[test]
    fn inflate_grows_every_face() {
        assert_eq!(b(&[2, 3], &[4, 5]).inflate(1), b(&[1, 2], &[5, 6]));
    }

    #[test]
    fn points_are_row_major() {
        let pts: Vec<Vec<i64>> = b(&[0, 5], &[1, 6]).points().map(|p| p.to_vec()).collect();
        assert_eq!(pts, vec![vec![0, 5], vec![0, 6], vec![1, 5], vec![1, 6]]);
        assert_eq!(b(&[1], &[0]).points().count(), 0);
    }

    #[test]
    fn linearize_matches_row_major() {
        assert_eq!(linearize(&[0, 0, 0], &[10, 10, 10]), Some(0));
        assert_eq!(linearize(&[1, 2, 3], &[10, 10, 10]), Some(123));
        assert_eq!(linearize(&[-1, 0, 0], &[10, 10, 10]), None);
        assert_eq!(linearize(&[0, 10, 0], &[10, 10, 10]), None);
    }
}
