//! Grid specification, validation, and the block layout derived from it.
//!
//! [`GridSpec`] is the only input of the colorer. Every process builds
//! the same spec from its configuration and therefore derives the same
//! block layout without talking to anyone.

use halo_core::error::invalid_configuration;
use halo_core::{Color, ColoringError, Point};
use smallvec::SmallVec;

use crate::region::GridBox;

/// Which neighbor blocks exchange halo data.
///
/// Two blocks are neighbors when their block indices differ by at most
/// one in every dimension. The number of dimensions in which they differ
/// tells whether they touch through a face (1), an edge (2), or a
/// corner (3, in 3D).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThruDim {
    /// Face neighbors only.
    #[default]
    Restricted,
    /// Face neighbors only, with the named dimension recorded on every
    /// partition box. Edge and corner neighbors are never admitted.
    Dim(usize),
    /// All neighbors, including edge and corner neighbors.
    Unrestricted,
}

impl ThruDim {
    /// Whether a neighbor whose block index differs in `differing`
    /// dimensions takes part in halo exchange.
    pub fn admits(self, differing: usize) -> bool {
        match self {
            Self::Restricted | Self::Dim(_) => differing == 1,
            Self::Unrestricted => differing >= 1,
        }
    }
}

/// Highest supported grid dimensionality.
pub const MAX_DIMS: usize = 8;

/// Static description of a colored grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridSpec {
    /// Number of cells along each dimension. Must be positive.
    pub grid_size: Vec<i64>,
    /// Number of blocks (colors) along each dimension. Must be positive
    /// and no larger than the matching `grid_size` entry.
    pub ncolors: Vec<i64>,
    /// Halo width exchanged between neighboring colors.
    pub nhalo: u32,
    /// Padding width outside the global boundary.
    pub nhalo_domain: u32,
    /// Neighbor adjacency restriction.
    pub thru_dim: ThruDim,
}

impl GridSpec {
    /// Create a spec. Call [`validate`](Self::validate) before use; the
    /// colorer does so itself.
    pub fn new(
        grid_size: impl Into<Vec<i64>>,
        ncolors: impl Into<Vec<i64>>,
        nhalo: u32,
        nhalo_domain: u32,
        thru_dim: ThruDim,
    ) -> Self {
        Self {
            grid_size: grid_size.into(),
            ncolors: ncolors.into(),
            nhalo,
            nhalo_domain,
            thru_dim,
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.grid_size.len()
    }

    /// Check every structural constraint. No partial state is produced.
    pub fn validate(&self) -> Result<(), ColoringError> {
        let ndim = self.ndim();
        if ndim == 0 {
            return Err(invalid_configuration("grid must have at least one dimension"));
        }
        if ndim > MAX_DIMS {
            return Err(invalid_configuration(format!(
                "grid has {ndim} dimensions, more than the supported {MAX_DIMS}"
            )));
        }
        if self.ncolors.len() != ndim {
            return Err(invalid_configuration(format!(
                "ncolors has {} entries but grid_size has {ndim}",
                self.ncolors.len()
            )));
        }
        for d in 0..ndim {
            let (n, k) = (self.grid_size[d], self.ncolors[d]);
            if n <= 0 {
                return Err(invalid_configuration(format!(
                    "grid_size[{d}] = {n} must be positive"
                )));
            }
            if k <= 0 {
                return Err(invalid_configuration(format!(
                    "ncolors[{d}] = {k} must be positive"
                )));
            }
            if k > n {
                return Err(invalid_configuration(format!(
                    "ncolors[{d}] = {k} exceeds grid_size[{d}] = {n}"
                )));
            }
            // Only immediate neighbors may overlap through the halo.
            if k > 1 && n / k < i64::from(self.nhalo) {
                return Err(invalid_configuration(format!(
                    "narrowest block along dimension {d} has {} cells, fewer than nhalo = {}",
                    n / k,
                    self.nhalo
                )));
            }
        }
        if let ThruDim::Dim(d) = self.thru_dim {
            if d >= ndim {
                return Err(invalid_configuration(format!(
                    "thru_dim {d} is outside [0, {ndim})"
                )));
            }
        }
        let colors = self
            .ncolors
            .iter()
            .try_fold(1u32, |acc, &k| u32::try_from(k).ok()?.checked_mul(acc));
        if colors.is_none() {
            return Err(invalid_configuration("total color count exceeds u32::MAX"));
        }

        // Every box the colorer builds lies inside the padded grid, so
        // its coordinates and cell count must fit.
        let pad = i64::from(self.nhalo.max(self.nhalo_domain));
        let cells = self.grid_size.iter().try_fold(1u64, |acc, &n| {
            let padded = n.checked_add(pad)?.checked_add(pad)?;
            acc.checked_mul(u64::try_from(padded).ok()?)
        });
        if cells.is_none() {
            return Err(invalid_configuration(
                "padded grid cell count does not fit in 64 bits",
            ));
        }
        Ok(())
    }

    /// Total number of colors (product of `ncolors`), saturating on
    /// specs that fail [`validate`](Self::validate).
    pub fn num_colors(&self) -> usize {
        self.ncolors
            .iter()
            .fold(1usize, |acc, &k| acc.saturating_mul(usize::try_from(k).unwrap_or(usize::MAX)))
    }

    /// Global extents, used as linearization strides.
    pub fn strides(&self) -> SmallVec<[u64; 4]> {
        self.grid_size.iter().map(|&n| n as u64).collect()
    }

    /// The whole grid as a box.
    pub fn domain(&self) -> GridBox {
        GridBox::new(
            self.grid_size.iter().map(|_| 0).collect(),
            self.grid_size.iter().map(|&n| n - 1).collect(),
        )
    }

    /// First cell and width of block `i` along dimension `d`.
    ///
    /// With `q = n / k` and `r = n % k`, the first `r` blocks are one
    /// cell wider than the rest.
    pub fn block_span(&self, d: usize, i: i64) -> (i64, i64) {
        let (n, k) = (self.grid_size[d], self.ncolors[d]);
        let (q, r) = (n / k, n % k);
        let start = i * q + i.min(r);
        let width = if i < r { q + 1 } else { q };
        (start, width)
    }

    /// Block index of a color (row-major, last dimension fastest).
    pub fn block_index(&self, color: Color) -> Point {
        let mut rest = i64::from(color.0);
        let mut index: Point = self.ncolors.iter().map(|_| 0).collect();
        for d in (0..self.ndim()).rev() {
            index[d] = rest % self.ncolors[d];
            rest /= self.ncolors[d];
        }
        index
    }

    /// Color of a block index, or `None` if it lies outside the color lattice.
    pub fn color_at(&self, index: &[i64]) -> Option<Color> {
        if index.len() != self.ndim() {
            return None;
        }
        let mut linear: i64 = 0;
        for (&i, &k) in index.iter().zip(&self.ncolors) {
            if i < 0 || i >= k {
                return None;
            }
            linear = linear * k + i;
        }
        u32::try_from(linear).ok().map(Color)
    }

    /// The un-halo'd block owned by `color`.
    pub fn owned_box(&self, color: Color) -> GridBox {
        let index = self.block_index(color);
        let mut lower = Point::new();
        let mut upper = Point::new();
        for (d, &i) in index.iter().enumerate() {
            let (start, width) = self.block_span(d, i);
            lower.push(start);
            upper.push(start + width - 1);
        }
        GridBox::new(lower, upper)
    }

    /// Admissible neighbors of `color` with their block offsets.
    ///
    /// Offsets are enumerated row-major over `{-1, 0, 1}^D`, which fixes
    /// the catalog order of ghost boxes and barrier peers. Dimensions
    /// with a single block only ever take offset 0.
    pub fn neighbors(&self, color: Color) -> Vec<(Point, Color)> {
        let ndim = self.ndim();
        let index = self.block_index(color);
        let active: SmallVec<[usize; 8]> = (0..ndim).filter(|&d| self.ncolors[d] > 1).collect();
        let mut out = Vec::new();
        let total = 3usize.pow(active.len() as u32);
        for code in 0..total {
            let mut offset: Point = SmallVec::from_elem(0, ndim);
            let mut rest = code;
            for &d in active.iter().rev() {
                offset[d] = (rest % 3) as i64 - 1;
                rest /= 3;
            }
            let differing = offset.iter().filter(|&&o| o != 0).count();
            if differing == 0 || !self.thru_dim.admits(differing) {
                continue;
            }
            let target: Point = index.iter().zip(&offset).map(|(i, o)| i + o).collect();
            if let Some(neighbor) = self.color_at(&target) {
                out.push((offset, neighbor));
            }
        }
        out
    }
}
