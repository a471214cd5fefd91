//! The box colorer: block decomposition of a structured grid into
//! per-color exclusive, shared, ghost and domain-halo boxes.
//!
//! Every quantity here is a pure function of the [`GridSpec`], so any
//! process can compute any color's catalog entry without communication.
//! Ghost boxes are derived from the owner's shared pieces rather than
//! computed independently, which makes ghost/shared reciprocity exact.

use halo_core::error::invalid_configuration;
use halo_core::{Color, ColoringError, Point};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::catalog::{
    ColoringResult, DomainHaloBox, ExclusiveBox, GhostBox, OverlayBox, PartitionBox, SharedBox,
};
use crate::region::GridBox;
use crate::spec::GridSpec;

/// Block colorer for structured grids.
///
/// Stateless; the associated functions take the spec explicitly.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxColorer;

impl BoxColorer {
    /// Color every block of the grid.
    ///
    /// Deterministic: repeated calls with equal specs return equal
    /// catalogs.
    pub fn color(spec: &GridSpec) -> Result<ColoringResult, ColoringError> {
        spec.validate()?;
        let all: Vec<Color> = (0..spec.num_colors() as u32).map(Color).collect();
        Ok(build(spec, &all))
    }

    /// Color only the listed blocks.
    ///
    /// Entries are identical to the matching entries of
    /// [`color`](Self::color). Duplicates are collapsed and slots are
    /// ordered by color.
    pub fn color_local(spec: &GridSpec, colors: &[Color]) -> Result<ColoringResult, ColoringError> {
        spec.validate()?;
        let total = spec.num_colors();
        if let Some(bad) = colors.iter().find(|c| c.index() >= total) {
            return Err(invalid_configuration(format!(
                "color {bad} is outside [0, {total})"
            )));
        }
        let mut wanted = colors.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(build(spec, &wanted))
    }
}

/// Color every block of the grid. Shorthand for [`BoxColorer::color`].
pub fn color(spec: &GridSpec) -> Result<ColoringResult, ColoringError> {
    BoxColorer::color(spec)
}

// ── Per-dimension layout ─────────────────────────────────────────

/// A run of cells along one dimension of an owned block, with the
/// halo sides it falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    lo: i64,
    hi: i64,
    low_side: bool,
    high_side: bool,
}

/// Geometry of one block along one dimension.
#[derive(Clone, Copy, Debug)]
struct Span {
    lo: i64,
    hi: i64,
    has_low: bool,
    has_high: bool,
    /// Last cell read by the low neighbor, or `lo - 1` if none.
    low_end: i64,
    /// First cell read by the high neighbor, or `hi + 1` if none.
    high_start: i64,
}

impl Span {
    fn new(spec: &GridSpec, d: usize, block: i64) -> Self {
        let (start, width) = spec.block_span(d, block);
        let (lo, hi) = (start, start + width - 1);
        let h = i64::from(spec.nhalo);
        let has_low = block > 0;
        let has_high = block < spec.ncolors[d] - 1;
        let low_end = if has_low && h > 0 { lo + h - 1 } else { lo - 1 };
        let high_start = if has_high && h > 0 { hi - h + 1 } else { hi + 1 };
        Self {
            lo,
            hi,
            has_low,
            has_high,
            low_end,
            high_start,
        }
    }

    /// Split `[lo, hi]` at the halo slab boundaries.
    ///
    /// When the block is narrower than two halos the slabs overlap and
    /// the middle segment carries both side flags.
    fn segments(&self) -> SmallVec<[Segment; 3]> {
        let mut cuts: SmallVec<[i64; 4]> = SmallVec::new();
        cuts.push(self.lo);
        for cut in [self.low_end + 1, self.high_start] {
            if cut > self.lo && cut <= self.hi {
                cuts.push(cut);
            }
        }
        cuts.push(self.hi + 1);
        cuts.sort_unstable();
        cuts.dedup();

        cuts.windows(2)
            .map(|w| {
                let (lo, hi) = (w[0], w[1] - 1);
                Segment {
                    lo,
                    hi,
                    low_side: lo <= self.low_end,
                    high_side: hi >= self.high_start,
                }
            })
            .collect()
    }
}

fn spans(spec: &GridSpec, color: Color) -> SmallVec<[Span; 4]> {
    spec.block_index(color)
        .iter()
        .enumerate()
        .map(|(d, &i)| Span::new(spec, d, i))
        .collect()
}

// ── Region construction ──────────────────────────────────────────

fn exclusive_box(spans: &[Span]) -> GridBox {
    GridBox::new(
        spans.iter().map(|s| s.low_end + 1).collect(),
        spans.iter().map(|s| s.high_start - 1).collect(),
    )
}

/// Shared pieces of `color`, row-major over the segment lattice.
fn shared_pieces(spec: &GridSpec, color: Color) -> Vec<SharedBox> {
    let spans = spans(spec, color);
    let segments: Vec<SmallVec<[Segment; 3]>> = spans.iter().map(Span::segments).collect();
    let neighbors = spec.neighbors(color);
    let ndim = spec.ndim();

    let mut pieces = Vec::new();
    let mut pick = vec![0usize; ndim];
    loop {
        let segs: SmallVec<[Segment; 4]> = (0..ndim).map(|d| segments[d][pick[d]]).collect();
        if segs.iter().any(|s| s.low_side || s.high_side) {
            let mut colors: Vec<Color> = neighbors
                .iter()
                .filter(|(offset, _)| reads_piece(offset, &segs))
                .map(|&(_, n)| n)
                .collect();
            colors.sort_unstable();
            colors.dedup();
            if !colors.is_empty() {
                pieces.push(SharedBox {
                    bounds: GridBox::new(
                        segs.iter().map(|s| s.lo).collect(),
                        segs.iter().map(|s| s.hi).collect(),
                    ),
                    colors,
                });
            }
        }

        // Odometer step, last dimension fastest.
        let mut d = ndim;
        loop {
            if d == 0 {
                return pieces;
            }
            d -= 1;
            pick[d] += 1;
            if pick[d] < segments[d].len() {
                break;
            }
            pick[d] = 0;
        }
    }
}

/// Whether the neighbor at `offset` reads every cell of the piece.
fn reads_piece(offset: &Point, segs: &[Segment]) -> bool {
    offset.iter().zip(segs).all(|(&o, s)| match o {
        -1 => s.low_side,
        1 => s.high_side,
        _ => true,
    })
}

fn partition_box(spec: &GridSpec, color: Color, spans: &[Span]) -> PartitionBox {
    let owned = spec.owned_box(color);
    let bounds = owned
        .inflate(i64::from(spec.nhalo))
        .intersect(&spec.domain());
    // Set where the inflated box had to be clipped to the grid.
    let inflated = spec.nhalo > 0;
    let onbnd = spans
        .iter()
        .flat_map(|s| [inflated && !s.has_low, inflated && !s.has_high])
        .collect();
    PartitionBox {
        bounds,
        owned,
        strides: spec.strides(),
        nhalo: spec.nhalo,
        nhalo_domain: spec.nhalo_domain,
        thru_dim: spec.thru_dim,
        onbnd,
    }
}

/// Boundary padding of one color.
///
/// The box on face `(d, side)` spans the owned extent in later
/// dimensions and the padded extent in earlier ones, so the boxes of all
/// colors tile the padding shell exactly once.
fn domain_halo(spec: &GridSpec, spans: &[Span]) -> Vec<DomainHaloBox> {
    let hd = i64::from(spec.nhalo_domain);
    if hd == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for d in 0..spans.len() {
        for high in [false, true] {
            let on_boundary = if high {
                !spans[d].has_high
            } else {
                !spans[d].has_low
            };
            if !on_boundary {
                continue;
            }
            let mut lower = Point::new();
            let mut upper = Point::new();
            for (e, s) in spans.iter().enumerate() {
                let (lo, hi) = if e == d {
                    if high {
                        (spec.grid_size[d], spec.grid_size[d] + hd - 1)
                    } else {
                        (-hd, -1)
                    }
                } else if e < d {
                    (
                        s.lo - if s.has_low { 0 } else { hd },
                        s.hi + if s.has_high { 0 } else { hd },
                    )
                } else {
                    (s.lo, s.hi)
                };
                lower.push(lo);
                upper.push(hi);
            }
            out.push(DomainHaloBox {
                bounds: GridBox::new(lower, upper),
            });
        }
    }
    out
}

/// Global bookkeeping boxes: the padded grid, then one interface slab
/// per internal block cut.
fn overlay(spec: &GridSpec) -> Vec<OverlayBox> {
    let mut out = vec![OverlayBox {
        bounds: spec.domain().inflate(i64::from(spec.nhalo_domain)),
    }];
    let h = i64::from(spec.nhalo);
    if h == 0 {
        return out;
    }
    let domain = spec.domain();
    for d in 0..spec.ndim() {
        for i in 1..spec.ncolors[d] {
            let (cut, _) = spec.block_span(d, i);
            let mut slab = domain.clone();
            slab.lower[d] = cut - h;
            slab.upper[d] = cut + h - 1;
            out.push(OverlayBox { bounds: slab });
        }
    }
    out
}

// ── Assembly ─────────────────────────────────────────────────────

fn build(spec: &GridSpec, colors: &[Color]) -> ColoringResult {
    // Shared pieces are needed for every requested color and every
    // neighbor of one; compute each exactly once.
    let mut pieces: IndexMap<Color, Vec<SharedBox>> = IndexMap::new();
    for &c in colors {
        for n in std::iter::once(c).chain(spec.neighbors(c).into_iter().map(|(_, n)| n)) {
            pieces
                .entry(n)
                .or_insert_with(|| shared_pieces(spec, n));
        }
    }

    let mut result = ColoringResult {
        spec: spec.clone(),
        colors: colors.to_vec(),
        partition: Vec::with_capacity(colors.len()),
        exclusive: Vec::with_capacity(colors.len()),
        shared: Vec::with_capacity(colors.len()),
        ghost: Vec::with_capacity(colors.len()),
        domain_halo: Vec::with_capacity(colors.len()),
        overlay: overlay(spec),
    };

    for &c in colors {
        let spans = spans(spec, c);
        let shared = pieces.get(&c).cloned().unwrap_or_default();

        let mut ghost = Vec::new();
        for (_, n) in spec.neighbors(c) {
            let Some(owner_pieces) = pieces.get(&n) else {
                continue;
            };
            ghost.extend(
                owner_pieces
                    .iter()
                    .filter(|p| p.colors.contains(&c))
                    .map(|p| GhostBox {
                        bounds: p.bounds.clone(),
                        colors: vec![n],
                    }),
            );
        }

        trace!(
            color = %c,
            shared = shared.len(),
            ghost = ghost.len(),
            "colored block"
        );

        result.partition.push(partition_box(spec, c, &spans));
        result.exclusive.push(ExclusiveBox {
            bounds: exclusive_box(&spans),
            color: c,
        });
        result.shared.push(shared);
        result.ghost.push(ghost);
        result.domain_halo.push(domain_halo(spec, &spans));
    }

    debug!(
        colors = colors.len(),
        total = spec.num_colors(),
        nhalo = spec.nhalo,
        "coloring complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PartitionKind;
    use crate::spec::ThruDim;
    use proptest::prelude::*;

    fn cube() -> GridSpec {
        GridSpec::new(vec![10, 10, 10], vec![2, 2, 1], 1, 1, ThruDim::Dim(0))
    }

    fn b(lower: &[i64], upper: &[i64]) -> GridBox {
        GridBox::from_slices(lower, upper)
    }

    #[test]
    fn one_dimensional_two_blocks() {
        let spec = GridSpec::new(vec![8], vec![2], 1, 0, ThruDim::Restricted);
        let r = color(&spec).unwrap();
        assert_eq!(r.exclusive_of(Color(0)).unwrap().bounds, b(&[0], &[2]));
        assert_eq!(
            r.shared_of(Color(0)).unwrap(),
            &[SharedBox {
                bounds: b(&[3], &[3]),
                colors: vec![Color(1)],
            }]
        );
        assert_eq!(
            r.ghost_of(Color(0)).unwrap(),
            &[GhostBox {
                bounds: b(&[4], &[4]),
                colors: vec![Color(1)],
            }]
        );
        assert_eq!(r.exclusive_of(Color(1)).unwrap().bounds, b(&[5], &[7]));
        assert!(r.domain_halo_of(Color(0)).unwrap().is_empty());
    }

    #[test]
    fn zero_halo_has_no_shared_or_ghost() {
        let spec = GridSpec::new(vec![6, 6], vec![2, 3], 0, 0, ThruDim::Unrestricted);
        let r = color(&spec).unwrap();
        for &c in r.colors() {
            assert_eq!(
                r.exclusive_of(c).unwrap().bounds,
                r.partition_of(c).unwrap().owned
            );
            assert!(r.shared_of(c).unwrap().is_empty());
            assert!(r.ghost_of(c).unwrap().is_empty());
        }
        // Only the padded-grid entry.
        assert_eq!(r.overlay().len(), 1);
    }

    #[test]
    fn thin_block_has_empty_exclusive() {
        // Middle block is 2 wide with a halo of 1 on both sides.
        let spec = GridSpec::new(vec![6], vec![3], 1, 0, ThruDim::Restricted);
        let r = color(&spec).unwrap();
        assert!(r.exclusive_of(Color(1)).unwrap().bounds.is_empty());
        assert_eq!(r.entity_count(Color(1), PartitionKind::Shared), 2);
    }

    #[test]
    fn block_as_wide_as_halo_overlaps_slabs() {
        // Middle block [3, 5] with nhalo 3: every cell is read by both sides.
        let spec = GridSpec::new(vec![9], vec![3], 3, 0, ThruDim::Restricted);
        let r = color(&spec).unwrap();
        let shared = r.shared_of(Color(1)).unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].bounds, b(&[3], &[5]));
        assert_eq!(shared[0].colors, vec![Color(0), Color(2)]);
    }

    #[test]
    fn face_only_corner_piece_lists_both_faces() {
        let r = color(&cube()).unwrap();
        let shared = r.shared_of(Color(0)).unwrap();
        let corner = shared
            .iter()
            .find(|s| s.bounds == b(&[4, 4, 0], &[4, 4, 9]))
            .unwrap();
        assert_eq!(corner.colors, vec![Color(1), Color(2)]);
        assert!(shared.iter().all(|s| !s.colors.contains(&Color(3))));
    }

    #[test]
    fn unrestricted_corner_piece_includes_diagonal() {
        let spec = GridSpec {
            thru_dim: ThruDim::Unrestricted,
            ..cube()
        };
        let r = color(&spec).unwrap();
        let corner = r
            .shared_of(Color(0))
            .unwrap()
            .iter()
            .find(|s| s.bounds == b(&[4, 4, 0], &[4, 4, 9]))
            .unwrap()
            .clone();
        assert_eq!(corner.colors, vec![Color(1), Color(2), Color(3)]);
        let from_zero = r.ghosts_from(Color(3), Color(0));
        assert_eq!(from_zero.len(), 1);
        assert_eq!(from_zero[0].bounds, corner.bounds);
    }

    #[test]
    fn onbnd_flags_match_block_position() {
        let r = color(&cube()).unwrap();
        let p0 = r.partition_of(Color(0)).unwrap();
        assert_eq!(p0.onbnd.to_vec(), vec![true, false, true, false, true, true]);
        assert!(p0.on_boundary(2, true));
        let p3 = r.partition_of(Color(3)).unwrap();
        assert_eq!(p3.onbnd.to_vec(), vec![false, true, false, true, true, true]);
    }

    #[test]
    fn zero_halo_sets_no_boundary_flags() {
        let spec = GridSpec::new(vec![6, 6], vec![2, 2], 0, 1, ThruDim::Restricted);
        let r = color(&spec).unwrap();
        for p in r.partition() {
            assert!(p.onbnd.iter().all(|&f| !f));
            assert_eq!(p.bounds, p.owned);
        }
        // Padding is still laid out on the boundary faces.
        assert_eq!(r.domain_halo_of(Color(0)).unwrap().len(), 2);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn dimension_restriction_matches_face_only_coloring() {
        let face = color(&cube()).unwrap();
        let spec = GridSpec {
            thru_dim: ThruDim::Dim(1),
            ..cube()
        };
        let r = color(&spec).unwrap();
        assert_eq!(r.ghost_owners(Color(0)).unwrap(), vec![Color(1), Color(2)]);
        assert!(r.ghosts_from(Color(0), Color(3)).is_empty());
        for &c in r.colors() {
            assert_eq!(r.shared_of(c), face.shared_of(c));
            assert_eq!(r.ghost_of(c), face.ghost_of(c));
        }
    }

    #[test]
    fn partition_box_is_clipped_to_grid() {
        let r = color(&cube()).unwrap();
        assert_eq!(
            r.partition_of(Color(0)).unwrap().bounds,
            b(&[0, 0, 0], &[5, 5, 9])
        );
    }

    #[test]
    fn domain_halo_tiles_padding_shell() {
        let spec = GridSpec::new(vec![5, 4], vec![2, 2], 1, 2, ThruDim::Restricted);
        let r = color(&spec).unwrap();
        let halo: Vec<GridBox> = r
            .domain_halo()
            .iter()
            .flatten()
            .map(|h| h.bounds.clone())
            .collect();
        let padded_cells = 9 * 8;
        let grid_cells = 5 * 4;
        let total: u64 = halo.iter().map(GridBox::volume).sum();
        assert_eq!(total, padded_cells - grid_cells);
        for (i, a) in halo.iter().enumerate() {
            for other in &halo[i + 1..] {
                assert!(!a.intersects(other), "{a:?} overlaps {other:?}");
            }
        }
    }

    #[test]
    fn overlay_has_padded_grid_and_interface_slabs() {
        let r = color(&cube()).unwrap();
        let overlay = r.overlay();
        assert_eq!(overlay[0].bounds, b(&[-1, -1, -1], &[10, 10, 10]));
        // One cut in dimension 0, one in dimension 1, none in dimension 2.
        assert_eq!(overlay.len(), 3);
        assert_eq!(overlay[1].bounds, b(&[4, 0, 0], &[5, 9, 9]));
        assert_eq!(overlay[2].bounds, b(&[0, 4, 0], &[9, 5, 9]));
    }

    #[test]
    fn color_local_matches_full_coloring() {
        let spec = cube();
        let full = color(&spec).unwrap();
        let local = BoxColorer::color_local(&spec, &[Color(2), Color(1), Color(2)]).unwrap();
        assert_eq!(local.colors(), &[Color(1), Color(2)]);
        for &c in local.colors() {
            assert_eq!(local.partition_of(c), full.partition_of(c));
            assert_eq!(local.exclusive_of(c), full.exclusive_of(c));
            assert_eq!(local.shared_of(c), full.shared_of(c));
            assert_eq!(local.ghost_of(c), full.ghost_of(c));
            assert_eq!(local.domain_halo_of(c), full.domain_halo_of(c));
        }
        assert!(local.partition_of(Color(0)).is_none());
    }

    #[test]
    fn color_local_rejects_unknown_color() {
        let err = BoxColorer::color_local(&cube(), &[Color(4)]).unwrap_err();
        assert!(matches!(err, ColoringError::InvalidConfiguration { .. }));
    }

    #[test]
    fn invalid_spec_produces_no_catalog() {
        let spec = GridSpec::new(vec![4, 4], vec![5, 1], 1, 0, ThruDim::Restricted);
        assert!(color(&spec).is_err());
    }

    fn arb_spec() -> impl Strategy<Value = GridSpec> {
        (1usize..=3)
            .prop_flat_map(|ndim| {
                (
                    proptest::collection::vec((1i64..=4, 1i64..=4), ndim),
                    0u32..=2,
                    0u32..=2,
                    0u8..3,
                    0usize..3,
                )
            })
            .prop_map(|(dims, nhalo, nhalo_domain, thru, along)| {
                let ndim = dims.len();
                // Keep every block at least nhalo wide.
                let grid_size = dims
                    .iter()
                    .map(|&(k, extra)| k * i64::from(nhalo.max(1)) + extra)
                    .collect::<Vec<_>>();
                let ncolors = dims.iter().map(|&(k, _)| k).collect::<Vec<_>>();
                let thru_dim = match thru {
                    0 => ThruDim::Restricted,
                    1 => ThruDim::Dim(along % ndim),
                    _ => ThruDim::Unrestricted,
                };
                GridSpec::new(grid_size, ncolors, nhalo, nhalo_domain, thru_dim)
            })
    }

    proptest! {
        #[test]
        fn exclusive_and_shared_tile_owned(spec in arb_spec()) {
            let r = color(&spec).unwrap();
            for (slot, &c) in r.colors().iter().enumerate() {
                let owned = &r.partition()[slot].owned;
                let excl = &r.exclusive()[slot].bounds;
                let shared = &r.shared()[slot];
                prop_assert!(owned.contains_box(excl));
                let mut sum = excl.volume();
                for (i, s) in shared.iter().enumerate() {
                    prop_assert!(owned.contains_box(&s.bounds));
                    prop_assert!(!s.bounds.intersects(excl));
                    for other in &shared[i + 1..] {
                        prop_assert!(!s.bounds.intersects(&other.bounds));
                    }
                    sum += s.bounds.volume();
                }
                prop_assert_eq!(sum, owned.volume(), "color {}", c);
            }
        }

        #[test]
        fn ghosts_and_shared_are_reciprocal(spec in arb_spec()) {
            let r = color(&spec).unwrap();
            for &c in r.colors() {
                for g in r.ghost_of(c).unwrap() {
                    let owner = g.colors[0];
                    let matched = r.shared_of(owner).unwrap().iter()
                        .any(|s| s.bounds == g.bounds && s.colors.contains(&c));
                    prop_assert!(matched);
                }
                for s in r.shared_of(c).unwrap() {
                    for &reader in &s.colors {
                        let matched = r.ghost_of(reader).unwrap().iter()
                            .any(|g| g.bounds == s.bounds && g.colors == vec![c]);
                        prop_assert!(matched);
                    }
                }
            }
        }

        #[test]
        fn dimension_restriction_is_face_only(spec in arb_spec(), along in 0usize..3) {
            let restricted = GridSpec { thru_dim: ThruDim::Restricted, ..spec.clone() };
            let dim = GridSpec { thru_dim: ThruDim::Dim(along % spec.ndim()), ..spec };
            let a = color(&restricted).unwrap();
            let b = color(&dim).unwrap();
            for &c in a.colors() {
                prop_assert_eq!(a.shared_of(c), b.shared_of(c));
                prop_assert_eq!(a.ghost_of(c), b.ghost_of(c));
            }
        }

        #[test]
        fn coloring_is_valid_and_idempotent(spec in arb_spec()) {
            let first = color(&spec).unwrap();
            prop_assert!(first.validate().is_ok());
            let second = color(&spec).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
