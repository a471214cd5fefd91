//! Self-check of a [`ColoringResult`] before it is handed to consumers.

use halo_core::error::invalid_coloring;
use halo_core::{Color, ColoringError};

use crate::catalog::ColoringResult;
use crate::region::GridBox;

impl ColoringResult {
    /// Check the structural invariants of the catalog.
    ///
    /// Verifies, for every represented color: exclusive and shared
    /// regions tile the owned block without overlap; ghost boxes and
    /// the owners' shared pieces mirror each other (for every pair where
    /// both colors are represented); domain-halo boxes stay clear of all
    /// stored regions; strides agree; referenced colors exist.
    pub fn validate(&self) -> Result<(), ColoringError> {
        let total = self.total_colors();
        let n = self.colors.len();
        if [
            self.partition.len(),
            self.exclusive.len(),
            self.shared.len(),
            self.ghost.len(),
            self.domain_halo.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(invalid_coloring("per-color collections differ in length"));
        }
        if self.colors.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid_coloring("slot colors are not strictly ascending"));
        }

        let strides = self.spec.strides();
        for slot in 0..n {
            let color = self.colors[slot];
            check_color(color, total)?;
            let partition = &self.partition[slot];
            if partition.strides != strides {
                return Err(invalid_coloring(format!(
                    "color {color}: strides {:?} differ from grid extents {:?}",
                    partition.strides, strides
                )));
            }
            if self.exclusive[slot].color != color {
                return Err(invalid_coloring(format!(
                    "slot {slot}: exclusive box belongs to color {}, expected {color}",
                    self.exclusive[slot].color
                )));
            }
            self.check_owned_tiling(slot)?;
            self.check_ghosts(slot)?;
            for s in &self.shared[slot] {
                for &reader in &s.colors {
                    check_color(reader, total)?;
                }
            }
        }
        self.check_reciprocity()?;
        self.check_domain_halo()
    }

    fn check_owned_tiling(&self, slot: usize) -> Result<(), ColoringError> {
        let color = self.colors[slot];
        let owned = &self.partition[slot].owned;
        let exclusive = &self.exclusive[slot].bounds;
        if !owned.contains_box(exclusive) {
            return Err(invalid_coloring(format!(
                "color {color}: exclusive box leaves the owned block"
            )));
        }
        let shared = &self.shared[slot];
        let mut volume = exclusive.volume();
        for (i, piece) in shared.iter().enumerate() {
            if !owned.contains_box(&piece.bounds) {
                return Err(invalid_coloring(format!(
                    "color {color}: shared piece {i} leaves the owned block"
                )));
            }
            if piece.bounds.intersects(exclusive) {
                return Err(invalid_coloring(format!(
                    "color {color}: shared piece {i} overlaps the exclusive box"
                )));
            }
            if let Some(j) = shared[i + 1..]
                .iter()
                .position(|other| other.bounds.intersects(&piece.bounds))
            {
                return Err(invalid_coloring(format!(
                    "color {color}: shared pieces {i} and {} overlap",
                    i + 1 + j
                )));
            }
            volume += piece.bounds.volume();
        }
        if volume != owned.volume() {
            return Err(invalid_coloring(format!(
                "color {color}: exclusive and shared cover {volume} of {} owned cells",
                owned.volume()
            )));
        }
        Ok(())
    }

    fn check_ghosts(&self, slot: usize) -> Result<(), ColoringError> {
        let color = self.colors[slot];
        let owned = &self.partition[slot].owned;
        for (i, ghost) in self.ghost[slot].iter().enumerate() {
            if ghost.bounds.intersects(owned) {
                return Err(invalid_coloring(format!(
                    "color {color}: ghost box {i} overlaps its own block"
                )));
            }
            if ghost.colors.is_empty() {
                return Err(invalid_coloring(format!(
                    "color {color}: ghost box {i} has no owner"
                )));
            }
            for &owner in &ghost.colors {
                check_color(owner, self.total_colors())?;
                if owner == color {
                    return Err(invalid_coloring(format!(
                        "color {color}: ghost box {i} is owned by itself"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_reciprocity(&self) -> Result<(), ColoringError> {
        for (slot, &color) in self.colors.iter().enumerate() {
            for ghost in &self.ghost[slot] {
                for &owner in &ghost.colors {
                    let Some(shared) = self.shared_of(owner) else {
                        continue;
                    };
                    let mirrored = shared
                        .iter()
                        .any(|s| s.bounds == ghost.bounds && s.colors.contains(&color));
                    if !mirrored {
                        return Err(invalid_coloring(format!(
                            "color {color}: ghost {:?} has no matching shared piece on {owner}",
                            ghost.bounds
                        )));
                    }
                }
            }
            for piece in &self.shared[slot] {
                for &reader in &piece.colors {
                    let Some(ghosts) = self.ghost_of(reader) else {
                        continue;
                    };
                    let mirrored = ghosts
                        .iter()
                        .any(|g| g.bounds == piece.bounds && g.colors.contains(&color));
                    if !mirrored {
                        return Err(invalid_coloring(format!(
                            "color {color}: shared piece {:?} is not mirrored on {reader}",
                            piece.bounds
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_domain_halo(&self) -> Result<(), ColoringError> {
        let stored: Vec<&GridBox> = (0..self.colors.len())
            .flat_map(|slot| {
                std::iter::once(&self.exclusive[slot].bounds)
                    .chain(self.shared[slot].iter().map(|s| &s.bounds))
                    .chain(self.ghost[slot].iter().map(|g| &g.bounds))
            })
            .collect();
        let domain = self.spec.domain();
        for (slot, boxes) in self.domain_halo.iter().enumerate() {
            for halo in boxes {
                if halo.bounds.intersects(&domain) || stored.iter().any(|b| b.intersects(&halo.bounds)) {
                    return Err(invalid_coloring(format!(
                        "color {}: domain-halo box {:?} overlaps stored cells",
                        self.colors[slot], halo.bounds
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_color(color: Color, total: usize) -> Result<(), ColoringError> {
    if color.index() >= total {
        return Err(invalid_coloring(format!(
            "color {color} is outside [0, {total})"
        )));
    }
    Ok(())
}
