//! Test utilities and transfer doubles for Halo development.
//!
//! Provides in-memory [`GhostTransfer`] implementations
//! ([`DenseFieldStore`], [`RecordingTransfer`]), standard grid fixtures,
//! and opt-in tracing output for tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use halo_coloring::{linearize, ColoringResult, GridBox};
use halo_core::{Color, FieldId};
use halo_sync::GhostTransfer;

/// Install a `tracing` subscriber honoring `RUST_LOG`, writing through
/// the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Per-color, per-field copies of the whole grid held in memory.
///
/// Each color writes only its owned cells and reads its owned and ghost
/// cells; [`GhostTransfer::transfer`] copies shared cells from the
/// owner's buffer into the reader's. Buffers cover the un-padded grid.
pub struct DenseFieldStore {
    strides: Vec<u64>,
    buffers: HashMap<(Color, FieldId), Mutex<Vec<f64>>>,
}

impl DenseFieldStore {
    /// Zero-initialized buffers for every represented color and field.
    pub fn new(catalog: &ColoringResult, fields: &[FieldId]) -> Self {
        let strides = catalog.spec().strides().to_vec();
        let len = strides.iter().product::<u64>() as usize;
        let mut buffers = HashMap::new();
        for &color in catalog.colors() {
            for &field in fields {
                buffers.insert((color, field), Mutex::new(vec![0.0; len]));
            }
        }
        Self { strides, buffers }
    }

    fn buffer(&self, color: Color, field: FieldId) -> MutexGuard<'_, Vec<f64>> {
        match self.buffers.get(&(color, field)) {
            Some(m) => m.lock().unwrap_or_else(PoisonError::into_inner),
            None => panic!("no buffer for color {color} field {field}"),
        }
    }

    /// Value of `point` in `color`'s copy of `field`.
    pub fn get(&self, color: Color, field: FieldId, point: &[i64]) -> f64 {
        let i = linearize(point, &self.strides).expect("point outside grid");
        self.buffer(color, field)[i]
    }

    /// Set every cell of `region` in `color`'s copy of `field` to
    /// `value(point)`.
    pub fn fill(
        &self,
        color: Color,
        field: FieldId,
        region: &GridBox,
        value: impl Fn(&[i64]) -> f64,
    ) {
        let mut buf = self.buffer(color, field);
        for p in region.points() {
            let i = linearize(&p, &self.strides).expect("point outside grid");
            buf[i] = value(&p);
        }
    }

    /// Apply `f` to every cell of `region`, reading `src` and writing
    /// `dst` in `color`'s copies. Used for stencil updates.
    pub fn update(
        &self,
        color: Color,
        src: FieldId,
        dst: FieldId,
        region: &GridBox,
        f: impl Fn(&[i64], &dyn Fn(&[i64]) -> f64) -> f64,
    ) {
        let input = self.buffer(color, src).clone();
        let strides = &self.strides;
        let read = |p: &[i64]| input[linearize(p, strides).expect("point outside grid")];
        let mut out = self.buffer(color, dst);
        for p in region.points() {
            let i = linearize(&p, strides).expect("point outside grid");
            out[i] = f(&p, &read);
        }
    }

    /// Points of `region` whose value in `color`'s copy differs from
    /// `expected(point)`.
    pub fn mismatches(
        &self,
        color: Color,
        field: FieldId,
        region: &GridBox,
        expected: impl Fn(&[i64]) -> f64,
    ) -> Vec<Vec<i64>> {
        let buf = self.buffer(color, field);
        region
            .points()
            .filter(|p| {
                let i = linearize(p, &self.strides).expect("point outside grid");
                buf[i] != expected(p)
            })
            .map(|p| p.to_vec())
            .collect()
    }
}

impl GhostTransfer for DenseFieldStore {
    fn transfer(&self, field: FieldId, owner: Color, reader: Color, pieces: &[GridBox]) {
        let values: Vec<(usize, f64)> = {
            let src = self.buffer(owner, field);
            pieces
                .iter()
                .flat_map(GridBox::points)
                .filter_map(|p| linearize(&p, &self.strides))
                .map(|i| (i, src[i]))
                .collect()
        };
        let mut dst = self.buffer(reader, field);
        for (i, v) in values {
            dst[i] = v;
        }
    }
}

/// One recorded call to [`GhostTransfer::transfer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub field: FieldId,
    pub owner: Color,
    pub reader: Color,
    pub cells: u64,
}

/// A transfer that moves nothing and records every call.
#[derive(Default)]
pub struct RecordingTransfer {
    records: Mutex<Vec<TransferRecord>>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in call order.
    pub fn records(&self) -> Vec<TransferRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made on behalf of `reader`.
    pub fn records_for(&self, reader: Color) -> Vec<TransferRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.reader == reader)
            .collect()
    }
}

impl GhostTransfer for RecordingTransfer {
    fn transfer(&self, field: FieldId, owner: Color, reader: Color, pieces: &[GridBox]) {
        let cells = pieces.iter().map(GridBox::volume).sum();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TransferRecord {
                field,
                owner,
                reader,
                cells,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_coloring::color;

    #[test]
    fn dense_store_copies_shared_cells() {
        let catalog = color(&fixtures::line_spec()).unwrap();
        let store = DenseFieldStore::new(&catalog, &[fixtures::U]);
        let owned = catalog.partition_of(Color(1)).unwrap().owned.clone();
        store.fill(Color(1), fixtures::U, &owned, |p| p[0] as f64);

        let ghosts: Vec<GridBox> = catalog
            .ghosts_from(Color(0), Color(1))
            .into_iter()
            .map(|g| g.bounds.clone())
            .collect();
        store.transfer(fixtures::U, Color(1), Color(0), &ghosts);

        assert_eq!(store.get(Color(0), fixtures::U, &[4]), 4.0);
        // Cells outside the ghost piece are untouched.
        assert_eq!(store.get(Color(0), fixtures::U, &[5]), 0.0);
    }

    #[test]
    fn recording_transfer_counts_cells() {
        let t = RecordingTransfer::new();
        t.transfer(
            FieldId(2),
            Color(1),
            Color(0),
            &[GridBox::from_slices(&[0, 0], &[1, 2])],
        );
        assert_eq!(
            t.records_for(Color(0)),
            vec![TransferRecord {
                field: FieldId(2),
                owner: Color(1),
                reader: Color(0),
                cells: 6,
            }]
        );
        assert!(t.records_for(Color(1)).is_empty());
    }
}
