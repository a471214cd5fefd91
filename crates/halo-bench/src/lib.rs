//! Benchmark profiles and utilities for the Halo partitioning framework.
//!
//! Provides pre-built grid specs and runtime configs for benchmarking and
//! examples:
//!
//! - [`reference_spec`]: 64×64×64 grid (262K cells), 4×4×2 colors, halo 2
//! - [`stress_spec`]: 256×256×128 grid (~8.4M cells), 8×8×4 colors, halo 2
//! - [`exchange_config`]: a runtime config over a 2-D grid for exchange loops

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use halo_coloring::{GridSpec, ThruDim};
use halo_core::FieldId;
use halo_runtime::RuntimeConfig;
use halo_sync::SyncConfig;

/// Field read through ghosts by exchange loops.
pub const INPUT: FieldId = FieldId(0);

/// Field written on owned cells by exchange loops.
pub const OUTPUT: FieldId = FieldId(1);

/// Build the reference benchmark spec: 64×64×64 grid, 32 colors.
///
/// Full 26-neighbor adjacency, halo 2, one layer of domain padding.
pub fn reference_spec() -> GridSpec {
    GridSpec::new(vec![64, 64, 64], vec![4, 4, 2], 2, 1, ThruDim::Unrestricted)
}

/// Build the stress benchmark spec: 256×256×128 grid, 256 colors.
///
/// Same adjacency and halo as [`reference_spec`].
pub fn stress_spec() -> GridSpec {
    GridSpec::new(vec![256, 256, 128], vec![8, 8, 4], 2, 1, ThruDim::Unrestricted)
}

/// Build a runtime config for an `n`×`n` grid split into `k`×`k` colors
/// with face-only adjacency and halo 1, carrying [`INPUT`] and [`OUTPUT`].
///
/// Waits time out after ten seconds so a broken loop fails instead of
/// hanging.
pub fn exchange_config(n: i64, k: i64) -> RuntimeConfig {
    let spec = GridSpec::new(vec![n, n], vec![k, k], 1, 0, ThruDim::Restricted);
    RuntimeConfig::new(spec, vec![INPUT, OUTPUT])
        .with_sync(SyncConfig::with_wait_timeout(Duration::from_secs(10)))
}
