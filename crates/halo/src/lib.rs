//! Halo: structured-grid coloring and ghost-cell synchronization.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Halo sub-crates. For most users, adding `halo` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use halo::prelude::*;
//!
//! // Nothing to copy: a single color has no neighbors.
//! struct NoCopy;
//! impl GhostTransfer for NoCopy {
//!     fn transfer(&self, _: FieldId, _: Color, _: Color, _: &[GridBox]) {}
//! }
//!
//! // An 8×8 grid owned by one color, halo 1, padding 1.
//! let spec = GridSpec::new(vec![8, 8], vec![1, 1], 1, 1, ThruDim::Restricted);
//! let catalog = halo::coloring::color(&spec).unwrap();
//! assert_eq!(catalog.domain_halo_of(Color(0)).unwrap().len(), 4);
//!
//! let config = RuntimeConfig::new(spec, vec![FieldId(0)]);
//! let mut rt = SerialRuntime::new(config, Arc::new(NoCopy)).unwrap();
//! rt.spmd(&|ctx| {
//!     let task = TaskSpec::new("sum").reads(FieldId(0));
//!     let sum = ctx.execute(&task, || Ok::<_, String>(2 + 2))?.get()?;
//!     assert_eq!(sum, 4);
//!     Ok(())
//! })
//! .unwrap();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `halo-core` | Colors, field ids, access modes, error types |
//! | [`coloring`] | `halo-coloring` | Grid specs, the box colorer, region catalogs |
//! | [`sync`] | `halo-sync` | Phase barriers and the ghost synchronization protocol |
//! | [`runtime`] | `halo-runtime` | Task launches and SPMD runtimes |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core ids, access modes, and errors (`halo-core`).
pub use halo_core as types;

/// Grid decomposition (`halo-coloring`).
///
/// [`coloring::BoxColorer`] turns a [`coloring::GridSpec`] into a
/// [`coloring::ColoringResult`] listing every color's exclusive, shared,
/// ghost, domain-halo and overlay boxes.
pub use halo_coloring as coloring;

/// Ghost-cell synchronization (`halo-sync`).
///
/// [`sync::GhostSyncCoordinator`] runs the per-color prolog and epilog
/// over the phase barriers in a [`sync::BarrierRegistry`].
pub use halo_sync as sync;

/// Task execution (`halo-runtime`).
///
/// [`runtime::SerialRuntime`] for one color on the caller's thread,
/// [`runtime::ThreadedRuntime`] for one thread per color.
pub use halo_runtime as runtime;

/// Common imports for typical Halo usage.
///
/// ```rust
/// use halo::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use halo_core::{AccessMode, Color, FieldAccess, FieldId, Privileges};

    // Errors
    pub use halo_core::{ColoringError, SyncError, TaskError};

    // Coloring
    pub use halo_coloring::{BoxColorer, ColoringResult, GridBox, GridSpec, PartitionKind, ThruDim};

    // Synchronization
    pub use halo_sync::{GhostTransfer, SyncConfig};

    // Runtime
    pub use halo_runtime::{
        ColorContext, Runtime, RuntimeConfig, RuntimeError, SerialRuntime, TaskSpec,
        ThreadedRuntime,
    };
}
