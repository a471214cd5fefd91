//! Core types for the Halo partitioning framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the colorer, the synchronization layer and
//! the runtimes: color and field identifiers, grid points, per-region
//! access modes, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod id;

pub use access::{AccessMode, FieldAccess, Privileges};
pub use error::{ColoringError, SyncError, TaskError};
pub use id::{Color, FieldId, Point};
