//! Communication-free coloring of structured grids.
//!
//! A [`GridSpec`] describes a D-dimensional grid split into a lattice of
//! blocks ("colors"). [`BoxColorer`] turns it into a [`ColoringResult`]:
//! for every color, the exclusive box no neighbor reads, the shared
//! pieces neighbors mirror, the ghost pieces it mirrors from neighbors,
//! and the domain-halo padding outside the global boundary.
//!
//! The computation is a pure function of the spec. Every process derives
//! the same catalog independently.
//!
//! # Region Classes
//!
//! | Class | Owner | Read by |
//! |-------|-------|---------|
//! | exclusive | the color | the color |
//! | shared | the color | the color and listed neighbors |
//! | ghost | a neighbor | the color (read-only mirror) |
//! | domain halo | nobody | boundary conditions |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod colorer;
pub mod region;
pub mod spec;
mod validate;

pub use catalog::{
    ColoringInfo, ColoringResult, DomainHaloBox, ExclusiveBox, GhostBox, OverlayBox, PartitionBox,
    PartitionKind, SharedBox,
};
pub use colorer::{color, BoxColorer};
pub use region::{linearize, GridBox};
pub use spec::{GridSpec, ThruDim};

// Compile-time assertion: catalogs are shared read-only across threads.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ColoringResult>();
    assert_send_sync::<GridSpec>();
};
