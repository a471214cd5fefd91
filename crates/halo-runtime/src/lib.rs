//! Task execution and SPMD runtimes for Halo.
//!
//! [`ColorContext::execute`] wraps every task launch in the ghost
//! synchronization prolog and epilog. A [`Runtime`] runs one program per
//! color:
//!
//! - [`SerialRuntime`]: a single color on the caller's thread.
//! - [`ThreadedRuntime`]: one named OS thread per color.
//!
//! Both are built from a validated [`RuntimeConfig`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod future;
pub mod runtime;
pub mod serial;
pub mod threaded;

pub use config::{ConfigError, RuntimeConfig, RuntimeError};
pub use future::TaskFuture;
pub use runtime::{ColorContext, ColorProgram, Runtime, TaskSpec};
pub use serial::SerialRuntime;
pub use threaded::ThreadedRuntime;

// Compile-time assertion: runtimes can be moved to a driver thread.
const _: fn() = || {
    fn assert_send<T: Send>() {}
    assert_send::<SerialRuntime>();
    assert_send::<ThreadedRuntime>();
};
