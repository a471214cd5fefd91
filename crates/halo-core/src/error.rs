//! Error types for the Halo framework.
//!
//! Organized by subsystem: coloring (configuration and catalog
//! consistency), synchronization (barrier protocol), and task execution.
//! All of them are fatal to the run; none is retried internally.

use std::time::Duration;

use thiserror::Error;

use crate::access::Privileges;
use crate::id::{Color, FieldId};

/// Errors from the box colorer and partition catalog.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ColoringError {
    /// The grid specification is malformed; no catalog is produced.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which constraint was violated.
        reason: String,
    },
    /// The catalog failed its consistency self-check, or a consumer
    /// asked for a color the catalog does not describe.
    #[error("invalid coloring: {reason}")]
    InvalidColoring {
        /// Description of the inconsistency.
        reason: String,
    },
}

/// Convenience constructor used by grid-spec validation.
pub fn invalid_configuration(reason: impl Into<String>) -> ColoringError {
    ColoringError::InvalidConfiguration {
        reason: reason.into(),
    }
}

/// Convenience constructor used by catalog validation.
pub fn invalid_coloring(reason: impl Into<String>) -> ColoringError {
    ColoringError::InvalidColoring {
        reason: reason.into(),
    }
}

/// Errors from the ghost synchronization protocol.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A neighbor color required by the protocol is missing from the
    /// coloring catalog or the barrier registry.
    #[error("invalid coloring for color {color}: {reason}")]
    InvalidColoring {
        /// The color whose state could not be built.
        color: Color,
        /// What was missing.
        reason: String,
    },
    /// A task referenced a field the coordinator was not built for.
    #[error("field {field} is not registered with the coordinator")]
    UnknownField {
        /// The unregistered field.
        field: FieldId,
    },
    /// The declared access-mode combination has no protocol meaning.
    #[error("unsupported access on field {field}: {privileges:?}")]
    UnsupportedAccess {
        /// The field being accessed.
        field: FieldId,
        /// The rejected declaration.
        privileges: Privileges,
    },
    /// A handle referenced a barrier the registry does not hold.
    #[error("barrier {barrier} is not in the registry")]
    UnknownBarrier {
        /// Registry index carried by the handle.
        barrier: u32,
    },
    /// A barrier wait exceeded the configured watchdog timeout.
    #[error("barrier {barrier} phase {phase}: no progress after {waited:?}")]
    SynchronizationDeadlock {
        /// Registry index of the barrier.
        barrier: u32,
        /// Phase being waited on.
        phase: u64,
        /// How long the wait lasted.
        waited: Duration,
    },
}

/// Errors from executing a task through a runtime.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Prolog, barrier wait or epilog failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// The user computation reported a failure.
    #[error("task '{task}' failed: {reason}")]
    Failed {
        /// Name of the failing task.
        task: String,
        /// Human-readable reason.
        reason: String,
    },
}
