//! Runtime configuration, validation, and error types.
//!
//! [`RuntimeConfig`] is the single input a runtime is built from. There is
//! no process-wide context: two runtimes with different configs can live
//! side by side.

use std::collections::HashSet;
use std::time::Duration;

use halo_coloring::GridSpec;
use halo_core::{Color, ColoringError, FieldId, SyncError, TaskError};
use halo_sync::SyncConfig;
use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`RuntimeConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The grid specification or its coloring is invalid.
    #[error(transparent)]
    Coloring(#[from] ColoringError),
    /// No fields registered.
    #[error("no fields registered")]
    NoFields,
    /// A field id appears more than once.
    #[error("field {field} registered twice")]
    DuplicateField {
        /// The repeated field.
        field: FieldId,
    },
    /// The watchdog timeout is zero, which would fail every blocking wait.
    #[error("wait timeout must be positive, got {value:?}")]
    InvalidTimeout {
        /// The configured value.
        value: Duration,
    },
    /// Thread names would be empty.
    #[error("thread name prefix must not be empty")]
    EmptyThreadName,
    /// The runtime cannot host this many colors.
    #[error("runtime '{runtime}' supports {supported} color(s), spec has {requested}")]
    ColorCount {
        /// Runtime name.
        runtime: &'static str,
        /// Colors the runtime can host.
        supported: usize,
        /// Colors in the spec.
        requested: usize,
    },
}

// ── RuntimeError ───────────────────────────────────────────────────

/// Errors from building or running a runtime.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Configuration rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A color's synchronization state could not be built.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// A color's program returned an error.
    #[error("color {color}: {source}")]
    Task {
        /// The failing color.
        color: Color,
        /// What failed.
        source: TaskError,
    },
    /// A color's thread could not be spawned.
    #[error("failed to spawn thread for color {color}: {reason}")]
    ThreadSpawn {
        /// The color whose thread failed to start.
        color: Color,
        /// OS error text.
        reason: String,
    },
    /// A color's thread panicked.
    #[error("thread for color {color} panicked")]
    ThreadPanicked {
        /// The color whose thread panicked.
        color: Color,
    },
}

// ── RuntimeConfig ──────────────────────────────────────────────────

/// Everything a runtime needs to color the grid and synchronize fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Grid to color.
    pub spec: GridSpec,
    /// Fields with ghost synchronization.
    pub fields: Vec<FieldId>,
    /// Barrier settings.
    pub sync: SyncConfig,
    /// Prefix of per-color thread names; the color id is appended.
    pub thread_name_prefix: String,
}

impl RuntimeConfig {
    /// Config with default sync settings and thread naming.
    pub fn new(spec: GridSpec, fields: impl Into<Vec<FieldId>>) -> Self {
        Self {
            spec,
            fields: fields.into(),
            sync: SyncConfig::default(),
            thread_name_prefix: "halo-color-".into(),
        }
    }

    /// Replace the sync settings.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Check structural invariants. Called by every runtime constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spec.validate()?;
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        for &field in &self.fields {
            if !seen.insert(field) {
                return Err(ConfigError::DuplicateField { field });
            }
        }
        if let Some(value) = self.sync.wait_timeout {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout { value });
            }
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        Ok(())
    }

    /// Thread name for `color`.
    pub fn thread_name(&self, color: Color) -> String {
        format!("{}{color}", self.thread_name_prefix)
    }
}
