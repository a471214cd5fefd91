//! The task execution wrapper and the [`Runtime`] capability trait.
//!
//! A launch goes through five steps, in order:
//!
//! 1. **prolog**: per declared field access, ghost reads are
//!    synchronized and shared writes attach barriers to the launcher;
//! 2. **wait**: block on the launcher's wait barriers;
//! 3. **execute**: run the task body;
//! 4. **arrive**: arrive on the launcher's arrival barriers;
//! 5. **epilog**: invalidate ghosts after shared writes, then hand the
//!    result back as a [`TaskFuture`].

use std::fmt;
use std::sync::Arc;

use halo_coloring::{BoxColorer, ColoringResult};
use halo_core::{AccessMode, Color, FieldAccess, FieldId, Privileges, TaskError};
use halo_sync::{BarrierRegistry, GhostSyncCoordinator, GhostTransfer, TaskLauncher};
use tracing::{debug, trace};

use crate::config::{RuntimeConfig, RuntimeError};
use crate::future::TaskFuture;

// ── TaskSpec ───────────────────────────────────────────────────────

/// A named task and the field accesses it declares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSpec {
    name: String,
    accesses: Vec<FieldAccess>,
}

impl TaskSpec {
    /// A task with no declared accesses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accesses: Vec::new(),
        }
    }

    /// Declare an access to `field`.
    ///
    /// A field declared twice keeps its first position and the merged
    /// privileges of both declarations.
    pub fn access(mut self, field: FieldId, privileges: Privileges) -> Self {
        match self.accesses.iter_mut().find(|a| a.field == field) {
            Some(existing) => existing.privileges = existing.privileges.merge(privileges),
            None => self.accesses.push(FieldAccess::new(field, privileges)),
        }
        self
    }

    /// Declare a read of `field` including ghosts.
    pub fn reads(self, field: FieldId) -> Self {
        self.access(field, Privileges::read_all())
    }

    /// Declare a read-write of `field`'s owned cells.
    pub fn writes(self, field: FieldId) -> Self {
        self.access(field, Privileges::write_owned())
    }

    /// Declare a read-write of `field`'s exclusive cells only.
    pub fn writes_exclusive(self, field: FieldId) -> Self {
        self.access(
            field,
            Privileges::new(AccessMode::ReadWrite, AccessMode::Read, AccessMode::None),
        )
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared accesses, one per field, in first-declaration order.
    pub fn accesses(&self) -> &[FieldAccess] {
        &self.accesses
    }
}

// ── ColorContext ───────────────────────────────────────────────────

/// One color's view of a running program.
///
/// Holds the color's coordinator for the duration of an SPMD run; every
/// launch on this color goes through [`execute`](Self::execute).
pub struct ColorContext<'a> {
    coordinator: &'a mut GhostSyncCoordinator,
    catalog: &'a ColoringResult,
    transfer: &'a dyn GhostTransfer,
    launches: u64,
}

impl fmt::Debug for ColorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorContext")
            .field("color", &self.coordinator.color())
            .field("launches", &self.launches)
            .finish_non_exhaustive()
    }
}

impl<'a> ColorContext<'a> {
    /// Bind a coordinator, its catalog, and the ghost transport.
    pub fn new(
        coordinator: &'a mut GhostSyncCoordinator,
        catalog: &'a ColoringResult,
        transfer: &'a dyn GhostTransfer,
    ) -> Self {
        Self {
            coordinator,
            catalog,
            transfer,
            launches: 0,
        }
    }

    /// The color this context runs as.
    pub fn color(&self) -> Color {
        self.coordinator.color()
    }

    /// The coloring catalog.
    pub fn catalog(&self) -> &ColoringResult {
        self.catalog
    }

    /// The color's synchronization state.
    pub fn coordinator(&self) -> &GhostSyncCoordinator {
        self.coordinator
    }

    /// Launches completed through this context.
    pub fn launches(&self) -> u64 {
        self.launches
    }

    /// Launch `task` with body `body`.
    ///
    /// Runs prolog, barrier waits, the body, barrier arrivals and epilog
    /// in that order. A failing body aborts the launch before its
    /// arrivals, so neighbors waiting on them will block (or trip the
    /// watchdog when one is configured).
    pub fn execute<R, E, F>(&mut self, task: &TaskSpec, body: F) -> Result<TaskFuture<R>, TaskError>
    where
        F: FnOnce() -> Result<R, E>,
        E: fmt::Display,
    {
        let color = self.coordinator.color();
        let mut launcher = TaskLauncher::new(task.name());
        for access in task.accesses() {
            self.coordinator.prolog(access, &mut launcher, self.transfer)?;
        }

        let registry = Arc::clone(self.coordinator.registry());
        let timeout = self.coordinator.config().wait_timeout;
        launcher.wait_all(&registry, timeout)?;

        trace!(%color, task = task.name(), "execute");
        let value = body().map_err(|e| TaskError::Failed {
            task: task.name().to_owned(),
            reason: e.to_string(),
        })?;

        launcher.arrive_all(&registry)?;
        for access in task.accesses() {
            self.coordinator.epilog(access)?;
        }

        let (tx, future) = TaskFuture::pending(task.name());
        tx.send(value).map_err(|_| TaskError::Failed {
            task: task.name().to_owned(),
            reason: "result receiver dropped".into(),
        })?;
        self.launches += 1;
        Ok(future)
    }
}

// ── Runtime ────────────────────────────────────────────────────────

/// A per-color program: the same closure runs once on every color.
pub type ColorProgram<'p> = dyn Fn(&mut ColorContext<'_>) -> Result<(), TaskError> + Sync + 'p;

/// An execution backend for SPMD programs over a colored grid.
pub trait Runtime {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Number of colors the backend runs.
    fn num_colors(&self) -> usize;

    /// The coloring catalog the backend was built from.
    fn catalog(&self) -> &ColoringResult;

    /// The phase-barrier provider shared by all colors.
    fn barriers(&self) -> &Arc<BarrierRegistry>;

    /// Run `program` once per color and wait for all of them.
    ///
    /// Synchronization state persists across calls, so a program may be
    /// split over several `spmd` invocations.
    fn spmd(&mut self, program: &ColorProgram<'_>) -> Result<(), RuntimeError>;
}

/// Catalog, registry and one coordinator per color, built from a
/// validated config.
pub(crate) struct ColorSet {
    pub(crate) catalog: ColoringResult,
    pub(crate) registry: Arc<BarrierRegistry>,
    pub(crate) coordinators: Vec<GhostSyncCoordinator>,
}

impl ColorSet {
    pub(crate) fn build(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let catalog = BoxColorer::color(&config.spec).map_err(crate::ConfigError::from)?;
        catalog.validate().map_err(crate::ConfigError::from)?;

        let registry = Arc::new(BarrierRegistry::from_catalog(&catalog, &config.fields));
        let coordinators = catalog
            .colors()
            .iter()
            .map(|&c| {
                GhostSyncCoordinator::new(
                    c,
                    &catalog,
                    &config.fields,
                    Arc::clone(&registry),
                    config.sync.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            colors = coordinators.len(),
            barriers = registry.len(),
            "color set built"
        );
        Ok(Self {
            catalog,
            registry,
            coordinators,
        })
    }
}
