//! Single-color runtime on the caller's thread.

use std::sync::Arc;

use halo_coloring::ColoringResult;
use halo_sync::{BarrierRegistry, GhostSyncCoordinator, GhostTransfer};
use tracing::debug;

use crate::config::{ConfigError, RuntimeConfig, RuntimeError};
use crate::runtime::{ColorContext, ColorProgram, ColorSet, Runtime};

/// Runs a one-color decomposition directly on the calling thread.
///
/// There are no neighbors, so ghost reads complete without blocking;
/// the full prolog/epilog path still runs.
pub struct SerialRuntime {
    config: RuntimeConfig,
    catalog: ColoringResult,
    registry: Arc<BarrierRegistry>,
    coordinator: GhostSyncCoordinator,
    transfer: Arc<dyn GhostTransfer + Send + Sync>,
}

impl SerialRuntime {
    /// Build from a config whose spec has exactly one color.
    pub fn new(
        config: RuntimeConfig,
        transfer: Arc<dyn GhostTransfer + Send + Sync>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let requested = config.spec.num_colors();
        if requested != 1 {
            return Err(ConfigError::ColorCount {
                runtime: "serial",
                supported: 1,
                requested,
            }
            .into());
        }
        let ColorSet {
            catalog,
            registry,
            mut coordinators,
        } = ColorSet::build(&config)?;
        let coordinator = coordinators.pop().ok_or(ConfigError::ColorCount {
            runtime: "serial",
            supported: 1,
            requested: 0,
        })?;
        Ok(Self {
            config,
            catalog,
            registry,
            coordinator,
            transfer,
        })
    }

    /// The config this runtime was built from.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The single color's coordinator.
    pub fn coordinator(&self) -> &GhostSyncCoordinator {
        &self.coordinator
    }
}

impl Runtime for SerialRuntime {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn num_colors(&self) -> usize {
        1
    }

    fn catalog(&self) -> &ColoringResult {
        &self.catalog
    }

    fn barriers(&self) -> &Arc<BarrierRegistry> {
        &self.registry
    }

    fn spmd(&mut self, program: &ColorProgram<'_>) -> Result<(), RuntimeError> {
        let color = self.coordinator.color();
        debug!(runtime = self.name(), %color, "spmd start");
        let mut ctx = ColorContext::new(&mut self.coordinator, &self.catalog, &*self.transfer);
        program(&mut ctx).map_err(|source| RuntimeError::Task { color, source })?;
        debug!(runtime = "serial", launches = ctx.launches(), "spmd done");
        Ok(())
    }
}
