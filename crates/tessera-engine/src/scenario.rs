//! Scenario hooks and agent behaviours.
//!
//! A [`Scenario`] is the strategy object that populates a world: it
//! registers rasters, creates agents, attaches an [`AgentBehavior`] per
//! agent type, and optionally overrides the environment update.

use tessera_core::{AgentId, RasterId};

use crate::context::{ActionContext, EnvironmentContext, WorldSetup};
use crate::error::WorldError;

/// Domain-specific setup and environment dynamics.
///
/// `create_rasters` and `create_agents` are each called exactly once, in
/// that order, by [`World::initialize`](crate::World::initialize). Rasters
/// are sealed between the two calls.
pub trait Scenario: Send {
    /// Register and fill rasters.
    fn create_rasters(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError>;

    /// Create the initial agents and register behaviours.
    fn create_agents(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError>;

    /// Environment update at the start of each step.
    ///
    /// The default calls [`step_raster`](Self::step_raster) for every
    /// dynamic raster in index order.
    fn step_environment(&mut self, env: &mut EnvironmentContext<'_>) -> Result<(), WorldError> {
        for raster in env.dynamic_rasters() {
            self.step_raster(raster, env)?;
        }
        Ok(())
    }

    /// Update of one dynamic raster. The default grows every cell by the
    /// configured growth step, clamped at its bound.
    fn step_raster(&mut self, raster: RasterId, env: &mut EnvironmentContext<'_>) -> Result<(), WorldError> {
        let step = env.growth_step();
        env.grow(raster, step)
    }
}

/// Per-step action of one agent type.
///
/// The world calls [`act`](Self::act) once per step for every live owned
/// agent of the registered type, in registry insertion order.
pub trait AgentBehavior: Send {
    /// Let `agent` act.
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError>;
}

/// Closures work as behaviours.
impl<F> AgentBehavior for F
where
    F: Fn(&AgentId, &mut ActionContext<'_>) -> Result<(), WorldError> + Send,
{
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        self(agent, ctx)
    }
}
