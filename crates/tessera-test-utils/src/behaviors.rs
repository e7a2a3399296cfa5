//! Small agent behaviours with predictable effects.

use tessera_core::{AgentId, Point2D};
use tessera_engine::{ActionContext, AgentBehavior, WorldError};

/// Does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stationary;

impl AgentBehavior for Stationary {
    fn act(&self, _agent: &AgentId, _ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        Ok(())
    }
}

/// Moves by a fixed offset every step. Stays put when the target is
/// outside the task's boundaries or occupied.
#[derive(Clone, Copy, Debug)]
pub struct Drift {
    pub dx: i32,
    pub dy: i32,
}

impl AgentBehavior for Drift {
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        let pos = ctx.agent(agent)?.position();
        try_move(agent, ctx, pos.offset(self.dx, self.dy))
    }
}

/// Steps to a uniformly chosen cell of the 3x3 neighbourhood.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomWalker;

impl AgentBehavior for RandomWalker {
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        let pos = ctx.agent(agent)?.position();
        let dx = ctx.rng().uniform(-1, 1);
        let dy = ctx.rng().uniform(-1, 1);
        try_move(agent, ctx, pos.offset(dx, dy))
    }
}

/// Empties the raster cell under the agent into its `energy` attribute,
/// then random-walks.
#[derive(Clone, Debug)]
pub struct Harvest {
    pub raster: String,
}

impl AgentBehavior for Harvest {
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        let pos = ctx.agent(agent)?.position();
        let available = ctx.value(self.raster.as_str(), &pos)?;
        if available > 0 {
            ctx.set_value(self.raster.as_str(), &pos, 0)?;
            let record = ctx.agent_mut(agent)?;
            let energy = record.int_attribute("energy").unwrap_or(0);
            record.set_attribute("energy", energy + i64::from(available));
        }
        RandomWalker.act(agent, ctx)
    }
}

/// Requests finalization on the given step.
#[derive(Clone, Copy, Debug)]
pub struct FinalizeAt {
    pub step: u64,
}

impl AgentBehavior for FinalizeAt {
    fn act(&self, _agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        if ctx.step().0 == self.step {
            ctx.set_finalize(true);
        }
        Ok(())
    }
}

/// Fails with a hook error on the given step.
#[derive(Clone, Copy, Debug)]
pub struct FailAt {
    pub step: u64,
}

impl AgentBehavior for FailAt {
    fn act(&self, agent: &AgentId, ctx: &mut ActionContext<'_>) -> Result<(), WorldError> {
        if ctx.step().0 == self.step {
            return Err(WorldError::hook(format!("{agent} failed on step {}", self.step)));
        }
        Ok(())
    }
}

fn try_move(agent: &AgentId, ctx: &mut ActionContext<'_>, target: Point2D) -> Result<(), WorldError> {
    let pos = ctx.agent(agent)?.position();
    if target != pos && ctx.boundaries().contains(&target) && ctx.check_position(&target) {
        ctx.move_agent(agent, target)?;
    }
    Ok(())
}
