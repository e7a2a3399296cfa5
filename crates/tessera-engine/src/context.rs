//! Views of the world handed to scenario hooks and behaviours.
//!
//! Each context borrows exactly the parts of the world its phase may
//! touch: [`WorldSetup`] during initialization, [`EnvironmentContext`]
//! during the environment update, [`ActionContext`] while one agent acts.

use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use tessera_agents::{Agent, AgentRegistry, AttrKind, TypeFilter};
use tessera_core::{AgentError, AgentId, Point2D, RasterId, Rect, Size2D, StepId, TaskId};
use tessera_raster::{RasterKey, RasterStore};

use crate::error::WorldError;
use crate::placement;
use crate::random::RandomSource;
use crate::scenario::AgentBehavior;

/// Behaviours by agent type tag.
pub(crate) type BehaviorTable = IndexMap<String, Box<dyn AgentBehavior>>;

/// Declared serialized attributes by agent type tag.
pub(crate) type AttributeSchema = IndexMap<String, Vec<(String, AttrKind)>>;

/// Geometry and step facts shared by every context.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub task: TaskId,
    pub num_tasks: u32,
    pub domain: Rect,
    pub owned: Rect,
    pub boundaries: Rect,
    pub allow_multiple: bool,
    pub step: StepId,
    pub growth_step: i32,
}

// ── WorldSetup ─────────────────────────────────────────────────────

/// Initialization view passed to
/// [`Scenario::create_rasters`](crate::Scenario::create_rasters) and
/// [`Scenario::create_agents`](crate::Scenario::create_agents).
///
/// Every task runs the hooks independently; a scenario creates agents only
/// inside [`owned_region`](Self::owned_region) and should make ids unique
/// across tasks (for example by embedding [`task_id`](Self::task_id)).
pub struct WorldSetup<'a> {
    pub(crate) frame: Frame,
    pub(crate) rasters: &'a mut RasterStore,
    pub(crate) agents: &'a mut AgentRegistry,
    pub(crate) behaviors: &'a mut BehaviorTable,
    pub(crate) schema: &'a mut AttributeSchema,
    pub(crate) rng: &'a mut dyn RandomSource,
}

impl WorldSetup<'_> {
    /// This task.
    pub fn task_id(&self) -> TaskId {
        self.frame.task
    }

    /// Tasks in the run.
    pub fn num_tasks(&self) -> u32 {
        self.frame.num_tasks
    }

    /// Global domain size.
    pub fn size(&self) -> Size2D {
        self.frame.domain.size
    }

    /// This task's exclusive region.
    pub fn owned_region(&self) -> Rect {
        self.frame.owned
    }

    /// Owned region plus overlap band.
    pub fn boundaries(&self) -> Rect {
        self.frame.boundaries
    }

    /// Register a static raster.
    pub fn register_static_raster(
        &mut self,
        name: &str,
        serialize: bool,
        index: Option<RasterId>,
    ) -> Result<RasterId, WorldError> {
        Ok(self.rasters.register_static(name, serialize, index)?)
    }

    /// Register a dynamic raster.
    pub fn register_dynamic_raster(
        &mut self,
        name: &str,
        serialize: bool,
        index: Option<RasterId>,
    ) -> Result<RasterId, WorldError> {
        Ok(self.rasters.register_dynamic(name, serialize, index)?)
    }

    /// The raster store, for initial fills and bounds.
    pub fn rasters(&mut self) -> &mut RasterStore {
        &mut *self.rasters
    }

    /// Agents created so far.
    pub fn agents(&self) -> &AgentRegistry {
        &*self.agents
    }

    /// Attach a behaviour to every agent of type `kind`, replacing any
    /// previous one.
    pub fn register_behavior(&mut self, kind: impl Into<String>, behavior: Box<dyn AgentBehavior>) {
        self.behaviors.insert(kind.into(), behavior);
    }

    /// Declare an attribute the serializer records for agents of `kind`.
    pub fn declare_attribute(&mut self, kind: &str, key: &str, attr: AttrKind) {
        let attrs = self.schema.entry(kind.to_string()).or_default();
        match attrs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = attr,
            None => attrs.push((key.to_string(), attr)),
        }
    }

    /// Add an owned agent. Its position must lie in the owned region and
    /// pass [`check_position`](Self::check_position).
    pub fn add_agent(&mut self, agent: Agent) -> Result<(), WorldError> {
        let pos = agent.position();
        if !self.frame.owned.contains(&pos) {
            return Err(AgentError::OutOfBounds {
                id: agent.id().clone(),
                position: pos,
                bounds: self.frame.owned,
            }
            .into());
        }
        if !self.check_position(&pos) {
            return Err(AgentError::CellOccupied {
                id: agent.id().clone(),
                position: pos,
            }
            .into());
        }
        Ok(self.agents.add(agent, false)?)
    }

    /// See [`World::check_position`](crate::World::check_position).
    pub fn check_position(&self, p: &Point2D) -> bool {
        placement::check_position(&self.frame.domain, &*self.agents, self.frame.allow_multiple, p)
    }

    /// Free cell of the owned region, uniformly chosen.
    pub fn random_position(&mut self) -> Result<Point2D, WorldError> {
        placement::random_position(
            &self.frame.owned,
            &self.frame.domain,
            &*self.agents,
            self.frame.allow_multiple,
            &mut *self.rng,
        )
    }

    /// This task's random stream.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.rng
    }
}

// ── EnvironmentContext ─────────────────────────────────────────────

/// View passed to [`Scenario::step_environment`](crate::Scenario::step_environment).
pub struct EnvironmentContext<'a> {
    pub(crate) frame: Frame,
    pub(crate) rasters: &'a mut RasterStore,
    pub(crate) agents: &'a AgentRegistry,
    pub(crate) rng: &'a mut dyn RandomSource,
}

impl EnvironmentContext<'_> {
    /// Step being executed.
    pub fn step(&self) -> StepId {
        self.frame.step
    }

    /// Configured default growth increment.
    pub fn growth_step(&self) -> i32 {
        self.frame.growth_step
    }

    /// This task's exclusive region.
    pub fn owned_region(&self) -> Rect {
        self.frame.owned
    }

    /// Dynamic rasters in index order.
    pub fn dynamic_rasters(&self) -> Vec<RasterId> {
        self.rasters.dynamic_ids()
    }

    /// Move every cell of `raster` by `step`, clamped to its bounds.
    pub fn grow<'k>(&mut self, raster: impl Into<RasterKey<'k>>, step: i32) -> Result<(), WorldError> {
        Ok(self.rasters.grow_by(raster, step)?)
    }

    /// The raster store.
    pub fn rasters(&mut self) -> &mut RasterStore {
        &mut *self.rasters
    }

    /// Agents, read-only.
    pub fn agents(&self) -> &AgentRegistry {
        self.agents
    }

    /// This task's random stream.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.rng
    }
}

// ── ActionContext ──────────────────────────────────────────────────

/// View passed to [`AgentBehavior::act`].
///
/// Moves and births are limited to this task's boundaries (owned region
/// plus overlap band); agents that end the step outside the owned region
/// are handed to the owning neighbour during synchronization.
pub struct ActionContext<'a> {
    pub(crate) frame: Frame,
    pub(crate) agents: &'a mut AgentRegistry,
    pub(crate) rasters: &'a mut RasterStore,
    pub(crate) rng: &'a mut dyn RandomSource,
    pub(crate) finalize: &'a AtomicBool,
}

impl ActionContext<'_> {
    /// Step being executed.
    pub fn step(&self) -> StepId {
        self.frame.step
    }

    /// This task.
    pub fn task_id(&self) -> TaskId {
        self.frame.task
    }

    /// This task's exclusive region.
    pub fn owned_region(&self) -> Rect {
        self.frame.owned
    }

    /// Owned region plus overlap band.
    pub fn boundaries(&self) -> Rect {
        self.frame.boundaries
    }

    /// Any local record (owned or ghost).
    pub fn agent(&self, id: &AgentId) -> Result<&Agent, WorldError> {
        Ok(self.agents.find(id)?)
    }

    /// Owned record, for attribute writes.
    pub fn agent_mut(&mut self, id: &AgentId) -> Result<&mut Agent, WorldError> {
        Ok(self.agents.find_mut(id)?)
    }

    /// Move an owned agent.
    ///
    /// The target must lie inside the boundaries and, unless
    /// multi-occupancy is allowed, be free.
    pub fn move_agent(&mut self, id: &AgentId, to: Point2D) -> Result<(), WorldError> {
        if !self.frame.boundaries.contains(&to) {
            return Err(AgentError::OutOfBounds {
                id: id.clone(),
                position: to,
                bounds: self.frame.boundaries,
            }
            .into());
        }
        if self.agents.find(id)?.position() == to {
            return Ok(());
        }
        if !self.check_position(&to) {
            return Err(AgentError::CellOccupied {
                id: id.clone(),
                position: to,
            }
            .into());
        }
        Ok(self.agents.move_to(id, to)?)
    }

    /// Clear an owned agent's existence flag. The record is purged at the
    /// end of the agent phase.
    pub fn kill(&mut self, id: &AgentId) -> Result<(), WorldError> {
        self.agents.find_mut(id)?.kill();
        Ok(())
    }

    /// Add a newborn owned agent. It does not act until the next step.
    pub fn spawn(&mut self, agent: Agent) -> Result<(), WorldError> {
        let pos = agent.position();
        if !self.frame.boundaries.contains(&pos) {
            return Err(AgentError::OutOfBounds {
                id: agent.id().clone(),
                position: pos,
                bounds: self.frame.boundaries,
            }
            .into());
        }
        if !self.check_position(&pos) {
            return Err(AgentError::CellOccupied {
                id: agent.id().clone(),
                position: pos,
            }
            .into());
        }
        Ok(self.agents.add(agent, true)?)
    }

    /// Live agents within `radius` of `center`, excluding `center`.
    pub fn neighbours(
        &self,
        center: &AgentId,
        radius: f64,
        filter: impl Into<TypeFilter>,
    ) -> Result<Vec<&Agent>, WorldError> {
        Ok(self.agents.neighbours(center, radius, &filter.into())?)
    }

    /// Number of live agents within `radius` of `center`.
    pub fn count_neighbours(
        &self,
        center: &AgentId,
        radius: f64,
        filter: impl Into<TypeFilter>,
    ) -> Result<usize, WorldError> {
        Ok(self.agents.count_neighbours(center, radius, &filter.into())?)
    }

    /// Live agents standing on `p`.
    pub fn agents_at(&self, p: &Point2D, filter: impl Into<TypeFilter>) -> Vec<&Agent> {
        self.agents.agents_at(p, &filter.into()).collect()
    }

    /// Raster value at `p`.
    pub fn value<'k>(&self, raster: impl Into<RasterKey<'k>>, p: &Point2D) -> Result<i32, WorldError> {
        Ok(self.rasters.get_value(raster, p)?)
    }

    /// Write a raster value at `p`.
    pub fn set_value<'k>(
        &mut self,
        raster: impl Into<RasterKey<'k>>,
        p: &Point2D,
        value: i32,
    ) -> Result<(), WorldError> {
        Ok(self.rasters.set_value(raster, p, value)?)
    }

    /// Upper bound of a raster cell.
    pub fn max_value_at<'k>(
        &self,
        raster: impl Into<RasterKey<'k>>,
        p: &Point2D,
    ) -> Result<i32, WorldError> {
        Ok(self.rasters.get_max_value_at(raster, p)?)
    }

    /// See [`World::check_position`](crate::World::check_position).
    pub fn check_position(&self, p: &Point2D) -> bool {
        placement::check_position(&self.frame.domain, &*self.agents, self.frame.allow_multiple, p)
    }

    /// Free cell of the owned region, uniformly chosen.
    pub fn random_position(&mut self) -> Result<Point2D, WorldError> {
        placement::random_position(
            &self.frame.owned,
            &self.frame.domain,
            &*self.agents,
            self.frame.allow_multiple,
            &mut *self.rng,
        )
    }

    /// This task's random stream.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        &mut *self.rng
    }

    /// Ask every task to stop after the current step.
    pub fn set_finalize(&self, finalize: bool) {
        self.finalize.store(finalize, Ordering::SeqCst);
    }
}
