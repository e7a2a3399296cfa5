//! The per-task simulation driver.
//!
//! [`World`] owns one task's raster store, agent registry and scheduler
//! and runs the step loop:
//!
//! ```text
//! environment update -> owned agents act -> purge dead -> synchronize -> serialize
//! ```
//!
//! # Lifecycle
//!
//! `Uninitialized -> Initialized -> Running -> Finalized`.
//! [`initialize()`](World::initialize) calls the scenario's factory hooks
//! once, seals the rasters and performs an initial boundary exchange that
//! includes static rasters. [`run()`](World::run) executes up to
//! `num_steps` steps, stopping early once any task has requested
//! finalization. A world whose run failed stays `Running` and cannot be
//! resumed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use tessera_agents::{Agent, AgentRegistry, TypeFilter};
use tessera_core::{AgentError, AgentId, Point2D, RasterId, Rect, Size2D, StepId, TaskId};
use tessera_raster::{RasterKind, RasterStore};
use tessera_space::PartitionLayout;

use crate::config::{ConfigError, SimulationConfig};
use crate::context::{
    ActionContext, AttributeSchema, BehaviorTable, EnvironmentContext, Frame, WorldSetup,
};
use crate::error::WorldError;
use crate::metrics::StepMetrics;
use crate::placement;
use crate::random::{RandomSource, SeededRandom};
use crate::scenario::Scenario;
use crate::scheduler::{PartitionScheduler, SyncReport};
use crate::serializer::{NullSerializer, Serializer, SerializerHeader};
use crate::transport::{BoundaryTransport, ChannelTransport};

// Compile-time assertion: World is Send, so a task group can move each
// world onto its own thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<World>();
    }
};

/// Lifecycle state of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorldState {
    /// Built, hooks not yet called.
    Uninitialized,
    /// Rasters and agents created, ready to run.
    Initialized,
    /// Inside (or aborted out of) [`World::run`].
    Running,
    /// The run completed.
    Finalized,
}

/// One task's share of a simulation.
pub struct World {
    config: SimulationConfig,
    scheduler: PartitionScheduler,
    scenario: Box<dyn Scenario>,
    serializer: Box<dyn Serializer>,
    rasters: RasterStore,
    agents: AgentRegistry,
    behaviors: BehaviorTable,
    schema: AttributeSchema,
    rng: Box<dyn RandomSource>,
    finalize: Arc<AtomicBool>,
    agreed_finalize: bool,
    state: WorldState,
    step: StepId,
    started: Option<Instant>,
    last_serialized: Option<StepId>,
    last_metrics: StepMetrics,
}

impl World {
    /// Single-task world owning the whole domain.
    pub fn new(config: SimulationConfig, scenario: Box<dyn Scenario>) -> Result<Self, WorldError> {
        let mismatch = ConfigError::TaskMismatch {
            task: 0,
            num_tasks: config.num_tasks,
            transport: 1,
        };
        if config.num_tasks != 1 {
            return Err(mismatch.into());
        }
        let transport = ChannelTransport::mesh(1, config.exchange_timeout)
            .pop()
            .ok_or(mismatch)?;
        Self::for_task(config, Box::new(transport), scenario)
    }

    /// World for the transport's task of a multi-task run.
    pub fn for_task(
        config: SimulationConfig,
        transport: Box<dyn BoundaryTransport>,
        scenario: Box<dyn Scenario>,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let task = transport.task();
        let scheduler = PartitionScheduler::new(config.layout()?, transport)?
            .with_shared_cells(config.allow_multiple_agents_per_cell);
        let rasters = RasterStore::new(scheduler.section().boundaries());
        let rng = Box::new(SeededRandom::for_task(config.seed, task));
        Ok(Self {
            config,
            scheduler,
            scenario,
            serializer: Box::new(NullSerializer),
            rasters,
            agents: AgentRegistry::new(),
            behaviors: BehaviorTable::new(),
            schema: AttributeSchema::new(),
            rng,
            finalize: Arc::new(AtomicBool::new(false)),
            agreed_finalize: false,
            state: WorldState::Uninitialized,
            step: StepId(0),
            started: None,
            last_serialized: None,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Replace the serializer (default: [`NullSerializer`]).
    pub fn with_serializer(mut self, serializer: Box<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Replace the random source (default: [`SeededRandom::for_task`]).
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Share a finalize flag with other worlds or threads.
    pub fn with_finalize_handle(mut self, flag: Arc<AtomicBool>) -> Self {
        self.finalize = flag;
        self
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Create rasters and agents, then run the initial boundary exchange.
    pub fn initialize(&mut self) -> Result<(), WorldError> {
        self.expect_state("initialize", WorldState::Uninitialized)?;
        self.started = Some(Instant::now());
        let frame = self.frame();

        let mut setup = WorldSetup {
            frame,
            rasters: &mut self.rasters,
            agents: &mut self.agents,
            behaviors: &mut self.behaviors,
            schema: &mut self.schema,
            rng: self.rng.as_mut(),
        };
        self.scenario.create_rasters(&mut setup)?;
        setup.rasters.seal();
        self.scenario.create_agents(&mut setup)?;

        let report = self.synchronize(true)?;
        self.agreed_finalize = report.finalize;

        let header = self.header();
        self.serializer.begin(&header)?;
        let owned = self.owned_region();
        for raster in self
            .rasters
            .iter()
            .filter(|r| r.serialize() && r.kind() == RasterKind::Static)
        {
            self.serializer.write_raster(0, &raster.snapshot(&owned))?;
        }

        self.state = WorldState::Initialized;
        info!(
            task = %self.task_id(),
            owned = %owned,
            rasters = self.rasters.len(),
            agents = self.agents.owned_count(),
            ghosts = self.agents.ghost_count(),
            "world initialized"
        );
        Ok(())
    }

    /// Execute steps until `num_steps` or an agreed finalize. Returns the
    /// final step counter (the number of completed steps).
    pub fn run(&mut self) -> Result<StepId, WorldError> {
        self.expect_state("run", WorldState::Initialized)?;
        self.state = WorldState::Running;
        info!(task = %self.task_id(), num_steps = self.config.num_steps, "run started");

        while self.step.0 < self.config.num_steps {
            if self.agreed_finalize {
                break;
            }
            self.step_once()?;
        }

        if let Some(last) = self.step.0.checked_sub(1).map(StepId) {
            if self.last_serialized != Some(last) {
                self.serialize_step(last)?;
            }
        }
        self.serializer.finish(self.step.0)?;
        self.state = WorldState::Finalized;
        info!(task = %self.task_id(), final_step = %self.step, "run finished");
        Ok(self.step)
    }

    fn step_once(&mut self) -> Result<(), WorldError> {
        let step_start = Instant::now();
        let mut metrics = StepMetrics {
            step: self.step.0,
            ..StepMetrics::default()
        };
        self.agents.reset_executed();
        let frame = self.frame();

        // 1. Environment.
        let t = Instant::now();
        let mut env = EnvironmentContext {
            frame,
            rasters: &mut self.rasters,
            agents: &self.agents,
            rng: self.rng.as_mut(),
        };
        self.scenario.step_environment(&mut env)?;
        metrics.environment_us = t.elapsed().as_micros() as u64;

        // 2. Owned agents act in insertion order; births and handoffs
        //    arrive already marked as executed.
        let t = Instant::now();
        for id in self.agents.owned_ids() {
            let behavior = match self.agents.get(id.as_str()) {
                Some(a) if a.is_owned() && a.exists() && !a.executed() => {
                    self.behaviors.get(a.kind())
                }
                _ => continue,
            };
            self.agents.mark_executed(&id)?;
            let Some(behavior) = behavior else {
                continue;
            };
            let mut ctx = ActionContext {
                frame,
                agents: &mut self.agents,
                rasters: &mut self.rasters,
                rng: self.rng.as_mut(),
                finalize: self.finalize.as_ref(),
            };
            behavior.act(&id, &mut ctx)?;
        }
        metrics.purged = self.agents.purge_dead().len() as u32;
        metrics.agents_us = t.elapsed().as_micros() as u64;

        // 3. Boundary synchronization.
        let t = Instant::now();
        let report = self.synchronize(false)?;
        metrics.sync_us = t.elapsed().as_micros() as u64;
        if report.finalize {
            warn!(task = %self.task_id(), step = %self.step, "finalize requested, stopping after this step");
        }
        self.agreed_finalize = report.finalize;
        metrics.handoffs_sent = report.handoffs_sent;
        metrics.handoffs_received = report.handoffs_received;
        metrics.conflicts = report.conflicts;
        metrics.revoked = report.revoked;
        metrics.owned_agents = self.agents.owned_count() as u32;
        metrics.ghost_agents = self.agents.ghost_count() as u32;

        // 4. Serialization.
        let t = Instant::now();
        if self.config.is_serialize_step(self.step.0) {
            self.serialize_step(self.step)?;
        }
        metrics.serialize_us = t.elapsed().as_micros() as u64;

        metrics.total_us = step_start.elapsed().as_micros() as u64;
        debug!(
            task = %self.task_id(),
            step = metrics.step,
            owned = metrics.owned_agents,
            ghosts = metrics.ghost_agents,
            handoffs_sent = metrics.handoffs_sent,
            handoffs_received = metrics.handoffs_received,
            conflicts = metrics.conflicts,
            revoked = metrics.revoked,
            total_us = metrics.total_us,
            "step complete"
        );
        self.last_metrics = metrics;
        self.step = self.step.next();
        Ok(())
    }

    fn synchronize(&mut self, include_static: bool) -> Result<SyncReport, WorldError> {
        let local = self.finalize.load(Ordering::SeqCst);
        self.scheduler
            .synchronize(self.step, &mut self.rasters, &mut self.agents, include_static, local)
            .map_err(|e| {
                error!(task = %self.scheduler.task(), step = %self.step, error = %e, "boundary synchronization failed");
                WorldError::Sync(e)
            })
    }

    fn serialize_step(&mut self, step: StepId) -> Result<(), WorldError> {
        let owned = self.owned_region();
        for raster in self
            .rasters
            .iter()
            .filter(|r| r.serialize() && r.kind() == RasterKind::Dynamic)
        {
            self.serializer.write_raster(step.0, &raster.snapshot(&owned))?;
        }
        let agents = self.agents.snapshot_owned();
        self.serializer.write_agents(step.0, &agents)?;
        self.last_serialized = Some(step);
        Ok(())
    }

    fn header(&self) -> SerializerHeader {
        SerializerHeader {
            task: self.task_id(),
            num_tasks: self.num_tasks(),
            domain: self.size(),
            owned: self.owned_region(),
            num_steps: self.config.num_steps,
            serialize_every: self.config.serialize_every,
            rasters: self
                .rasters
                .iter()
                .filter(|r| r.serialize())
                .map(|r| (r.id(), r.name().to_string(), r.kind()))
                .collect(),
            attributes: self
                .schema
                .iter()
                .map(|(kind, attrs)| (kind.clone(), attrs.clone()))
                .collect(),
        }
    }

    fn frame(&self) -> Frame {
        let section = self.scheduler.section();
        Frame {
            task: section.task(),
            num_tasks: self.num_tasks(),
            domain: self.scheduler.layout().domain_rect(),
            owned: section.owned(),
            boundaries: section.boundaries(),
            allow_multiple: self.config.allow_multiple_agents_per_cell,
            step: self.step,
            growth_step: self.config.growth_step,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: WorldState) -> Result<(), WorldError> {
        if self.state != expected {
            return Err(WorldError::Lifecycle {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The configuration this world was built from.
    pub fn simulation(&self) -> &SimulationConfig {
        &self.config
    }

    /// Lifecycle state.
    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Step being executed, or the number of completed steps between steps.
    pub fn current_step(&self) -> StepId {
        self.step
    }

    /// This task.
    pub fn task_id(&self) -> TaskId {
        self.scheduler.task()
    }

    /// Tasks in the run.
    pub fn num_tasks(&self) -> u32 {
        self.scheduler.layout().num_tasks()
    }

    /// Global domain size.
    pub fn size(&self) -> Size2D {
        self.scheduler.layout().domain()
    }

    /// The run's partition layout.
    pub fn layout(&self) -> &PartitionLayout {
        self.scheduler.layout()
    }

    /// This task's exclusive region.
    pub fn owned_region(&self) -> Rect {
        self.scheduler.section().owned()
    }

    /// Owned region plus overlap band: the cells this task stores.
    pub fn boundaries(&self) -> Rect {
        self.scheduler.section().boundaries()
    }

    /// Time since [`initialize`](Self::initialize) started.
    pub fn wall_time(&self) -> Duration {
        self.started.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Metrics of the most recent step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Cloneable stop flag, settable from any thread.
    pub fn finalize_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finalize)
    }

    /// Ask every task to stop after the current step.
    pub fn set_finalize(&self, finalize: bool) {
        self.finalize.store(finalize, Ordering::SeqCst);
    }

    // ── Rasters ────────────────────────────────────────────────────

    /// The raster store.
    pub fn rasters(&self) -> &RasterStore {
        &self.rasters
    }

    /// Number of registered rasters.
    pub fn raster_count(&self) -> usize {
        self.rasters.len()
    }

    /// Name of the raster at `id`.
    pub fn raster_name(&self, id: RasterId) -> Option<&str> {
        self.rasters.name(id)
    }

    // ── Agents ─────────────────────────────────────────────────────

    /// The agent registry (owned and ghost records).
    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Local record for `id`.
    pub fn agent(&self, id: &AgentId) -> Result<&Agent, WorldError> {
        Ok(self.agents.find(id)?)
    }

    /// Live agents standing on `p`.
    pub fn agents_at(&self, p: &Point2D, filter: impl Into<TypeFilter>) -> Vec<&Agent> {
        self.agents.agents_at(p, &filter.into()).collect()
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

    /// Add an owned agent inside the owned region. Agents added while the
    /// world is running do not act until the next step.
    pub fn add_agent(&mut self, agent: Agent) -> Result<(), WorldError> {
        let pos = agent.position();
        let owned = self.owned_region();
        if !owned.contains(&pos) {
            return Err(AgentError::OutOfBounds {
                id: agent.id().clone(),
                position: pos,
                bounds: owned,
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
        let mark_executed = self.state == WorldState::Running;
        Ok(self.agents.add(agent, mark_executed)?)
    }

    /// Remove an agent record.
    pub fn remove_agent(&mut self, id: &AgentId) -> Result<Agent, WorldError> {
        Ok(self.agents.remove(id)?)
    }

    /// `true` iff `p` lies in the global domain and, unless multiple agents
    /// per cell are allowed, no live agent stands on it.
    pub fn check_position(&self, p: &Point2D) -> bool {
        placement::check_position(
            &self.layout().domain_rect(),
            &self.agents,
            self.config.allow_multiple_agents_per_cell,
            p,
        )
    }

    /// Uniformly chosen free cell of the owned region.
    pub fn random_position(&mut self) -> Result<Point2D, WorldError> {
        let owned = self.owned_region();
        let domain = self.layout().domain_rect();
        placement::random_position(
            &owned,
            &domain,
            &self.agents,
            self.config.allow_multiple_agents_per_cell,
            self.rng.as_mut(),
        )
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("task", &self.task_id())
            .field("state", &self.state)
            .field("step", &self.step)
            .field("owned", &self.owned_region())
            .field("rasters", &self.rasters.len())
            .field("agents", &self.agents.len())
            .finish()
    }
}
