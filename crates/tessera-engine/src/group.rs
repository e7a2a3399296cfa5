//! Running every task of a partitioned simulation on its own thread.
//!
//! [`TaskGroup`] builds one [`World`] per task over a shared channel mesh,
//! moves each onto a named thread and joins them all. Worlds are built
//! before any thread starts so configuration errors surface without
//! leaving half a group running.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use tessera_agents::AgentSnapshot;
use tessera_core::{StepId, TaskId};

use crate::config::{ConfigError, SimulationConfig};
use crate::error::WorldError;
use crate::metrics::StepMetrics;
use crate::scenario::Scenario;
use crate::serializer::Serializer;
use crate::transport::{BoundaryTransport, ChannelTransport};
use crate::world::World;

/// Outcome of one task's run.
#[derive(Clone, Debug)]
pub struct TaskReport {
    /// The task.
    pub task: TaskId,
    /// Steps completed.
    pub final_step: StepId,
    /// Agents the task owned at the end of the run.
    pub agents: Vec<AgentSnapshot>,
    /// Metrics of the last executed step.
    pub metrics: StepMetrics,
    /// Wall time from initialization to the end of the run.
    pub wall_time: Duration,
}

/// A set of cooperating tasks sharing one configuration.
#[derive(Debug)]
pub struct TaskGroup {
    config: SimulationConfig,
    finalize: Arc<AtomicBool>,
}

impl TaskGroup {
    /// Validate `config` and prepare a group of `config.num_tasks` tasks.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            finalize: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The shared configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Stop flag shared by every task of the group. Setting it from any
    /// thread ends the run after the step in progress.
    pub fn finalize_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finalize)
    }

    /// Initialize and run every task; returns the reports in task order.
    ///
    /// When several tasks fail, the error of the task that failed first in
    /// its own right is returned rather than a peer's disconnect or
    /// timeout that it caused.
    pub fn run<S, W>(
        &self,
        scenario_factory: S,
        serializer_factory: W,
    ) -> Result<Vec<TaskReport>, WorldError>
    where
        S: Fn(TaskId) -> Box<dyn Scenario>,
        W: Fn(TaskId) -> Box<dyn Serializer>,
    {
        let mut worlds = Vec::with_capacity(self.config.num_tasks as usize);
        for transport in ChannelTransport::mesh(self.config.num_tasks, self.config.exchange_timeout) {
            let task = transport.task();
            let world = World::for_task(self.config.clone(), Box::new(transport), scenario_factory(task))?
                .with_serializer(serializer_factory(task))
                .with_finalize_handle(Arc::clone(&self.finalize));
            worlds.push(world);
        }

        let mut handles: Vec<(TaskId, JoinHandle<Result<TaskReport, WorldError>>)> =
            Vec::with_capacity(worlds.len());
        let mut spawn_error = None;
        for world in worlds {
            let task = world.task_id();
            let spawned = thread::Builder::new()
                .name(format!("tessera-task-{task}"))
                .spawn(move || run_task(world));
            match spawned {
                Ok(handle) => handles.push((task, handle)),
                Err(e) => {
                    // Remaining worlds drop with the iterator, which
                    // disconnects the already running tasks.
                    spawn_error = Some(ConfigError::ThreadSpawnFailed {
                        reason: format!("tessera-task-{task}: {e}"),
                    });
                    break;
                }
            }
        }
        info!(tasks = handles.len(), "task group started");

        let mut reports = Vec::with_capacity(handles.len());
        let mut failure: Option<WorldError> = None;
        for (task, handle) in handles {
            let outcome = handle
                .join()
                .unwrap_or(Err(WorldError::TaskPanicked { task }));
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(task = %task, error = %e, "task failed");
                    failure = Some(match failure {
                        Some(prev) if !prev.is_cascade() || e.is_cascade() => prev,
                        _ => e,
                    });
                }
            }
        }

        if let Some(e) = spawn_error {
            return Err(e.into());
        }
        if let Some(e) = failure {
            return Err(e);
        }
        info!(tasks = reports.len(), "task group finished");
        Ok(reports)
    }
}

fn run_task(mut world: World) -> Result<TaskReport, WorldError> {
    world.initialize()?;
    let final_step = world.run()?;
    Ok(TaskReport {
        task: world.task_id(),
        final_step,
        agents: world.agents().snapshot_owned(),
        metrics: world.last_metrics().clone(),
        wall_time: world.wall_time(),
    })
}
