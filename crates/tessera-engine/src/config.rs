//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the builder input for a [`World`](crate::World)
//! or a [`TaskGroup`](crate::TaskGroup). [`validate()`](SimulationConfig::validate)
//! checks structural invariants at startup, including that the partition
//! layout the config implies can actually be built.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tessera_core::Size2D;
use tessera_space::{PartitionLayout, SpaceError};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimulationConfig::validate()`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The domain cannot be partitioned as requested.
    Layout(SpaceError),
    /// `num_steps` is zero.
    NoSteps,
    /// `serialize_every` is zero.
    SerializeResolutionZero,
    /// `growth_step` is zero or negative.
    InvalidGrowthStep {
        /// The configured value.
        value: i32,
    },
    /// `exchange_timeout` is zero.
    ExchangeTimeoutZero,
    /// The transport does not connect the configured number of tasks, or
    /// the task id is outside it.
    TaskMismatch {
        /// Task the world was built for.
        task: u32,
        /// Tasks the config declares.
        num_tasks: u32,
        /// Tasks the transport connects.
        transport: u32,
    },
    /// A task thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "layout: {e}"),
            Self::NoSteps => write!(f, "num_steps must be at least 1"),
            Self::SerializeResolutionZero => write!(f, "serialize_every must be at least 1"),
            Self::InvalidGrowthStep { value } => {
                write!(f, "growth_step must be positive, got {value}")
            }
            Self::ExchangeTimeoutZero => write!(f, "exchange_timeout must be non-zero"),
            Self::TaskMismatch {
                task,
                num_tasks,
                transport,
            } => write!(
                f,
                "task {task} of {num_tasks} does not fit a transport of {transport} tasks"
            ),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpaceError> for ConfigError {
    fn from(e: SpaceError) -> Self {
        Self::Layout(e)
    }
}

// ── SimulationConfig ───────────────────────────────────────────────

/// Complete configuration for a simulation run.
///
/// Immutable once a world is built from it; the world hands out `&`
/// access through [`World::simulation`](crate::World::simulation).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Global domain size in cells.
    pub size: Size2D,
    /// Number of steps `run()` executes. Default: 100.
    pub num_steps: u64,
    /// Serializer resolution: serialize on steps where
    /// `step % serialize_every == 0`, and after the last step. Default: 1.
    pub serialize_every: u64,
    /// Whether several live agents may share a cell. Default: false.
    pub allow_multiple_agents_per_cell: bool,
    /// Width of the overlap band replicated between adjacent tasks. Default: 1.
    pub overlap: u32,
    /// Number of cooperating tasks. Default: 1.
    pub num_tasks: u32,
    /// RNG seed. Each task derives its own stream from it.
    pub seed: u64,
    /// Increment applied by the default environment step. Default: 1.
    pub growth_step: i32,
    /// How long a task waits for a neighbour's exchange before failing.
    /// Default: 5 s.
    pub exchange_timeout: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            size: Size2D::new(64, 64),
            num_steps: 100,
            serialize_every: 1,
            allow_multiple_agents_per_cell: false,
            overlap: 1,
            num_tasks: 1,
            seed: 0,
            growth_step: 1,
            exchange_timeout: Duration::from_secs(5),
        }
    }
}

impl SimulationConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Step count and serializer resolution.
        if self.num_steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if self.serialize_every == 0 {
            return Err(ConfigError::SerializeResolutionZero);
        }
        // 2. Default environment must make progress.
        if self.growth_step <= 0 {
            return Err(ConfigError::InvalidGrowthStep {
                value: self.growth_step,
            });
        }
        // 3. A zero timeout would fail every exchange.
        if self.exchange_timeout.is_zero() {
            return Err(ConfigError::ExchangeTimeoutZero);
        }
        // 4. Domain, task count and overlap must yield a layout.
        self.layout()?;
        Ok(())
    }

    /// The partition layout this config describes.
    pub fn layout(&self) -> Result<PartitionLayout, ConfigError> {
        Ok(PartitionLayout::new(self.size, self.num_tasks, self.overlap)?)
    }

    /// Whether step `step` is a serialization step. The last step always is.
    pub fn is_serialize_step(&self, step: u64) -> bool {
        step % self.serialize_every == 0 || step + 1 == self.num_steps
    }
}
