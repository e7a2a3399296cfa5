//! Simulation engine for Tessera.
//!
//! A simulation splits a 2D domain into one rectangular section per task.
//! Each task runs a [`World`] over its section plus an overlap band of
//! ghost cells and ghost agents copied from its neighbours. After every
//! step the [`PartitionScheduler`] exchanges the band, hands agents that
//! crossed a section boundary over to their new owner and agrees on
//! whether to stop.
//!
//! Single-task runs use [`World::new`]; partitioned runs use
//! [`TaskGroup`], which drives one world per thread.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod metrics;
mod placement;
pub mod random;
pub mod scenario;
pub mod scheduler;
pub mod serializer;
pub mod transport;
pub mod world;

pub use config::{ConfigError, SimulationConfig};
pub use context::{ActionContext, EnvironmentContext, WorldSetup};
pub use error::WorldError;
pub use group::{TaskGroup, TaskReport};
pub use metrics::StepMetrics;
pub use random::{RandomSource, SeededRandom};
pub use scenario::{AgentBehavior, Scenario};
pub use scheduler::{PartitionScheduler, SyncReport};
pub use serializer::{
    MemorySerializer, NullSerializer, SerializedRun, Serializer, SerializerHeader,
};
pub use transport::{BoundaryMessage, BoundaryTransport, ChannelTransport, Envelope, Payload};
pub use world::{World, WorldState};
