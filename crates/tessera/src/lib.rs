//! Tessera: a partitioned simulation engine for agents on a 2D raster.
//!
//! This is the facade crate that re-exports the public API of the Tessera
//! sub-crates. For most users, adding `tessera` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! // Sheep graze the grass under them; grass regrows by one per step.
//! struct Meadow;
//!
//! impl Scenario for Meadow {
//!     fn create_rasters(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
//!         setup.register_dynamic_raster("grass", true, None)?;
//!         setup.rasters().set_init_values("grass", 0, 10, 5)?;
//!         Ok(())
//!     }
//!
//!     fn create_agents(&mut self, setup: &mut WorldSetup<'_>) -> Result<(), WorldError> {
//!         for i in 0..4 {
//!             let pos = setup.random_position()?;
//!             setup.add_agent(Agent::new(format!("sheep-{i}"), "sheep", pos))?;
//!         }
//!         setup.register_behavior(
//!             "sheep",
//!             Box::new(|id: &AgentId, ctx: &mut ActionContext<'_>| -> Result<(), WorldError> {
//!                 let pos = ctx.agent(id)?.position();
//!                 ctx.set_value("grass", &pos, 0)
//!             }),
//!         );
//!         Ok(())
//!     }
//! }
//!
//! let config = SimulationConfig {
//!     size: Size2D::new(16, 16),
//!     num_steps: 5,
//!     ..SimulationConfig::default()
//! };
//! let mut world = World::new(config, Box::new(Meadow)).unwrap();
//! world.initialize().unwrap();
//! assert_eq!(world.run().unwrap(), StepId(5));
//! assert_eq!(world.agents().owned_count(), 4);
//! ```
//!
//! Partitioned runs hand the same kind of scenario to a
//! [`TaskGroup`](engine::TaskGroup), which builds one world per task.
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | Ids, geometry, error types |
//! | [`space`] | `tessera-space` | Domain partitioning and neighbour directions |
//! | [`raster`] | `tessera-raster` | Bounded integer rasters and band patches |
//! | [`agents`] | `tessera-agents` | Agent records and the spatial registry |
//! | [`engine`] | `tessera-engine` | World driver, scheduler and task groups |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, geometry and error types (`tessera-core`).
pub use tessera_core as types;

/// Domain partitioning (`tessera-space`).
///
/// [`space::PartitionLayout`] splits the domain into one owned section per
/// task and answers ownership and neighbour queries.
pub use tessera_space as space;

/// Raster storage (`tessera-raster`).
pub use tessera_raster as raster;

/// Agent records and the spatial registry (`tessera-agents`).
pub use tessera_agents as agents;

/// Simulation driver (`tessera-engine`).
///
/// [`engine::World`] runs one task, [`engine::TaskGroup`] runs all tasks of
/// a partitioned simulation on threads.
pub use tessera_engine as engine;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tessera_core::{AgentId, Point2D, RasterId, Rect, Size2D, StepId, TaskId};

    // Errors
    pub use tessera_core::{AgentError, RasterError, SyncError};

    // Rasters and agents
    pub use tessera_agents::{Agent, AttrKind, AttrValue, TypeFilter};
    pub use tessera_raster::{RasterKind, RasterStore};

    // Engine
    pub use tessera_engine::{
        ActionContext, AgentBehavior, EnvironmentContext, MemorySerializer, Scenario, Serializer,
        SimulationConfig, TaskGroup, World, WorldError, WorldSetup,
    };
}
