//! Spatial partitioning for Tessera simulations.
//!
//! A [`PartitionLayout`] splits the global rectangular domain into one
//! [`Section`] per task. Each section owns an exclusive rectangle and
//! replicates a surrounding overlap band of fixed width from its
//! neighbours. The layout answers the ownership questions the scheduler
//! and the world driver need:
//!
//! - which task owns a global position ([`PartitionLayout::owner_of`]),
//! - which tasks are adjacent, in the fixed exchange order
//!   ([`PartitionLayout::neighbours`]),
//! - which owned cells a task must ship to a neighbour each step
//!   ([`PartitionLayout::band`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod error;
pub mod partition;

#[cfg(test)]
pub(crate) mod compliance;

pub use direction::Direction;
pub use error::SpaceError;
pub use partition::{PartitionLayout, Section};
