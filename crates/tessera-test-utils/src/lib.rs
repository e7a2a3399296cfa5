//! Test scenarios and behaviours for Tessera development.
//!
//! [`TestScenario`] is a declarative [`Scenario`](tessera_engine::Scenario):
//! it lists rasters and agents in global coordinates, and each task creates
//! only the agents inside its own owned region. The same value therefore
//! drives a single-task world and every task of a
//! [`TaskGroup`](tessera_engine::TaskGroup) alike.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod behaviors;
pub mod scenario;

pub use behaviors::{Drift, FailAt, FinalizeAt, Harvest, RandomWalker, Stationary};
pub use scenario::{Motion, RasterSpec, TestScenario};
