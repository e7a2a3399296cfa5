//! Core types for the Tessera simulation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! integer geometry every other crate speaks ([`Point2D`], [`Size2D`],
//! [`Rect`]), the strongly-typed identifiers, and the error enums shared by
//! the raster store, the agent registry and the partition scheduler.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;

pub use error::{AgentError, RasterError, SyncError};
pub use geometry::{Point2D, Rect, Size2D};
pub use id::{AgentId, RasterId, StepId, TaskId};
