//! Error types shared across the Tessera workspace.
//!
//! Organised by subsystem: raster store, agent registry, and boundary
//! synchronization. Raster and agent errors are local conditions a caller
//! can recover from (retry elsewhere, skip the action). [`SyncError`] is
//! fatal: a run cannot continue with an inconsistent shared border.

use std::error::Error;
use std::fmt;

use crate::geometry::{Point2D, Rect};
use crate::id::{AgentId, RasterId, StepId, TaskId};

/// Errors from raster registration, lookup and cell access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// No raster is registered under this name or index.
    NotFound {
        /// The name or index that was looked up.
        key: String,
    },
    /// A raster with this name is already registered.
    DuplicateName {
        /// The conflicting name.
        name: String,
    },
    /// An explicit registration index is already taken.
    DuplicateIndex {
        /// The conflicting index.
        index: RasterId,
    },
    /// The position lies outside this task's owned region plus overlap band.
    OutOfBounds {
        /// Raster name.
        raster: String,
        /// The offending position.
        position: Point2D,
        /// The region this task may access.
        bounds: Rect,
    },
    /// The value lies outside `[min, max(cell)]`.
    ValueOutOfRange {
        /// Raster name.
        raster: String,
        /// Cell that was written.
        position: Point2D,
        /// Rejected value.
        value: i32,
        /// Raster-wide minimum.
        min: i32,
        /// Per-cell maximum at `position`.
        max: i32,
    },
    /// A static raster was written after initialization completed.
    Immutable {
        /// Raster name.
        raster: String,
    },
    /// Initial bounds are inconsistent (`min > max` or default outside them).
    InvalidBounds {
        /// Raster name.
        raster: String,
        /// Requested minimum.
        min: i32,
        /// Requested maximum.
        max: i32,
        /// Requested default value.
        default: i32,
    },
    /// A raster patch does not match the area it claims to cover.
    ShapeMismatch {
        /// Raster name.
        raster: String,
        /// Cells the patch area holds.
        expected: usize,
        /// Values actually carried.
        found: usize,
    },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "raster '{key}' not found"),
            Self::DuplicateName { name } => write!(f, "raster '{name}' already registered"),
            Self::DuplicateIndex { index } => write!(f, "raster index {index} already in use"),
            Self::OutOfBounds {
                raster,
                position,
                bounds,
            } => write!(
                f,
                "raster '{raster}': position {position} outside local bounds {bounds}"
            ),
            Self::ValueOutOfRange {
                raster,
                position,
                value,
                min,
                max,
            } => write!(
                f,
                "raster '{raster}': value {value} at {position} outside [{min}, {max}]"
            ),
            Self::Immutable { raster } => {
                write!(f, "static raster '{raster}' is read-only after initialization")
            }
            Self::InvalidBounds {
                raster,
                min,
                max,
                default,
            } => write!(
                f,
                "raster '{raster}': invalid bounds min={min} max={max} default={default}"
            ),
            Self::ShapeMismatch {
                raster,
                expected,
                found,
            } => write!(
                f,
                "raster '{raster}': patch carries {found} values, area holds {expected}"
            ),
        }
    }
}

impl Error for RasterError {}

/// Errors from the agent registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentError {
    /// No agent with this id is known locally.
    NotFound {
        /// The missing id.
        id: AgentId,
    },
    /// An owned agent with this id already exists locally.
    DuplicateId {
        /// The conflicting id.
        id: AgentId,
    },
    /// The position lies outside the region this task may place agents in.
    OutOfBounds {
        /// The agent being placed or moved.
        id: AgentId,
        /// The rejected position.
        position: Point2D,
        /// The region that was allowed.
        bounds: Rect,
    },
    /// The target cell is already occupied and multi-occupancy is disabled.
    CellOccupied {
        /// The agent being placed or moved.
        id: AgentId,
        /// The occupied cell.
        position: Point2D,
    },
    /// The agent is a ghost copy owned by another task and cannot be mutated.
    NotOwned {
        /// The ghost's id.
        id: AgentId,
        /// Task holding the authoritative copy.
        owner: TaskId,
    },
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "agent '{id}' not found"),
            Self::DuplicateId { id } => write!(f, "agent '{id}' already owned by this task"),
            Self::OutOfBounds {
                id,
                position,
                bounds,
            } => write!(f, "agent '{id}': position {position} outside {bounds}"),
            Self::CellOccupied { id, position } => {
                write!(f, "agent '{id}': cell {position} already occupied")
            }
            Self::NotOwned { id, owner } => {
                write!(f, "agent '{id}' is a ghost owned by task {owner}")
            }
        }
    }
}

impl Error for AgentError {}

/// Boundary synchronization failures. Always fatal to the current run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// A neighbour did not deliver its exchange within the timeout.
    MissingExchange {
        /// The silent neighbour.
        peer: TaskId,
        /// Step being synchronized.
        step: StepId,
        /// How long we waited, in milliseconds.
        waited_ms: u64,
    },
    /// The channel to a neighbour is closed (its task stopped).
    Disconnected {
        /// The unreachable neighbour.
        peer: TaskId,
    },
    /// A neighbour sent data for a different step.
    StepMismatch {
        /// The sending neighbour.
        peer: TaskId,
        /// Step this task is synchronizing.
        expected: StepId,
        /// Step the message was stamped with.
        found: StepId,
    },
    /// A message arrived out of protocol order.
    UnexpectedMessage {
        /// The sending neighbour.
        peer: TaskId,
        /// Message kind the protocol expected.
        expected: &'static str,
        /// Message kind that arrived.
        found: &'static str,
    },
    /// A message was structurally invalid (wrong area, wrong raster,
    /// agent outside the band, ...).
    Malformed {
        /// The sending neighbour.
        peer: TaskId,
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingExchange {
                peer,
                step,
                waited_ms,
            } => write!(
                f,
                "no boundary exchange from task {peer} for step {step} after {waited_ms}ms"
            ),
            Self::Disconnected { peer } => write!(f, "task {peer} disconnected"),
            Self::StepMismatch {
                peer,
                expected,
                found,
            } => write!(
                f,
                "task {peer} sent step {found} while synchronizing step {expected}"
            ),
            Self::UnexpectedMessage {
                peer,
                expected,
                found,
            } => write!(f, "task {peer} sent {found}, expected {expected}"),
            Self::Malformed { peer, reason } => {
                write!(f, "malformed exchange from task {peer}: {reason}")
            }
        }
    }
}

impl Error for SyncError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_errors_name_the_raster() {
        let err = RasterError::ValueOutOfRange {
            raster: "soil".into(),
            position: Point2D::new(1, 2),
            value: 12,
            min: 0,
            max: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("soil"));
        assert!(msg.contains("[0, 10]"));
    }

    #[test]
    fn sync_error_display_mentions_peer() {
        let err = SyncError::MissingExchange {
            peer: TaskId(3),
            step: StepId(7),
            waited_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "no boundary exchange from task 3 for step 7 after 250ms"
        );
    }
}
