//! Top-level error type for world construction and stepping.

use std::error::Error;
use std::fmt;

use tessera_core::{AgentError, RasterError, Rect, SyncError, TaskId};
use tessera_space::SpaceError;

use crate::config::ConfigError;
use crate::world::WorldState;

/// Errors surfaced by [`World`](crate::World), scenario hooks and
/// behaviours.
///
/// Raster, agent and capacity errors are local: a behaviour may catch them
/// and try something else. A [`WorldError::Sync`] is always fatal to the
/// run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Raster registration or access failed.
    Raster(RasterError),
    /// Agent registry operation failed.
    Agent(AgentError),
    /// Boundary synchronization failed.
    Sync(SyncError),
    /// No free cell is left in the region.
    Capacity {
        /// The saturated region.
        region: Rect,
    },
    /// An operation was called in the wrong lifecycle state.
    Lifecycle {
        /// The rejected operation.
        operation: &'static str,
        /// State the world was in.
        state: WorldState,
    },
    /// A scenario hook or behaviour reported a domain failure.
    Hook {
        /// Description supplied by the hook.
        reason: String,
    },
    /// A serializer failed to record data.
    Serialization {
        /// Description supplied by the serializer.
        reason: String,
    },
    /// A task thread panicked.
    TaskPanicked {
        /// The task whose thread died.
        task: TaskId,
    },
}

impl WorldError {
    /// Convenience constructor for [`WorldError::Hook`].
    pub fn hook(reason: impl Into<String>) -> Self {
        Self::Hook {
            reason: reason.into(),
        }
    }

    /// `true` for failures that are a consequence of another task failing
    /// first (a peer went away or fell silent).
    pub fn is_cascade(&self) -> bool {
        matches!(
            self,
            Self::Sync(SyncError::Disconnected { .. } | SyncError::MissingExchange { .. })
        )
    }
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Raster(e) => write!(f, "raster: {e}"),
            Self::Agent(e) => write!(f, "agent: {e}"),
            Self::Sync(e) => write!(f, "sync failure: {e}"),
            Self::Capacity { region } => write!(f, "no free cell left in {region}"),
            Self::Lifecycle { operation, state } => {
                write!(f, "cannot {operation} while {state:?}")
            }
            Self::Hook { reason } => write!(f, "scenario hook failed: {reason}"),
            Self::Serialization { reason } => write!(f, "serializer failed: {reason}"),
            Self::TaskPanicked { task } => write!(f, "task {task} panicked"),
        }
    }
}

impl Error for WorldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Raster(e) => Some(e),
            Self::Agent(e) => Some(e),
            Self::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for WorldError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SpaceError> for WorldError {
    fn from(e: SpaceError) -> Self {
        Self::Config(ConfigError::Layout(e))
    }
}

impl From<RasterError> for WorldError {
    fn from(e: RasterError) -> Self {
        Self::Raster(e)
    }
}

impl From<AgentError> for WorldError {
    fn from(e: AgentError) -> Self {
        Self::Agent(e)
    }
}

impl From<SyncError> for WorldError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{AgentId, StepId};

    #[test]
    fn subsystem_errors_convert_and_chain() {
        let err: WorldError = AgentError::NotFound {
            id: AgentId::new("ghost"),
        }
        .into();
        assert!(matches!(err, WorldError::Agent(_)));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "agent: agent 'ghost' not found");
    }

    #[test]
    fn cascade_classification() {
        let missing: WorldError = SyncError::MissingExchange {
            peer: TaskId(1),
            step: StepId(3),
            waited_ms: 10,
        }
        .into();
        assert!(missing.is_cascade());
        let malformed: WorldError = SyncError::Malformed {
            peer: TaskId(1),
            reason: "bad".into(),
        }
        .into();
        assert!(!malformed.is_cascade());
        assert!(!WorldError::hook("boom").is_cascade());
    }
}
