//! Strongly-typed identifiers.

use std::borrow::Borrow;
use std::fmt;

/// Identifies one cooperating compute task (one partition of the domain).
///
/// Task ids are dense: a layout with `n` tasks uses `TaskId(0)..TaskId(n)`.
/// The numeric order is significant: it is the tie-break order used when
/// two tasks claim the same agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl TaskId {
    /// The task id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TaskId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Stable index of a registered raster.
///
/// Indices are either assigned sequentially at registration or chosen
/// explicitly by the caller (so scenarios can use an enum of well-known
/// rasters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RasterId(pub u32);

impl RasterId {
    /// The raster id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RasterId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing simulation step counter.
///
/// `StepId(k)` is the step currently executing (or about to execute);
/// it is incremented once the step's synchronization has completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The following step.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Unique string identifier of an agent.
///
/// Ids are global across tasks: an agent keeps its id when ownership is
/// handed from one task to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(String);

impl AgentId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for AgentId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
