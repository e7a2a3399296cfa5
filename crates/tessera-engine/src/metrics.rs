//! Per-step performance and synchronization metrics.

/// Timing and bookkeeping collected during a single step.
///
/// All durations are in microseconds. The world fills these after each
/// step; [`World::last_metrics`](crate::World::last_metrics) returns the
/// most recent one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Step these metrics describe.
    pub step: u64,
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Time spent in the environment update, in microseconds.
    pub environment_us: u64,
    /// Time spent letting owned agents act, in microseconds.
    pub agents_us: u64,
    /// Time spent in boundary synchronization, in microseconds.
    pub sync_us: u64,
    /// Time spent in serializer calls, in microseconds.
    pub serialize_us: u64,
    /// Owned agents after synchronization.
    pub owned_agents: u32,
    /// Ghost agents after synchronization.
    pub ghost_agents: u32,
    /// Agents handed to neighbours.
    pub handoffs_sent: u32,
    /// Agents adopted from neighbours.
    pub handoffs_received: u32,
    /// Ownership conflicts settled by task id.
    pub conflicts: u32,
    /// Owned agents dropped because a lower task won their id.
    pub revoked: u32,
    /// Dead agents purged at the end of the agent phase.
    pub purged: u32,
}
