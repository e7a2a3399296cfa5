//! Serialization hooks.
//!
//! The world hands snapshots to a [`Serializer`] at fixed points of its
//! lifecycle; what the serializer does with them (files, network, a
//! viewer) is its own business. [`MemorySerializer`] keeps everything in
//! memory and doubles as the reference consumer in tests.

use std::sync::{Arc, Mutex, MutexGuard};

use tessera_agents::{AgentSnapshot, AttrKind};
use tessera_core::{RasterId, Rect, Size2D, TaskId};
use tessera_raster::{RasterKind, RasterSnapshot};

use crate::error::WorldError;

/// Run description handed to [`Serializer::begin`].
#[derive(Clone, Debug, PartialEq)]
pub struct SerializerHeader {
    /// Task writing this stream.
    pub task: TaskId,
    /// Tasks in the run.
    pub num_tasks: u32,
    /// Global domain size.
    pub domain: Size2D,
    /// Region this task serializes.
    pub owned: Rect,
    /// Configured step count.
    pub num_steps: u64,
    /// Serializer resolution in steps.
    pub serialize_every: u64,
    /// `(index, name, kind)` of every raster with its serialize flag set.
    pub rasters: Vec<(RasterId, String, RasterKind)>,
    /// Declared attributes per agent type: `(type, [(key, kind)])`.
    pub attributes: Vec<(String, Vec<(String, AttrKind)>)>,
}

/// Consumer of per-step raster and agent snapshots.
pub trait Serializer: Send {
    /// Called once, after initialization.
    fn begin(&mut self, header: &SerializerHeader) -> Result<(), WorldError>;

    /// One raster over the task's owned region. Static rasters arrive once
    /// at initialization, dynamic rasters on every serialized step.
    fn write_raster(&mut self, step: u64, snapshot: &RasterSnapshot) -> Result<(), WorldError>;

    /// Live owned agents, in registry order.
    fn write_agents(&mut self, step: u64, agents: &[AgentSnapshot]) -> Result<(), WorldError>;

    /// Called once, after the last step.
    fn finish(&mut self, final_step: u64) -> Result<(), WorldError>;
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSerializer;

impl Serializer for NullSerializer {
    fn begin(&mut self, _header: &SerializerHeader) -> Result<(), WorldError> {
        Ok(())
    }

    fn write_raster(&mut self, _step: u64, _snapshot: &RasterSnapshot) -> Result<(), WorldError> {
        Ok(())
    }

    fn write_agents(&mut self, _step: u64, _agents: &[AgentSnapshot]) -> Result<(), WorldError> {
        Ok(())
    }

    fn finish(&mut self, _final_step: u64) -> Result<(), WorldError> {
        Ok(())
    }
}

/// Everything a [`MemorySerializer`] recorded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerializedRun {
    /// Header from [`Serializer::begin`].
    pub header: Option<SerializerHeader>,
    /// `(step, snapshot)` in arrival order.
    pub rasters: Vec<(u64, RasterSnapshot)>,
    /// `(step, agents)` in arrival order.
    pub agents: Vec<(u64, Vec<AgentSnapshot>)>,
    /// Step passed to [`Serializer::finish`].
    pub final_step: Option<u64>,
}

impl SerializedRun {
    /// Steps at which agents were written.
    pub fn agent_steps(&self) -> Vec<u64> {
        self.agents.iter().map(|(step, _)| *step).collect()
    }

    /// Snapshots of one raster, in arrival order.
    pub fn raster_history(&self, name: &str) -> Vec<(u64, &RasterSnapshot)> {
        self.rasters
            .iter()
            .filter(|(_, s)| s.name == name)
            .map(|(step, s)| (*step, s))
            .collect()
    }
}

/// In-memory serializer. Clones share one recording, so a test can keep a
/// handle while the world owns the serializer.
#[derive(Clone, Debug, Default)]
pub struct MemorySerializer {
    run: Arc<Mutex<SerializedRun>>,
}

impl MemorySerializer {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn recorded(&self) -> SerializedRun {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SerializedRun> {
        // A panicking writer leaves the recording readable.
        self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Serializer for MemorySerializer {
    fn begin(&mut self, header: &SerializerHeader) -> Result<(), WorldError> {
        self.lock().header = Some(header.clone());
        Ok(())
    }

    fn write_raster(&mut self, step: u64, snapshot: &RasterSnapshot) -> Result<(), WorldError> {
        self.lock().rasters.push((step, snapshot.clone()));
        Ok(())
    }

    fn write_agents(&mut self, step: u64, agents: &[AgentSnapshot]) -> Result<(), WorldError> {
        self.lock().agents.push((step, agents.to_vec()));
        Ok(())
    }

    fn finish(&mut self, final_step: u64) -> Result<(), WorldError> {
        self.lock().final_step = Some(final_step);
        Ok(())
    }
}
