//! Point-to-point message transport between tasks.
//!
//! The scheduler only needs ordered, reliable delivery per task pair and a
//! bounded wait on receive. [`ChannelTransport`] provides that in-process
//! with one unbounded crossbeam channel per ordered pair of tasks: sends
//! never block, so a task can post all of its outgoing messages before it
//! starts waiting, and the fixed neighbour order cannot produce a cyclic
//! wait.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tessera_agents::Agent;
use tessera_core::{AgentId, StepId, SyncError, TaskId};
use tessera_raster::RasterPatch;

// ── Messages ───────────────────────────────────────────────────────

/// One task's boundary data for one neighbour.
#[derive(Clone, Debug, Default)]
pub struct BoundaryMessage {
    /// Sender-owned raster cells inside the receiver's overlap band.
    pub patches: Vec<RasterPatch>,
    /// Sender-owned agents standing in the receiver's overlap band.
    pub ghosts: Vec<Agent>,
    /// Agents whose position is now inside the receiver's owned region.
    pub handoffs: Vec<Agent>,
}

/// Message body.
#[derive(Clone, Debug)]
pub enum Payload {
    /// Boundary round.
    Boundary(BoundaryMessage),
    /// Verdict round: ids the receiver must stop owning.
    Verdict(Vec<AgentId>),
    /// Control round: the sender's finalize flag.
    Control {
        /// Whether the sender wants to stop after this step.
        finalize: bool,
    },
}

impl Payload {
    /// Short name of the message kind, for error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Boundary(_) => "boundary",
            Payload::Verdict(_) => "verdict",
            Payload::Control { .. } => "control",
        }
    }
}

/// A payload stamped with its sender and step.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Sending task.
    pub from: TaskId,
    /// Step the payload belongs to.
    pub step: StepId,
    /// Message body.
    pub payload: Payload,
}

// ── BoundaryTransport ──────────────────────────────────────────────

/// Delivery of envelopes between the tasks of one run.
///
/// Implementations must deliver messages from one sender to one receiver
/// in send order.
pub trait BoundaryTransport: Send {
    /// Task this endpoint belongs to.
    fn task(&self) -> TaskId;

    /// Number of tasks the transport connects.
    fn num_tasks(&self) -> u32;

    /// Post an envelope to `to`. Must not block indefinitely.
    fn send(&self, to: TaskId, envelope: Envelope) -> Result<(), SyncError>;

    /// Next envelope from `from`, waiting at most the transport's timeout.
    /// `step` is only used to describe a timeout.
    fn recv(&self, from: TaskId, step: StepId) -> Result<Envelope, SyncError>;
}

// ── ChannelTransport ───────────────────────────────────────────────

/// In-process transport over crossbeam channels.
#[derive(Debug)]
pub struct ChannelTransport {
    task: TaskId,
    timeout: Duration,
    senders: Vec<Option<Sender<Envelope>>>,
    receivers: Vec<Option<Receiver<Envelope>>>,
}

impl ChannelTransport {
    /// A fully connected set of `n` endpoints, index `i` belonging to
    /// `TaskId(i)`.
    pub fn mesh(n: u32, timeout: Duration) -> Vec<ChannelTransport> {
        let n_usize = n as usize;
        let mut endpoints: Vec<ChannelTransport> = (0..n)
            .map(|i| ChannelTransport {
                task: TaskId(i),
                timeout,
                senders: (0..n_usize).map(|_| None).collect(),
                receivers: (0..n_usize).map(|_| None).collect(),
            })
            .collect();
        for from in 0..n_usize {
            for to in 0..n_usize {
                if from == to {
                    continue;
                }
                let (tx, rx) = unbounded();
                endpoints[from].senders[to] = Some(tx);
                endpoints[to].receivers[from] = Some(rx);
            }
        }
        endpoints
    }

    fn peer_sender(&self, to: TaskId) -> Result<&Sender<Envelope>, SyncError> {
        self.senders
            .get(to.index())
            .and_then(Option::as_ref)
            .ok_or(SyncError::Disconnected { peer: to })
    }

    fn peer_receiver(&self, from: TaskId) -> Result<&Receiver<Envelope>, SyncError> {
        self.receivers
            .get(from.index())
            .and_then(Option::as_ref)
            .ok_or(SyncError::Disconnected { peer: from })
    }
}

impl BoundaryTransport for ChannelTransport {
    fn task(&self) -> TaskId {
        self.task
    }

    fn num_tasks(&self) -> u32 {
        self.senders.len() as u32
    }

    fn send(&self, to: TaskId, envelope: Envelope) -> Result<(), SyncError> {
        self.peer_sender(to)?
            .send(envelope)
            .map_err(|_| SyncError::Disconnected { peer: to })
    }

    fn recv(&self, from: TaskId, step: StepId) -> Result<Envelope, SyncError> {
        match self.peer_receiver(from)?.recv_timeout(self.timeout) {
            Ok(envelope) => Ok(envelope),
            Err(RecvTimeoutError::Timeout) => Err(SyncError::MissingExchange {
                peer: from,
                step,
                waited_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(SyncError::Disconnected { peer: from }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(from: u32, step: u64, finalize: bool) -> Envelope {
        Envelope {
            from: TaskId(from),
            step: StepId(step),
            payload: Payload::Control { finalize },
        }
    }

    #[test]
    fn mesh_delivers_in_order_per_pair() {
        let mesh = ChannelTransport::mesh(3, Duration::from_millis(200));
        mesh[0].send(TaskId(2), control(0, 1, false)).unwrap();
        mesh[0].send(TaskId(2), control(0, 2, true)).unwrap();
        mesh[1].send(TaskId(2), control(1, 1, false)).unwrap();

        let first = mesh[2].recv(TaskId(0), StepId(1)).unwrap();
        let second = mesh[2].recv(TaskId(0), StepId(2)).unwrap();
        assert_eq!(first.step, StepId(1));
        assert_eq!(second.step, StepId(2));
        assert_eq!(mesh[2].recv(TaskId(1), StepId(1)).unwrap().from, TaskId(1));
        assert_eq!(mesh[2].num_tasks(), 3);
    }

    #[test]
    fn silent_peer_times_out() {
        let mesh = ChannelTransport::mesh(2, Duration::from_millis(20));
        match mesh[0].recv(TaskId(1), StepId(4)) {
            Err(SyncError::MissingExchange { peer, step, waited_ms }) => {
                assert_eq!(peer, TaskId(1));
                assert_eq!(step, StepId(4));
                assert_eq!(waited_ms, 20);
            }
            other => panic!("expected MissingExchange, got {other:?}"),
        }
    }

    #[test]
    fn dropped_peer_is_disconnected() {
        let mut mesh = ChannelTransport::mesh(2, Duration::from_secs(5));
        let peer = mesh.pop().unwrap();
        drop(peer);
        assert_eq!(
            mesh[0].recv(TaskId(1), StepId(0)).unwrap_err(),
            SyncError::Disconnected { peer: TaskId(1) }
        );
        assert_eq!(
            mesh[0].send(TaskId(1), control(0, 0, false)).unwrap_err(),
            SyncError::Disconnected { peer: TaskId(1) }
        );
    }

    #[test]
    fn self_and_unknown_peers_are_unreachable() {
        let mesh = ChannelTransport::mesh(2, Duration::from_millis(10));
        assert!(mesh[0].send(TaskId(0), control(0, 0, false)).is_err());
        assert!(mesh[0].recv(TaskId(9), StepId(0)).is_err());
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(Payload::Verdict(Vec::new()).kind(), "verdict");
        assert_eq!(Payload::Boundary(BoundaryMessage::default()).kind(), "boundary");
        assert_eq!(control(0, 0, true).payload.kind(), "control");
    }
}
