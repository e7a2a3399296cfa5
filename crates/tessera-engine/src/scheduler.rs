//! Boundary synchronization between tasks.
//!
//! Every step ends with three rendezvous rounds, each walking neighbours
//! in [`Direction::EXCHANGE_ORDER`](tessera_space::Direction::EXCHANGE_ORDER):
//!
//! 1. **Boundary**: each task sends every neighbour the raster cells and
//!    ghost agents for that neighbour's overlap band, plus the agents whose
//!    position now lies in the neighbour's owned region (handoffs). The
//!    sender demotes handed-off agents to ghosts before sending. Incoming
//!    patches overwrite local ghost cells; incoming ghosts replace the
//!    sender's previous ghosts; handoffs become owned.
//! 2. **Verdict**: when copies of one agent id come from more than one
//!    task, the copy that task with the lowest id owned at the start of the
//!    step wins. That includes a task's own outgoing handoff, so two tasks
//!    swapping handoffs for one id settle on the lower task's copy. Losing
//!    owned copies are revoked in this round.
//! 3. **Control**: every task sends its finalize flag to every other task
//!    and ORs what it receives, so all tasks stop after the same step.
//!
//! An adopted handoff that lands on an occupied cell is moved to the
//! nearest free cell of the owned region, unless cells may be shared.
//!
//! All sends happen before the matching receives, and per-pair delivery is
//! ordered, so the rounds cannot deadlock. A single-task layout skips the
//! protocol entirely.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use tessera_agents::{Agent, AgentRegistry, TypeFilter};
use tessera_core::{AgentError, AgentId, Point2D, StepId, SyncError, TaskId};
use tessera_raster::RasterStore;
use tessera_space::{PartitionLayout, Section};

use crate::config::ConfigError;
use crate::transport::{BoundaryMessage, BoundaryTransport, Envelope, Payload};

/// Counters from one synchronization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Agents this task handed to neighbours.
    pub handoffs_sent: u32,
    /// Agents this task adopted from neighbours.
    pub handoffs_received: u32,
    /// Agent ids claimed by more than one task and settled by task id.
    pub conflicts: u32,
    /// Owned agents dropped because a neighbour won the claim.
    pub revoked: u32,
    /// Agreed finalize flag: `true` if any task asked to stop.
    pub finalize: bool,
}

/// Everything one round told this task about a single agent id.
#[derive(Default)]
struct Claim {
    ghosts: SmallVec<[(TaskId, Agent); 1]>,
    handoffs: SmallVec<[(TaskId, Agent); 1]>,
}

/// Drives the exchange protocol for one task.
pub struct PartitionScheduler {
    layout: PartitionLayout,
    section: Section,
    transport: Box<dyn BoundaryTransport>,
    shared_cells: bool,
}

impl std::fmt::Debug for PartitionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionScheduler")
            .field("task", &self.section.task())
            .field("owned", &self.section.owned())
            .field("boundaries", &self.section.boundaries())
            .finish_non_exhaustive()
    }
}

impl PartitionScheduler {
    /// Scheduler for the transport's task within `layout`.
    ///
    /// Fails if the transport does not connect exactly the layout's tasks.
    pub fn new(
        layout: PartitionLayout,
        transport: Box<dyn BoundaryTransport>,
    ) -> Result<Self, ConfigError> {
        let task = transport.task();
        let mismatch = ConfigError::TaskMismatch {
            task: task.0,
            num_tasks: layout.num_tasks(),
            transport: transport.num_tasks(),
        };
        if transport.num_tasks() != layout.num_tasks() {
            return Err(mismatch);
        }
        let section = layout.section(task).cloned().ok_or(mismatch)?;
        Ok(Self {
            layout,
            section,
            transport,
            shared_cells: false,
        })
    }

    /// Let adopted handoffs share a cell with other agents.
    pub fn with_shared_cells(mut self, shared: bool) -> Self {
        self.shared_cells = shared;
        self
    }

    /// This task.
    pub fn task(&self) -> TaskId {
        self.section.task()
    }

    /// The run's partition layout.
    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    /// This task's section.
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Run the boundary, verdict and control rounds for `step`.
    ///
    /// `include_static` also ships static rasters (initial exchange only).
    /// `finalize` is this task's stop request; the returned report carries
    /// the agreed value.
    pub fn synchronize(
        &self,
        step: StepId,
        rasters: &mut RasterStore,
        agents: &mut AgentRegistry,
        include_static: bool,
        finalize: bool,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport {
            finalize,
            ..SyncReport::default()
        };
        if self.layout.num_tasks() == 1 {
            return Ok(report);
        }
        let me = self.task();
        let peers: SmallVec<[TaskId; 8]> = self
            .layout
            .neighbours(me)
            .iter()
            .map(|&(_, peer)| peer)
            .collect();

        // ── Boundary round ──────────────────────────────────────────

        let mut outgoing: SmallVec<[(TaskId, BoundaryMessage); 8]> = SmallVec::new();
        for &peer in &peers {
            outgoing.push((peer, self.collect(peer, rasters, agents, include_static)));
        }
        let mut handed_off: SmallVec<[(TaskId, Vec<AgentId>); 8]> = SmallVec::new();
        for (peer, message) in &outgoing {
            let ids: Vec<AgentId> = message.handoffs.iter().map(|a| a.id().clone()).collect();
            for id in &ids {
                agents.demote(id, *peer).map_err(|e| SyncError::Malformed {
                    peer: me,
                    reason: format!("cannot hand off '{id}': {e}"),
                })?;
            }
            report.handoffs_sent += ids.len() as u32;
            handed_off.push((*peer, ids));
        }
        for (peer, message) in outgoing {
            self.post(peer, step, Payload::Boundary(message))?;
        }

        let mut incoming: SmallVec<[(TaskId, BoundaryMessage); 8]> = SmallVec::new();
        for &peer in &peers {
            match self.expect(peer, step)? {
                Payload::Boundary(message) => incoming.push((peer, message)),
                other => {
                    return Err(SyncError::UnexpectedMessage {
                        peer,
                        expected: "boundary",
                        found: other.kind(),
                    })
                }
            }
        }

        for (peer, message) in &incoming {
            self.merge_patches(*peer, message, rasters)?;
            let kept = handed_off
                .iter()
                .find(|(to, _)| to == peer)
                .map(|(_, ids)| ids.as_slice())
                .unwrap_or_default();
            agents.remove_ghosts_of(*peer, |id| kept.contains(id));
        }

        let claims = self.gather_claims(incoming)?;
        let revokes = self.resolve_claims(claims, &handed_off, agents, &mut report)?;

        // ── Verdict round ───────────────────────────────────────────

        for &peer in &peers {
            let ids: Vec<AgentId> = revokes
                .iter()
                .filter(|(to, _)| *to == peer)
                .map(|(_, id)| id.clone())
                .collect();
            self.post(peer, step, Payload::Verdict(ids))?;
        }
        for &peer in &peers {
            match self.expect(peer, step)? {
                Payload::Verdict(ids) => {
                    for id in ids {
                        if agents.get(id.as_str()).is_some_and(Agent::is_owned) {
                            agents.remove(&id).map_err(|e| SyncError::Malformed {
                                peer,
                                reason: e.to_string(),
                            })?;
                            report.revoked += 1;
                            warn!(task = %me, peer = %peer, agent = %id, "owned agent revoked by lower task");
                        }
                    }
                }
                other => {
                    return Err(SyncError::UnexpectedMessage {
                        peer,
                        expected: "verdict",
                        found: other.kind(),
                    })
                }
            }
        }

        // ── Control round ───────────────────────────────────────────

        let everyone = (0..self.layout.num_tasks()).map(TaskId).filter(|&t| t != me);
        for peer in everyone.clone() {
            self.post(peer, step, Payload::Control { finalize })?;
        }
        for peer in everyone {
            match self.expect(peer, step)? {
                Payload::Control { finalize } => report.finalize |= finalize,
                other => {
                    return Err(SyncError::UnexpectedMessage {
                        peer,
                        expected: "control",
                        found: other.kind(),
                    })
                }
            }
        }

        Ok(report)
    }

    /// Build the boundary message for `peer`.
    fn collect(
        &self,
        peer: TaskId,
        rasters: &RasterStore,
        agents: &AgentRegistry,
        include_static: bool,
    ) -> BoundaryMessage {
        let Some(target) = self.layout.section(peer) else {
            return BoundaryMessage::default();
        };
        let patches = self
            .layout
            .band(self.task(), peer)
            .map(|band| rasters.extract_patches(&band, include_static))
            .unwrap_or_default();
        let mut ghosts = Vec::new();
        let mut handoffs = Vec::new();
        for agent in agents.owned().filter(|a| a.exists()) {
            let pos = agent.position();
            if target.owned().contains(&pos) {
                handoffs.push(agent.clone());
            } else if target.boundaries().contains(&pos) {
                ghosts.push(agent.clone());
            }
        }
        BoundaryMessage {
            patches,
            ghosts,
            handoffs,
        }
    }

    fn merge_patches(
        &self,
        peer: TaskId,
        message: &BoundaryMessage,
        rasters: &mut RasterStore,
    ) -> Result<(), SyncError> {
        let band = self.layout.band(peer, self.task());
        for patch in &message.patches {
            if !band.is_some_and(|b| b.contains_rect(&patch.area)) {
                return Err(SyncError::Malformed {
                    peer,
                    reason: format!("raster patch {} outside shared band", patch.area),
                });
            }
            rasters.apply_patch(patch).map_err(|e| SyncError::Malformed {
                peer,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Validate incoming agents and group them by id, in arrival order.
    fn gather_claims(
        &self,
        incoming: SmallVec<[(TaskId, BoundaryMessage); 8]>,
    ) -> Result<IndexMap<AgentId, Claim>, SyncError> {
        let mut claims: IndexMap<AgentId, Claim> = IndexMap::new();
        for (peer, message) in incoming {
            for ghost in message.ghosts {
                if !self.section.in_overlap_band(&ghost.position()) {
                    return Err(SyncError::Malformed {
                        peer,
                        reason: format!("ghost '{}' at {} outside overlap band", ghost.id(), ghost.position()),
                    });
                }
                claims.entry(ghost.id().clone()).or_default().ghosts.push((peer, ghost));
            }
            for agent in message.handoffs {
                if self.layout.owner_of(&agent.position()) != Some(self.task()) {
                    return Err(SyncError::Malformed {
                        peer,
                        reason: format!("handoff '{}' at {} not owned here", agent.id(), agent.position()),
                    });
                }
                claims.entry(agent.id().clone()).or_default().handoffs.push((peer, agent));
            }
        }
        Ok(claims)
    }

    /// Apply the lower-task-id rule to every claimed id. Returns the
    /// `(neighbour, id)` revocations to send in the verdict round.
    ///
    /// Each copy is attributed to the task that owned it when the step
    /// began: ghosts and handoffs to their sender, the local owned copy and
    /// any copy this task just handed off to this task.
    fn resolve_claims(
        &self,
        claims: IndexMap<AgentId, Claim>,
        handed_off: &[(TaskId, Vec<AgentId>)],
        agents: &mut AgentRegistry,
        report: &mut SyncReport,
    ) -> Result<Vec<(TaskId, AgentId)>, SyncError> {
        let me = self.task();
        let mut revokes = Vec::new();
        for (id, claim) in claims {
            let owned_here = agents.get(id.as_str()).is_some_and(Agent::is_owned);
            let sent_to = handed_off
                .iter()
                .find(|(_, ids)| ids.contains(&id))
                .map(|(peer, _)| *peer);
            let local = owned_here || sent_to.is_some();
            let senders = claim
                .ghosts
                .iter()
                .chain(claim.handoffs.iter())
                .map(|(t, _)| *t);
            let Some(winner) = senders.clone().chain(local.then_some(me)).min() else {
                continue;
            };
            let contenders = senders.count() + usize::from(local);
            if contenders > 1 {
                report.conflicts += 1;
                warn!(task = %me, agent = %id, winner = %winner, contenders, "ownership conflict settled by task id");
            }

            if winner == me {
                // Incoming handoffs lose and are dropped; ghost owners lose
                // their owned copies.
                revokes.extend(claim.ghosts.into_iter().map(|(t, _)| (t, id.clone())));
                continue;
            }

            if owned_here {
                agents.remove(&id).map_err(|e| SyncError::Malformed {
                    peer: winner,
                    reason: e.to_string(),
                })?;
                report.revoked += 1;
            }
            if let Some(peer) = sent_to.filter(|&peer| peer != winner) {
                revokes.push((peer, id.clone()));
            }
            for (owner, ghost) in claim.ghosts {
                if owner == winner {
                    agents.insert_ghost(ghost, owner).map_err(|e| SyncError::Malformed {
                        peer: owner,
                        reason: e.to_string(),
                    })?;
                } else {
                    revokes.push((owner, id.clone()));
                }
            }
            if let Some((from, agent)) = claim.handoffs.into_iter().find(|(t, _)| *t == winner) {
                self.adopt(from, agent, agents)?;
                report.handoffs_received += 1;
            }
        }
        Ok(revokes)
    }

    /// Take ownership of a handed-off agent, moving it off an occupied cell
    /// when cells are exclusive.
    fn adopt(&self, from: TaskId, agent: Agent, agents: &mut AgentRegistry) -> Result<(), SyncError> {
        let malformed = |e: AgentError| SyncError::Malformed {
            peer: from,
            reason: e.to_string(),
        };
        let id = agent.id().clone();
        let target = agent.position();
        agents.add(agent, true).map_err(malformed)?;
        if self.shared_cells {
            return Ok(());
        }
        let taken = |registry: &AgentRegistry, p: &Point2D| {
            registry
                .agents_at(p, &TypeFilter::All)
                .any(|other| other.id() != &id)
        };
        if !taken(agents, &target) {
            return Ok(());
        }
        match self.nearest_free_cell(target, |p| taken(agents, p)) {
            Some(free) => {
                debug!(task = %self.task(), agent = %id, from = %target, to = %free, "adopted agent moved off occupied cell");
                agents.move_to(&id, free).map_err(malformed)
            }
            None => {
                warn!(task = %self.task(), agent = %id, cell = %target, "owned region saturated, adopted agent shares a cell");
                Ok(())
            }
        }
    }

    /// Closest cell of the owned region, by ring distance around `target`
    /// and then row-major within a ring, for which `taken` is false.
    fn nearest_free_cell(&self, target: Point2D, taken: impl Fn(&Point2D) -> bool) -> Option<Point2D> {
        let owned = self.section.owned();
        let reach = owned.size.width.max(owned.size.height) as i32;
        (1..=reach).find_map(|r| {
            (-r..=r)
                .flat_map(move |dy| (-r..=r).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| dx.abs() == r || dy.abs() == r)
                .map(|(dx, dy)| target.offset(dx, dy))
                .find(|p| owned.contains(p) && !taken(p))
        })
    }

    fn post(&self, to: TaskId, step: StepId, payload: Payload) -> Result<(), SyncError> {
        self.transport.send(
            to,
            Envelope {
                from: self.task(),
                step,
                payload,
            },
        )
    }

    fn expect(&self, from: TaskId, step: StepId) -> Result<Payload, SyncError> {
        let envelope = self.transport.recv(from, step)?;
        if envelope.from != from {
            return Err(SyncError::Malformed {
                peer: from,
                reason: format!("envelope claims sender {}", envelope.from),
            });
        }
        if envelope.step != step {
            return Err(SyncError::StepMismatch {
                peer: from,
                expected: step,
                found: envelope.step,
            });
        }
        Ok(envelope.payload)
    }
}
