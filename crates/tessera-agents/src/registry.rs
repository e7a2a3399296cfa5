//! The per-task agent table and its cell index.

use std::collections::HashMap;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tessera_core::{AgentError, AgentId, Point2D, Rect, TaskId};

use crate::agent::{Agent, AgentSnapshot, Ownership};
use crate::filter::TypeFilter;

/// Slack added to the radius in neighbour searches so that
/// `distance == radius` survives floating-point noise.
pub const NEIGHBOUR_EPSILON: f64 = 1e-4;

/// Owned and ghost agents of one task.
///
/// Iteration order is insertion order, which is also the order owned agents
/// act in. A cell index maps each position to the ids standing on it for
/// exact-cell lookups.
#[derive(Clone, Debug, Default)]
pub struct AgentRegistry {
    agents: IndexMap<AgentId, Agent>,
    cells: HashMap<Point2D, SmallVec<[AgentId; 2]>>,
}

impl AgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, owned and ghost.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of owned records.
    pub fn owned_count(&self) -> usize {
        self.owned().count()
    }

    /// Number of ghost records.
    pub fn ghost_count(&self) -> usize {
        self.ghosts().count()
    }

    // ── Insertion and removal ─────────────────────────────────────

    /// Insert an owned agent.
    ///
    /// A ghost with the same id is replaced in its slot, so insertion stays
    /// O(1) amortized. With `mark_executed` the agent does not act again in
    /// the current step (births during the agent phase, handoffs). Fails if
    /// this task already owns the id.
    pub fn add(&mut self, mut agent: Agent, mark_executed: bool) -> Result<(), AgentError> {
        self.evict_ghost(agent.id())?;
        agent.set_ownership(Ownership::Owned);
        agent.set_executed(mark_executed);
        self.insert(agent);
        Ok(())
    }

    /// Insert or refresh a ghost copy of an agent owned by `owner`.
    ///
    /// Fails if this task owns the id; ownership conflicts are resolved by
    /// the caller before ghosts are merged.
    pub fn insert_ghost(&mut self, mut agent: Agent, owner: TaskId) -> Result<(), AgentError> {
        self.evict_ghost(agent.id())?;
        agent.set_ownership(Ownership::Ghost { owner });
        agent.set_executed(true);
        self.insert(agent);
        Ok(())
    }

    /// Remove a record, keeping the order of the others. O(n) in the
    /// number of records after it.
    pub fn remove(&mut self, id: &AgentId) -> Result<Agent, AgentError> {
        let agent = self
            .agents
            .shift_remove(id)
            .ok_or_else(|| AgentError::NotFound { id: id.clone() })?;
        self.unindex(agent.id(), agent.position());
        Ok(agent)
    }

    /// Drop every record whose existence flag is cleared. Returns the
    /// removed ids in registry order.
    pub fn purge_dead(&mut self) -> Vec<AgentId> {
        let dead: Vec<(AgentId, Point2D)> = self
            .agents
            .values()
            .filter(|a| !a.exists())
            .map(|a| (a.id().clone(), a.position()))
            .collect();
        if dead.is_empty() {
            return Vec::new();
        }
        self.agents.retain(|_, a| a.exists());
        dead.into_iter()
            .map(|(id, pos)| {
                self.unindex(&id, pos);
                id
            })
            .collect()
    }

    // ── Lookup ────────────────────────────────────────────────────

    /// Record for `id`.
    pub fn find(&self, id: &AgentId) -> Result<&Agent, AgentError> {
        self.agents
            .get(id)
            .ok_or_else(|| AgentError::NotFound { id: id.clone() })
    }

    /// Mutable record for `id` (attributes, existence). Ghosts are
    /// read-only and yield [`AgentError::NotOwned`].
    pub fn find_mut(&mut self, id: &AgentId) -> Result<&mut Agent, AgentError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| AgentError::NotFound { id: id.clone() })?;
        match agent.ownership() {
            Ownership::Owned => Ok(agent),
            Ownership::Ghost { owner } => Err(AgentError::NotOwned {
                id: id.clone(),
                owner,
            }),
        }
    }

    /// Record for `id`, if present.
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Whether a record with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Every record in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Owned records in insertion order.
    pub fn owned(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_owned())
    }

    /// Ghost records in insertion order.
    pub fn ghosts(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_ghost())
    }

    /// Ids of owned records in insertion order.
    pub fn owned_ids(&self) -> Vec<AgentId> {
        self.owned().map(|a| a.id().clone()).collect()
    }

    /// Live owned agents standing inside `area`.
    pub fn owned_in<'a>(&'a self, area: &'a Rect) -> impl Iterator<Item = &'a Agent> + 'a {
        self.owned()
            .filter(move |a| a.exists() && area.contains(&a.position()))
    }

    /// Owned snapshots for serializers, in insertion order.
    pub fn snapshot_owned(&self) -> Vec<AgentSnapshot> {
        self.owned()
            .filter(|a| a.exists())
            .map(Agent::snapshot)
            .collect()
    }

    // ── Mutation ──────────────────────────────────────────────────

    /// Move an owned agent to `position`.
    pub fn move_to(&mut self, id: &AgentId, position: Point2D) -> Result<(), AgentError> {
        let agent = self.find_mut(id)?;
        let from = agent.position();
        if from == position {
            return Ok(());
        }
        agent.set_position(position);
        self.unindex(id, from);
        self.cells.entry(position).or_default().push(id.clone());
        Ok(())
    }

    /// Turn an owned agent into a ghost of `owner` (after handing it off).
    pub fn demote(&mut self, id: &AgentId, owner: TaskId) -> Result<(), AgentError> {
        let agent = self.find_mut(id)?;
        agent.set_ownership(Ownership::Ghost { owner });
        agent.set_executed(true);
        Ok(())
    }

    /// Drop ghosts owned by `owner`, except those for which `keep` holds.
    /// Returns how many were dropped.
    pub fn remove_ghosts_of(&mut self, owner: TaskId, keep: impl Fn(&AgentId) -> bool) -> usize {
        let doomed: Vec<(AgentId, Point2D)> = self
            .agents
            .values()
            .filter(|a| a.ownership() == Ownership::Ghost { owner } && !keep(a.id()))
            .map(|a| (a.id().clone(), a.position()))
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        self.agents
            .retain(|id, a| a.ownership() != Ownership::Ghost { owner } || keep(id));
        for (id, pos) in &doomed {
            self.unindex(id, *pos);
        }
        doomed.len()
    }

    /// Clear the executed flag of every owned agent.
    pub fn reset_executed(&mut self) {
        for agent in self.agents.values_mut().filter(|a| a.is_owned()) {
            agent.set_executed(false);
        }
    }

    /// Flag an owned agent as having acted this step.
    pub fn mark_executed(&mut self, id: &AgentId) -> Result<(), AgentError> {
        self.find_mut(id)?.set_executed(true);
        Ok(())
    }

    // ── Spatial queries ───────────────────────────────────────────

    /// Live agents (owned or ghost) within `radius` of `center` whose type
    /// passes `filter`, in registry order. `exclude` skips one id.
    ///
    /// Candidates come from the cell index over the square that bounds the
    /// search circle; when that square has more cells than the registry has
    /// records, the table is scanned instead.
    pub fn query_point<'a, 'f>(
        &'a self,
        center: Point2D,
        radius: f64,
        filter: &'f TypeFilter,
        exclude: Option<&'f AgentId>,
    ) -> impl Iterator<Item = &'a Agent> + 'f
    where
        'a: 'f,
    {
        self.candidates(center, radius)
            .into_iter()
            .filter_map(move |index| self.agents.get_index(index).map(|(_, a)| a))
            .filter(move |a| {
                a.exists()
                    && Some(a.id()) != exclude
                    && filter.matches(a.kind())
                    && a.position().distance(&center) - radius <= NEIGHBOUR_EPSILON
            })
    }

    /// Table indices of the records that may lie within `radius` of
    /// `center`, ascending.
    fn candidates(&self, center: Point2D, radius: f64) -> Vec<usize> {
        let reach = (radius + NEIGHBOUR_EPSILON).floor();
        if reach.is_nan() || reach < 0.0 {
            return Vec::new();
        }
        let side = 2.0 * reach + 1.0;
        if side * side >= self.agents.len() as f64 {
            return (0..self.agents.len()).collect();
        }
        let reach = reach as i32;
        let mut found = Vec::new();
        for y in center.y.saturating_sub(reach)..=center.y.saturating_add(reach) {
            for x in center.x.saturating_sub(reach)..=center.x.saturating_add(reach) {
                if let Some(ids) = self.cells.get(&Point2D::new(x, y)) {
                    found.extend(ids.iter().filter_map(|id| self.agents.get_index_of(id)));
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// Lazy neighbour search around an agent, excluding the agent itself.
    ///
    /// Count and collect are terminal operations on this one traversal; see
    /// [`count_neighbours`](Self::count_neighbours) and
    /// [`neighbours`](Self::neighbours). The registry cannot be mutated while
    /// the iterator is alive.
    pub fn neighbours_iter<'a, 'f>(
        &'a self,
        center: &AgentId,
        radius: f64,
        filter: &'f TypeFilter,
    ) -> Result<impl Iterator<Item = &'a Agent> + 'f, AgentError>
    where
        'a: 'f,
    {
        let agent = self.find(center)?;
        Ok(self.query_point(agent.position(), radius, filter, Some(agent.id())))
    }

    /// Number of neighbours of `center`.
    pub fn count_neighbours(
        &self,
        center: &AgentId,
        radius: f64,
        filter: &TypeFilter,
    ) -> Result<usize, AgentError> {
        Ok(self.neighbours_iter(center, radius, filter)?.count())
    }

    /// Neighbours of `center`, in registry order.
    pub fn neighbours<'a>(
        &'a self,
        center: &AgentId,
        radius: f64,
        filter: &TypeFilter,
    ) -> Result<Vec<&'a Agent>, AgentError> {
        Ok(self.neighbours_iter(center, radius, filter)?.collect())
    }

    /// Live agents standing exactly on `position`.
    pub fn agents_at<'a, 'f>(
        &'a self,
        position: &Point2D,
        filter: &'f TypeFilter,
    ) -> impl Iterator<Item = &'a Agent> + 'f
    where
        'a: 'f,
    {
        self.cells
            .get(position)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.agents.get(id))
            .filter(move |a| a.exists() && filter.matches(a.kind()))
    }

    /// `true` if a live agent (owned or ghost) stands on `position`.
    pub fn is_occupied(&self, position: &Point2D) -> bool {
        self.cells.get(position).is_some_and(|ids| {
            ids.iter()
                .any(|id| self.agents.get(id).is_some_and(Agent::exists))
        })
    }

    // ── Index maintenance ─────────────────────────────────────────

    /// Drop the index entry of a same-id ghost about to be replaced. Fails
    /// if the id is owned here.
    fn evict_ghost(&mut self, id: &AgentId) -> Result<(), AgentError> {
        let Some(existing) = self.agents.get(id) else {
            return Ok(());
        };
        if existing.is_owned() {
            return Err(AgentError::DuplicateId { id: id.clone() });
        }
        let position = existing.position();
        self.unindex(id, position);
        Ok(())
    }

    /// Index `agent` and store it, in the slot of any record with the same
    /// id or else at the end.
    fn insert(&mut self, agent: Agent) {
        self.cells
            .entry(agent.position())
            .or_default()
            .push(agent.id().clone());
        self.agents.insert(agent.id().clone(), agent);
    }

    fn unindex(&mut self, id: &AgentId, position: Point2D) {
        if let Some(ids) = self.cells.get_mut(&position) {
            ids.retain(|other| other != id);
            if ids.is_empty() {
                self.cells.remove(&position);
            }
        }
    }
}
