//! Teammate roster.
//!
//! Every mutation refreshes the mate's `last_heard`, since each one is
//! triggered by an inbound message from that mate.

use rustc_hash::FxHashMap;

use pd_core::{AgentId, Intention, Position, Timestamp};

use crate::{BeliefError, BeliefResult};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamMate {
    pub id:         AgentId,
    pub position:   Option<Position>,
    pub last_heard: Timestamp,
    /// Last reported `(intention, utility)` list.
    pub intentions: Vec<(Intention, f64)>,
    /// Set while the mate is handing its parcels over to another teammate.
    pub ignore:     bool,
}

impl TeamMate {
    pub fn new(id: AgentId, now: Timestamp) -> Self {
        Self { id, position: None, last_heard: now, intentions: Vec::new(), ignore: false }
    }

    /// Heard from within `timeout_ms` and not shedding its parcels.
    pub fn is_active(&self, now: Timestamp, timeout_ms: u64) -> bool {
        !self.ignore && now.since(self.last_heard) <= timeout_ms
    }
}

#[derive(Default)]
pub struct TeamRoster {
    mates: FxHashMap<AgentId, TeamMate>,
}

impl TeamRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mates.is_empty()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.mates.contains_key(id)
    }

    /// Add a mate.  Returns `false` if it was already on the roster.
    pub fn add(&mut self, id: AgentId, now: Timestamp) -> bool {
        if let Some(mate) = self.mates.get_mut(&id) {
            mate.last_heard = mate.last_heard.max(now);
            return false;
        }
        self.mates.insert(id.clone(), TeamMate::new(id, now));
        true
    }

    pub fn remove(&mut self, id: &AgentId) -> BeliefResult<TeamMate> {
        self.mates
            .remove(id)
            .ok_or_else(|| BeliefError::TeamMateNotFound(id.clone()))
    }

    pub fn get(&self, id: &AgentId) -> BeliefResult<&TeamMate> {
        self.mates
            .get(id)
            .ok_or_else(|| BeliefError::TeamMateNotFound(id.clone()))
    }

    fn touch(&mut self, id: &AgentId, now: Timestamp) -> BeliefResult<&mut TeamMate> {
        let mate = self
            .mates
            .get_mut(id)
            .ok_or_else(|| BeliefError::TeamMateNotFound(id.clone()))?;
        mate.last_heard = mate.last_heard.max(now);
        Ok(mate)
    }

    pub fn record_activity(&mut self, id: &AgentId, now: Timestamp) -> BeliefResult<()> {
        self.touch(id, now).map(|_| ())
    }

    pub fn update_position(&mut self, id: &AgentId, pos: Position, now: Timestamp) -> BeliefResult<()> {
        self.touch(id, now)?.position = Some(pos);
        Ok(())
    }

    pub fn update_intentions(
        &mut self,
        id:         &AgentId,
        intentions: Vec<(Intention, f64)>,
        now:        Timestamp,
    ) -> BeliefResult<()> {
        self.touch(id, now)?.intentions = intentions;
        Ok(())
    }

    pub fn set_ignore(&mut self, id: &AgentId, ignore: bool, now: Timestamp) -> BeliefResult<()> {
        self.touch(id, now)?.ignore = ignore;
        Ok(())
    }

    /// All mates, sorted by id so callers iterate deterministically.
    pub fn mates(&self) -> Vec<&TeamMate> {
        let mut out: Vec<&TeamMate> = self.mates.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Mates that take part in assignment at `now`, sorted by id.
    pub fn active(&self, now: Timestamp, timeout_ms: u64) -> Vec<&TeamMate> {
        let mut out = self.mates();
        out.retain(|m| m.is_active(now, timeout_ms));
        out
    }
}
