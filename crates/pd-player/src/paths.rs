//! Committed detours.
//!
//! When a direct step fails the control loop routes around the obstacle and
//! caches the detour under the intention it serves, together with the
//! bottleneck of the static route.  The detour stays valid only while some
//! visible agent still sits inside that bottleneck; once the corridor clears
//! the agent goes back to the (shorter) static route.
//!
//! Targets for which no detour exists are remembered as blocked until the
//! occupied set changes.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use pd_core::{Direction, Intention, Position};

#[derive(Clone, Debug)]
pub struct CommittedPath {
    /// Tile the next step starts from.
    pub at:         Position,
    pub steps:      VecDeque<Direction>,
    pub bottleneck: FxHashSet<Position>,
}

impl CommittedPath {
    pub fn new(at: Position, steps: Vec<Direction>, bottleneck: FxHashSet<Position>) -> Self {
        Self { at, steps: steps.into(), bottleneck }
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.steps.len() as u32
    }
}

#[derive(Default)]
pub struct PathCache {
    paths:   FxHashMap<Intention, CommittedPath>,
    blocked: FxHashSet<Position>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, intention: &Intention) -> Option<&CommittedPath> {
        self.paths.get(intention)
    }

    pub fn insert(&mut self, intention: Intention, path: CommittedPath) {
        log::debug!(
            "committed {}-step detour for {intention} ({} bottleneck tiles)",
            path.remaining(),
            path.bottleneck.len()
        );
        self.paths.insert(intention, path);
    }

    pub fn remove(&mut self, intention: &Intention) -> Option<CommittedPath> {
        self.paths.remove(intention)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Steps left on the detour for `intention`, if one is committed and
    /// starts where the agent stands.
    pub fn remaining_from(&self, intention: &Intention, pos: Position) -> Option<u32> {
        self.paths
            .get(intention)
            .filter(|p| p.at == pos)
            .map(CommittedPath::remaining)
    }

    /// Next direction of the detour for `intention`, if the agent is where
    /// the detour expects it to be.
    pub fn next_step(&self, intention: &Intention, pos: Position) -> Option<Direction> {
        self.paths
            .get(intention)
            .filter(|p| p.at == pos)
            .and_then(|p| p.steps.front().copied())
    }

    /// Consume the step just taken.  An exhausted detour is dropped.
    pub fn advance(&mut self, intention: &Intention) {
        let Some(path) = self.paths.get_mut(intention) else {
            return;
        };
        if let Some(dir) = path.steps.pop_front() {
            path.at = path.at.step(dir);
        }
        if path.steps.is_empty() {
            self.paths.remove(intention);
        }
    }

    // ── Blocked targets ───────────────────────────────────────────────────

    pub fn mark_blocked(&mut self, target: Position) {
        if self.blocked.insert(target) {
            log::warn!("no route to {target} around current obstacles");
        }
    }

    #[inline]
    pub fn is_blocked(&self, target: Position) -> bool {
        self.blocked.contains(&target)
    }

    pub fn blocked(&self) -> &FxHashSet<Position> {
        &self.blocked
    }

    /// React to a new occupied set: unblock every target and keep only the
    /// detours whose bottleneck is still obstructed.
    pub fn occupied_changed(&mut self, occupied: &FxHashSet<Position>) {
        self.blocked.clear();
        let before = self.paths.len();
        self.paths
            .retain(|_, p| p.bottleneck.iter().any(|tile| occupied.contains(tile)));
        if self.paths.len() != before {
            log::debug!("dropped {} detours with a cleared bottleneck", before - self.paths.len());
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.blocked.clear();
    }
}
