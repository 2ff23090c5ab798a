//! The anytime MCTS planner.
//!
//! # Iteration
//!
//! ```text
//! node = root
//! while node is not terminal:
//!     node = select_child(node)      # expand next candidate, else UCT
//! backtrack(node)
//! ```
//!
//! Expansion is not random: each node sorts its candidates once, by a
//! greedy one-step value estimate, and expands them best first.  Once every
//! candidate has a child the node falls back to UCT:
//!
//! ```text
//! exploit(c) = c.utility(c.arrival) / c.visits / c.upper_bound
//! uct(c)     = exploit(c) + C · sqrt(ln(parent.visits) / c.visits)
//! ```
//!
//! # Rewards
//!
//! Only putdown nodes earn a reward.  Backtracking folds it into the
//! utility passed upward with `Utility::combine`, so every ancestor sees
//! the delivery valued at its own arrival instant.

use std::sync::Arc;

use pd_core::{AgentConfig, DecayingValue, Intention, ParcelId, Position, Timestamp, Utility};
use pd_spatial::DistanceEngine;

use crate::scheduler::StopToken;
use crate::snapshot::WorldSnapshot;
use crate::tree::{Node, NodeId, Tree};
use crate::{PlannerError, PlannerResult};

/// Search state rooted at the agent's current situation.
struct Search {
    tree:     Tree,
    snapshot: Arc<WorldSnapshot>,
}

pub struct Planner {
    engine: Arc<DistanceEngine>,
    config: AgentConfig,
    search: Option<Search>,
    stop:   StopToken,
}

impl Planner {
    pub fn new(engine: Arc<DistanceEngine>, config: &AgentConfig) -> Self {
        Self { engine, config: config.clone(), search: None, stop: StopToken::new() }
    }

    pub fn is_started(&self) -> bool {
        self.search.is_some()
    }

    /// Token observed by [`run`](Self::run) between iterations.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Seed the tree at `position`.  The synthetic root behaves as if the
    /// agent had just delivered, so only pickups are initially available.
    pub fn start(&mut self, position: Position, now: Timestamp, snapshot: WorldSnapshot) {
        self.stop.reset();
        self.seed(Intention::putdown(position), position, Vec::new(), now, snapshot);
        log::debug!("planner started at {position} with {} parcel tiles", self.available_len());
    }

    /// Rebuild the tree below the current root state against a new parcel
    /// snapshot.  The root keeps its position and executed intention;
    /// `carried` replaces whatever the root thought it was carrying.
    pub fn refresh(
        &mut self,
        snapshot: WorldSnapshot,
        carried:  Vec<(ParcelId, DecayingValue)>,
        now:      Timestamp,
    ) -> PlannerResult<()> {
        let search = self.search.as_ref().ok_or(PlannerError::NotStarted)?;
        let root = search.tree.node(search.tree.root());
        let (intention, position) = (root.intention, root.position);
        self.seed(intention, position, carried, now, snapshot);
        log::debug!("planner refreshed at {position}: {} parcel tiles", self.available_len());
        Ok(())
    }

    /// Ask [`run`](Self::run) to return at the next iteration boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    fn seed(
        &mut self,
        intention: Intention,
        position:  Position,
        carried:   Vec<(ParcelId, DecayingValue)>,
        now:       Timestamp,
        snapshot:  WorldSnapshot,
    ) {
        let snapshot = Arc::new(snapshot);
        let available = snapshot.positions();
        let root = self.make_node(&snapshot, intention, position, carried, available, now, 0.0, Vec::new());
        self.search = Some(Search { tree: Tree::new(root), snapshot });
    }

    fn available_len(&self) -> usize {
        self.search
            .as_ref()
            .map_or(0, |s| s.tree.node(s.tree.root()).available.len())
    }

    // ── Iteration ─────────────────────────────────────────────────────────

    /// One descent to a terminal node plus backtrack.
    pub fn run_iteration(&mut self) -> PlannerResult<()> {
        let cap = self.config.max_tree_nodes;
        let search = self.search.as_mut().ok_or(PlannerError::NotStarted)?;
        if search.tree.arena_len() >= cap {
            let reclaimed = search.tree.compact();
            if reclaimed > 0 {
                log::debug!("planner compacted tree: {reclaimed} nodes reclaimed");
            }
        }
        let can_expand = search.tree.arena_len() < cap;

        let mut cur = search.tree.root();
        let mut depth = 0usize;
        loop {
            let node = self.tree()?.node(cur);
            if node.is_terminal() || (!can_expand && !node.is_fully_expanded()) {
                break;
            }
            cur = self.select_child(cur)?;
            depth += 1;
        }
        self.backtrack(cur)?;
        log::trace!("planner iteration: depth {depth}");
        Ok(())
    }

    /// Run up to `quantum` iterations, checking the stop token before each.
    /// Returns how many ran.
    pub fn run(&mut self, quantum: usize) -> PlannerResult<usize> {
        if self.search.is_none() {
            return Err(PlannerError::NotStarted);
        }
        let mut done = 0;
        while done < quantum && !self.stop.is_stopped() {
            self.run_iteration()?;
            done += 1;
        }
        Ok(done)
    }

    /// Expand the next candidate of `id` if any remain, else pick the best
    /// child by UCT.
    fn select_child(&mut self, id: NodeId) -> PlannerResult<NodeId> {
        let uct_c = self.config.uct_constant;
        let search = self.search.as_ref().ok_or(PlannerError::NotStarted)?;
        let node = search.tree.node(id);
        if node.is_terminal() {
            return Err(PlannerError::TerminalNode);
        }

        if let Some(&intention) = node.candidates.last() {
            let parent = node;
            let travel = self
                .engine
                .distance_if_possible(parent.position, intention.target)
                .unwrap_or(0);
            let arrival = parent.arrival.offset(self.config.travel_ms(travel));
            let mut available = parent.available.clone();
            let mut carried = parent.carried.clone();
            let mut reward = 0.0;
            let mut reward_parcels = Vec::new();
            if intention.is_pickup() {
                available.retain(|&p| p != intention.target);
                carried.extend(search.snapshot.parcels_at(intention.target).iter().cloned());
            } else if intention.is_putdown() {
                reward = carried.iter().map(|(_, v)| v.value_at(arrival)).sum();
                reward_parcels = std::mem::take(&mut carried);
            }
            let snapshot = Arc::clone(&search.snapshot);
            let child = self.make_node(
                &snapshot,
                intention,
                intention.target,
                carried,
                available,
                arrival,
                reward,
                reward_parcels,
            );
            let search = self.search.as_mut().ok_or(PlannerError::NotStarted)?;
            search.tree.node_mut(id).candidates.pop();
            return Ok(search.tree.add_child(id, child));
        }

        let parent_visits = node.visits.max(1) as f64;
        let ln_n = parent_visits.ln();
        let mut best: Option<(f64, NodeId)> = None;
        for &c in &node.children {
            let child = search.tree.node(c);
            if child.visits == 0 {
                return Ok(c);
            }
            let n = child.visits as f64;
            let exploit = if child.upper_bound > 0.0 {
                child.utility.value_at(child.arrival) / n / child.upper_bound
            } else {
                0.0
            };
            let score = exploit + uct_c * (ln_n / n).sqrt();
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, c));
            }
        }
        best.map(|(_, c)| c).ok_or(PlannerError::TerminalNode)
    }

    /// Propagate a finished rollout from `leaf` to the root.
    fn backtrack(&mut self, leaf: NodeId) -> PlannerResult<()> {
        let search = self.search.as_mut().ok_or(PlannerError::NotStarted)?;
        let tree = &mut search.tree;
        let mut incoming = Utility::zero(tree.node(leaf).arrival);
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let node = tree.node_mut(id);
            if node.intention.is_putdown() {
                incoming = incoming.combine(node.reward, node.reward_parcels.iter().cloned(), node.arrival);
            }
            node.utility.accumulate(&incoming);
            node.visits += 1;
            cur = node.parent;
        }
        Ok(())
    }

    // ── Node construction ─────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn make_node(
        &self,
        snapshot:       &WorldSnapshot,
        intention:      Intention,
        position:       Position,
        carried:        Vec<(ParcelId, DecayingValue)>,
        available:      Vec<Position>,
        arrival:        Timestamp,
        reward:         f64,
        reward_parcels: Vec<(ParcelId, DecayingValue)>,
    ) -> Node {
        let carried_value = |t: Timestamp| -> f64 { carried.iter().map(|(_, v)| v.value_at(t)).sum() };

        // (estimate, intention); sorted ascending so the best pops first.
        let mut scored: Vec<(f64, Intention)> = Vec::new();
        let mut reachable_value = 0.0;
        for &target in &available {
            let Some(d) = self.engine.distance_if_possible(position, target) else {
                continue;
            };
            let at = arrival.offset(self.config.travel_ms(d));
            let value = snapshot.value_at(target, at);
            if value <= 0.0 {
                continue;
            }
            reachable_value += snapshot.value_at(target, arrival);
            let estimate = match self.engine.closest_delivery_with_distance(target) {
                Some((_, back)) => {
                    let delivered_at = at.offset(self.config.travel_ms(back));
                    snapshot.value_at(target, delivered_at) + carried_value(delivered_at)
                }
                None => 0.0,
            };
            scored.push((estimate, Intention::pickup(target)));
        }

        if !intention.is_putdown() || !carried.is_empty() {
            if let Some((delivery, d)) = self.engine.closest_delivery_with_distance(position) {
                let at = arrival.offset(self.config.travel_ms(d));
                scored.push((carried_value(at), Intention::putdown(delivery)));
            }
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        let upper_bound = reward + carried_value(arrival) + reachable_value;

        Node {
            intention,
            position,
            carried,
            arrival,
            available,
            candidates: scored.into_iter().map(|(_, i)| i).collect(),
            children: Vec::new(),
            parent: None,
            visits: 0,
            utility: Utility::zero(arrival),
            reward,
            reward_parcels,
            upper_bound,
        }
    }

    // ── Root control ──────────────────────────────────────────────────────

    /// Overwrite the root's position as the real agent moves.
    pub fn update_position(&mut self, position: Position) -> PlannerResult<()> {
        let search = self.search.as_mut().ok_or(PlannerError::NotStarted)?;
        let root = search.tree.root();
        search.tree.node_mut(root).position = position;
        Ok(())
    }

    /// Promote the root's child for `intention` to root and discard its
    /// siblings.
    pub fn execute_intention(&mut self, intention: &Intention) -> PlannerResult<()> {
        let cap = self.config.max_tree_nodes;
        let search = self.search.as_mut().ok_or(PlannerError::NotStarted)?;
        let root = search.tree.root();
        let child = search
            .tree
            .children(root)
            .iter()
            .copied()
            .find(|&c| search.tree.node(c).intention == *intention)
            .ok_or(PlannerError::IntentionNotFound(*intention))?;
        search.tree.reroot(child);
        if search.tree.arena_len() >= cap {
            let reclaimed = search.tree.compact();
            log::debug!("planner compacted tree: {reclaimed} nodes reclaimed");
        }
        log::debug!("planner re-rooted on {intention}");
        Ok(())
    }

    /// `(intention, utility)` for every child of the root, best first.  Each
    /// utility is the child's accumulated utility replayed at the instant the
    /// agent would arrive there if it left at `now`.  It is a total over the
    /// child's visits, so better-explored children weigh more.
    pub fn compute_intention_utilities(&self, now: Timestamp) -> PlannerResult<Vec<(Intention, f64)>> {
        self.compute_intention_utilities_with(now, |_, steps| steps)
    }

    /// Like [`compute_intention_utilities`](Self::compute_intention_utilities)
    /// with the travel distance overridden.  `travel(intention, static_steps)`
    /// returns the steps actually needed, e.g. along a committed detour.
    pub fn compute_intention_utilities_with<F>(
        &self,
        now:    Timestamp,
        travel: F,
    ) -> PlannerResult<Vec<(Intention, f64)>>
    where
        F: Fn(&Intention, u32) -> u32,
    {
        let search = self.search.as_ref().ok_or(PlannerError::NotStarted)?;
        let tree = &search.tree;
        let root = tree.node(tree.root());
        let mut out: Vec<(Intention, f64)> = Vec::with_capacity(root.children.len());
        for &c in &root.children {
            let child = tree.node(c);
            let Some(d) = self.engine.distance_if_possible(root.position, child.position) else {
                continue;
            };
            let steps = travel(&child.intention, d);
            let arrival = now.offset(self.config.travel_ms(steps));
            out.push((child.intention, child.utility.value_at(arrival)));
        }
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn tree(&self) -> PlannerResult<&Tree> {
        self.search.as_ref().map(|s| &s.tree).ok_or(PlannerError::NotStarted)
    }

    pub fn root(&self) -> PlannerResult<&Node> {
        let tree = self.tree()?;
        Ok(tree.node(tree.root()))
    }

    pub fn snapshot(&self) -> PlannerResult<&WorldSnapshot> {
        self.search.as_ref().map(|s| s.snapshot.as_ref()).ok_or(PlannerError::NotStarted)
    }
}
