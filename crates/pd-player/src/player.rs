//! The per-agent control loop.
//!
//! # One tick
//!
//! ```text
//! ① Snapshot own position; sweep expired parcels if due.
//! ② Think:   start the planner once enough parcels are known (plus
//!            warm-up), refresh it after parcel changes, run one quantum.
//! ③ Decide:  adjust own utilities, gossip them, solve the team
//!            assignment.  A positive assignment for self is adopted;
//!            otherwise fall back to exploring or handing parcels over.
//! ④ Act:     pick up / put down on target, else step toward it, routing
//!            around obstacles when the direct step is refused.
//! ```
//!
//! Sensing and team messages arrive between ticks through the `on_*` and
//! [`handle_message`](Player::handle_message) entry points.

use rustc_hash::{FxHashMap, FxHashSet};

use pd_belief::{
    AgentObservation, BeliefObserver, BeliefSet, Parcel, ParcelChanges, ParcelObservation,
};
use pd_core::{
    AgentConfig, AgentId, AgentRng, DecayingValue, Intention, IntentionKind, ParcelId, Position,
    Timestamp,
};
use pd_planner::{Planner, Scheduler, StopToken, WorldSnapshot};

use crate::assignment::assign_max;
use crate::collab::{Actuators, IdentityVerifier, Messenger};
use crate::discount::DiscountFactors;
use crate::message::{Envelope, TeamMessage};
use crate::observer::{Action, Decision, PlayerObserver};
use crate::paths::{CommittedPath, PathCache};
use crate::PlayerResult;

// ── Belief listener ───────────────────────────────────────────────────────────

/// Routes belief notifications into the player's own state.  Built on the
/// fly from disjoint field borrows so the belief set can be updated at the
/// same time.
struct Listener<'a> {
    paths:         &'a mut PathCache,
    parcels_dirty: &'a mut bool,
}

impl<'a> Listener<'a> {
    fn new(paths: &'a mut PathCache, parcels_dirty: &'a mut bool) -> Self {
        Self { paths, parcels_dirty }
    }
}

impl BeliefObserver for Listener<'_> {
    fn on_parcels_changed(&mut self, changes: &ParcelChanges) {
        log::trace!("{} parcel changes pending planner refresh", changes.len());
        *self.parcels_dirty = true;
    }

    fn on_occupied_positions_changed(&mut self, occupied: &FxHashSet<Position>) {
        self.paths.occupied_changed(occupied);
    }
}

#[inline]
fn per_visit(total: f64, visits: u32) -> f64 {
    if visits == 0 { 0.0 } else { total / visits as f64 }
}

// ── Player ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Mode {
    Plan,
    /// Carrying parcels toward a teammate to hand them over.
    Follow(AgentId),
}

/// One agent's decision engine.  Build with
/// [`PlayerBuilder`][crate::PlayerBuilder].
pub struct Player {
    pub(crate) id:            AgentId,
    pub(crate) config:        AgentConfig,
    pub(crate) belief:        BeliefSet,
    pub(crate) planner:       Planner,
    pub(crate) scheduler:     Scheduler,
    pub(crate) paths:         PathCache,
    pub(crate) discounts:     DiscountFactors,
    pub(crate) rng:           AgentRng,
    pub(crate) verifier:      Box<dyn IdentityVerifier>,
    pub(crate) position:      Option<Position>,
    pub(crate) carried:       Vec<(ParcelId, DecayingValue)>,
    /// Exploration target kept across ticks until reached or adopted over.
    pub(crate) pending_move:  Option<Position>,
    pub(crate) parcels_dirty: bool,
    /// Latest accepted send time per teammate.
    pub(crate) inbox_clock:   FxHashMap<AgentId, Timestamp>,
    mode:                     Mode,
}

impl Player {
    pub(crate) fn assemble(
        id:        AgentId,
        config:    AgentConfig,
        belief:    BeliefSet,
        planner:   Planner,
        verifier:  Box<dyn IdentityVerifier>,
        position:  Option<Position>,
    ) -> Self {
        Self {
            scheduler:     Scheduler::new(config.iterations_per_tick),
            discounts:     DiscountFactors::new(&config),
            rng:           AgentRng::new(config.seed, &id),
            paths:         PathCache::new(),
            carried:       Vec::new(),
            pending_move:  None,
            parcels_dirty: false,
            inbox_clock:   FxHashMap::default(),
            mode:          Mode::Plan,
            id,
            config,
            belief,
            planner,
            verifier,
            position,
        }
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn belief(&self) -> &BeliefSet {
        &self.belief
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn carried(&self) -> &[(ParcelId, DecayingValue)] {
        &self.carried
    }

    pub fn paths(&self) -> &PathCache {
        &self.paths
    }

    pub fn discounts(&self) -> &DiscountFactors {
        &self.discounts
    }

    /// Handing parcels over to this teammate.
    pub fn following(&self) -> Option<&AgentId> {
        match &self.mode {
            Mode::Follow(leader) => Some(leader),
            Mode::Plan => None,
        }
    }

    /// Token that stops the planner at its next iteration boundary.
    pub fn stop_token(&self) -> StopToken {
        self.planner.stop_token()
    }

    pub fn stop(&self) {
        self.planner.stop();
    }

    // ── Sensors ───────────────────────────────────────────────────────────

    /// The server moved us (or confirmed a move).
    pub fn on_position_update(
        &mut self,
        pos:       Position,
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<()> {
        self.set_position(pos)?;
        self.send_team(messenger, now, TeamMessage::Position(pos));
        Ok(())
    }

    /// Own parcel sensing.  Ignored until our position is known, since
    /// vanished parcels are judged against the sensing range around it.
    pub fn on_parcel_sensing(
        &mut self,
        parcels:   &[ParcelObservation],
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) {
        let Some(pos) = self.position else {
            return;
        };
        let mut listener = Listener::new(&mut self.paths, &mut self.parcels_dirty);
        self.belief.update_parcels(parcels, pos, now, &mut listener);
        self.send_team(
            messenger,
            now,
            TeamMessage::ParcelSensing { reporter: pos, parcels: parcels.to_vec() },
        );
    }

    /// Own agent sensing.
    pub fn on_agent_sensing(
        &mut self,
        agents:    &[AgentObservation],
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) {
        let mut listener = Listener::new(&mut self.paths, &mut self.parcels_dirty);
        self.belief.update_agents(agents, &self.id, now, &mut listener);
        self.send_team(messenger, now, TeamMessage::AgentSensing(agents.to_vec()));
    }

    // ── Team traffic ──────────────────────────────────────────────────────

    /// Broadcast a `Hello` so teammates add us to their roster.
    pub fn announce(&self, now: Timestamp, messenger: &mut impl Messenger) {
        let proof = self.verifier.proof_for(&self.id);
        messenger.broadcast(Envelope::new(self.id.clone(), now, TeamMessage::Hello { proof }));
    }

    /// Apply one inbound team message.
    ///
    /// Messages from agents not on the roster are ignored (except `Hello`),
    /// and so are messages older than the last one accepted from the same
    /// sender.
    pub fn handle_message(
        &mut self,
        envelope:  Envelope,
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<()> {
        let Envelope { sender, sent_at, message } = envelope;
        if sender == self.id {
            return Ok(());
        }
        if self.inbox_clock.get(&sender).is_some_and(|&last| sent_at < last) {
            log::trace!("{}: stale {} from {sender} dropped", self.id, message.kind());
            return Ok(());
        }

        if let TeamMessage::Hello { proof } = &message {
            return self.accept_hello(sender, proof, sent_at, now, messenger);
        }
        if !self.belief.is_teammate(&sender) {
            log::debug!("{}: {} from unknown agent {sender} ignored", self.id, message.kind());
            return Ok(());
        }
        self.inbox_clock.insert(sender.clone(), sent_at);

        let mut listener = Listener::new(&mut self.paths, &mut self.parcels_dirty);
        match message {
            TeamMessage::Hello { .. } => {}
            TeamMessage::Position(pos) => {
                self.belief.update_teammate_position(&sender, pos, now, &mut listener)?;
            }
            TeamMessage::ParcelSensing { reporter, parcels } => {
                self.belief.record_teammate_activity(&sender, now)?;
                self.belief.update_parcels(&parcels, reporter, now, &mut listener);
            }
            TeamMessage::AgentSensing(agents) => {
                self.belief.record_teammate_activity(&sender, now)?;
                self.belief.update_agents(&agents, &sender, sent_at, &mut listener);
            }
            TeamMessage::Intentions(list) => {
                self.belief.update_teammate_intentions(&sender, list, now)?;
            }
            TeamMessage::IgnoreMe(flag) => {
                log::debug!("{}: {sender} ignore-me = {flag}", self.id);
                self.belief.set_teammate_ignore(&sender, flag, now)?;
            }
        }
        Ok(())
    }

    fn accept_hello(
        &mut self,
        sender:    AgentId,
        proof:     &str,
        sent_at:   Timestamp,
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<()> {
        if !self.verifier.verify(&sender, proof) {
            log::warn!("{}: hello from {sender} failed verification", self.id);
            return Ok(());
        }
        self.inbox_clock.insert(sender.clone(), sent_at);
        if !self.belief.add_teammate(sender.clone(), now) {
            self.belief.record_teammate_activity(&sender, now)?;
            return Ok(());
        }
        // Answer so the newcomer learns about us too.
        let proof = self.verifier.proof_for(&self.id);
        messenger.send(&sender, Envelope::new(self.id.clone(), now, TeamMessage::Hello { proof }));
        if let Some(pos) = self.position {
            messenger.send(&sender, Envelope::new(self.id.clone(), now, TeamMessage::Position(pos)));
        }
        Ok(())
    }

    fn send_team(&self, messenger: &mut impl Messenger, now: Timestamp, message: TeamMessage) {
        for mate in self.belief.team().mates() {
            messenger.send(&mate.id, Envelope::new(self.id.clone(), now, message.clone()));
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Run one control step.
    pub fn tick<A, M, O>(
        &mut self,
        now:       Timestamp,
        actuators: &mut A,
        messenger: &mut M,
        observer:  &mut O,
    ) -> PlayerResult<Decision>
    where
        A: Actuators,
        M: Messenger,
        O: PlayerObserver,
    {
        observer.on_tick_start(&self.id, now);

        let Some(pos) = self.position else {
            observer.on_decision(&self.id, now, &Decision::Idle);
            observer.on_tick_end(&self.id, now, 0);
            return Ok(Decision::Idle);
        };

        {
            let mut listener = Listener::new(&mut self.paths, &mut self.parcels_dirty);
            self.belief.purge_if_due(now, &mut listener);
        }
        let parcels = self.belief.parcels();
        self.discounts.retain(|id| parcels.contains(id));

        let iterations = self.think(pos, now)?;

        let decision = self.decide(pos, now, messenger)?;
        observer.on_decision(&self.id, now, &decision);

        let action = self.act(&decision, pos, now, actuators, messenger)?;
        observer.on_action(&self.id, now, &action);

        observer.on_tick_end(&self.id, now, iterations);
        Ok(decision)
    }

    // ── ② Think ───────────────────────────────────────────────────────────

    fn think(&mut self, pos: Position, now: Timestamp) -> PlayerResult<usize> {
        if !self.planner.is_started() {
            if self.belief.parcels().len() < self.config.min_parcels_to_start {
                return Ok(0);
            }
            self.planner.start(pos, now, WorldSnapshot::capture(&self.belief, now));
            if !self.carried.is_empty() {
                let snapshot = WorldSnapshot::capture(&self.belief, now);
                self.planner.refresh(snapshot, self.carried.clone(), now)?;
            }
            self.parcels_dirty = false;
            let n = self.scheduler.warm_up(&mut self.planner, self.config.warmup_iterations)?;
            log::info!("{}: planner started at {pos} after {n} warm-up iterations", self.id);
            return Ok(n);
        }

        if self.parcels_dirty {
            self.parcels_dirty = false;
            let snapshot = WorldSnapshot::capture(&self.belief, now);
            self.planner.refresh(snapshot, self.carried.clone(), now)?;
        }
        self.planner.update_position(pos)?;
        Ok(self.scheduler.run_quantum(&mut self.planner)?)
    }

    // ── ③ Decide ──────────────────────────────────────────────────────────

    /// Own `(intention, raw, adjusted)` utilities.  Adjustments:
    ///
    /// * travel time follows a committed detour where one exists;
    /// * the planner's total over a child's visits becomes a per-visit
    ///   mean, so bids compare across teammates whose trees ran different
    ///   iteration counts;
    /// * blocked targets count for nothing;
    /// * pickups are scaled by the tile's mean discount factor and by the
    ///   competition factor.
    fn own_utilities(&self, pos: Position, now: Timestamp) -> PlayerResult<Vec<(Intention, f64, f64)>> {
        if !self.planner.is_started() {
            return Ok(Vec::new());
        }
        let visits: FxHashMap<Intention, u32> = {
            let tree = self.planner.tree()?;
            tree.children(tree.root())
                .iter()
                .map(|&c| (tree.node(c).intention, tree.node(c).visits))
                .collect()
        };
        let totals = self.planner.compute_intention_utilities_with(now, |intention, steps| {
            self.paths.remaining_from(intention, pos).unwrap_or(steps)
        })?;
        Ok(totals
            .into_iter()
            .map(|(intention, total)| {
                let u = per_visit(total, visits.get(&intention).copied().unwrap_or(0));
                (intention, u, self.adjust(intention, u, pos))
            })
            .collect())
    }

    fn adjust(&self, intention: Intention, utility: f64, pos: Position) -> f64 {
        if utility <= 0.0 || self.paths.is_blocked(intention.target) {
            return 0.0;
        }
        if !intention.is_pickup() {
            return utility;
        }
        let discount = self.discounts.mean(self.belief.parcels().ids_at(intention.target));
        utility * discount * self.competition_factor(intention.target, pos)
    }

    /// `1 - advantage²` for the rational non-teammate competitor with the
    /// largest lead on `target`, where advantage is its lead over our own
    /// distance.  `1.0` if nobody is strictly closer.
    pub(crate) fn competition_factor(&self, target: Position, pos: Position) -> f64 {
        let Some(mine) = self.belief.distance(pos, target) else {
            return 1.0;
        };
        if mine == 0 {
            return 1.0;
        }
        self.belief
            .agents()
            .filter(|a| !a.is_random && !self.belief.is_teammate(&a.id))
            .filter_map(|a| self.belief.distance(a.position, target))
            .filter(|&theirs| theirs < mine)
            .map(|theirs| {
                let advantage = (mine - theirs) as f64 / mine as f64;
                1.0 - advantage * advantage
            })
            .fold(1.0, f64::min)
    }

    fn decide(
        &mut self,
        pos:       Position,
        now:       Timestamp,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<Decision> {
        if let Mode::Follow(leader) = &self.mode {
            return Ok(Decision::Follow(leader.clone()));
        }

        let mine = self.own_utilities(pos, now)?;
        let report: Vec<(Intention, f64)> = mine.iter().map(|&(i, _, u)| (i, u)).collect();
        self.send_team(messenger, now, TeamMessage::Intentions(report.clone()));

        // Columns: every intention anyone reported.  Rows: self, then each
        // active teammate.
        let (columns, weights) = {
            let mates = self.belief.active_teammates(now);
            let mut columns: Vec<Intention> = report
                .iter()
                .map(|(i, _)| *i)
                .chain(mates.iter().flat_map(|m| m.intentions.iter().map(|(i, _)| *i)))
                .collect();
            columns.sort();
            columns.dedup();
            let row = |list: &[(Intention, f64)]| -> Vec<f64> {
                columns
                    .iter()
                    .map(|c| list.iter().find(|(i, _)| i == c).map_or(0.0, |(_, u)| u.max(0.0)))
                    .collect()
            };
            let mut weights = vec![row(&report)];
            weights.extend(mates.iter().map(|m| row(&m.intentions)));
            (columns, weights)
        };

        let assignment = assign_max(&weights);
        let own = assignment
            .first()
            .copied()
            .flatten()
            .filter(|&c| weights[0][c] > 0.0);

        // Nudge discount factors on every pickup we bid for and either won
        // or lost to a teammate.
        for (c, intention) in columns.iter().enumerate() {
            if !intention.is_pickup() || weights[0][c] <= 0.0 {
                continue;
            }
            let won = own == Some(c);
            let lost = assignment.iter().skip(1).any(|a| *a == Some(c));
            if !(won || lost) {
                continue;
            }
            let ids: Vec<ParcelId> = self.belief.parcels().ids_at(intention.target).cloned().collect();
            for id in &ids {
                self.discounts.nudge(id, won);
            }
        }

        if let Some(c) = own {
            self.pending_move = None;
            let chosen = columns[c];
            log::debug!("{}: adopted {chosen} ({:.2})", self.id, weights[0][c]);
            return Ok(Decision::Intention(chosen));
        }
        self.fallback(pos, now, &mine, messenger)
    }

    fn fallback(
        &mut self,
        pos:       Position,
        now:       Timestamp,
        mine:      &[(Intention, f64, f64)],
        messenger: &mut impl Messenger,
    ) -> PlayerResult<Decision> {
        let (blocked_deliveries, deliveries) = {
            let all = self.belief.engine().delivery_positions();
            (all.iter().filter(|&&d| self.paths.is_blocked(d)).count(), all.len())
        };
        let blocked_putdown = mine
            .iter()
            .any(|(i, raw, _)| i.is_putdown() && *raw > 0.0 && self.paths.is_blocked(i.target));

        if blocked_putdown && blocked_deliveries < deliveries {
            log::warn!("{}: deliveries blocked ({blocked_deliveries}/{deliveries}), exploring", self.id);
            return Ok(self.explore(pos));
        }
        if self.carried.is_empty() {
            return Ok(self.explore(pos));
        }
        let Some(leader) = self.closest_teammate(pos, now) else {
            return Ok(self.explore(pos));
        };
        log::info!("{}: handing {} parcels over to {leader}", self.id, self.carried.len());
        self.mode = Mode::Follow(leader.clone());
        self.send_team(messenger, now, TeamMessage::IgnoreMe(true));
        Ok(Decision::Follow(leader))
    }

    fn closest_teammate(&self, pos: Position, now: Timestamp) -> Option<AgentId> {
        self.belief
            .active_teammates(now)
            .into_iter()
            .filter_map(|m| {
                let d = self.belief.distance(pos, m.position?)?;
                Some((d, m.id.clone()))
            })
            .min()
            .map(|(_, id)| id)
    }

    /// Keep walking toward the pending target, or pick the most promising
    /// unblocked tile we can reach (random among equals).
    fn explore(&mut self, pos: Position) -> Decision {
        if let Some(target) = self.pending_move {
            if target != pos && !self.paths.is_blocked(target) {
                return Decision::Explore(target);
            }
        }
        let open: Vec<(Position, f64)> = self
            .belief
            .promising_positions(pos, self.config.exploration_candidates)
            .into_iter()
            .filter(|&(p, _)| p != pos && !self.paths.is_blocked(p))
            .filter(|&(p, _)| self.belief.distance(pos, p).is_some())
            .collect();
        let best = open.iter().map(|&(_, w)| w).fold(f64::NEG_INFINITY, f64::max);
        let mut top: Vec<Position> = open.iter().filter(|&&(_, w)| w >= best).map(|&(p, _)| p).collect();
        top.sort();
        self.pending_move = self.rng.choose(&top).copied();
        match self.pending_move {
            Some(target) => {
                log::debug!("{}: exploring toward {target}", self.id);
                Decision::Explore(target)
            }
            None => Decision::Idle,
        }
    }

    // ── ④ Act ─────────────────────────────────────────────────────────────

    fn act(
        &mut self,
        decision:  &Decision,
        pos:       Position,
        now:       Timestamp,
        actuators: &mut impl Actuators,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<Action> {
        match decision {
            Decision::Idle => Ok(Action::Wait),
            Decision::Intention(intention) if intention.target == pos => {
                self.execute(*intention, pos, actuators)
            }
            Decision::Intention(intention) => self.step_toward(*intention, pos, actuators),
            Decision::Explore(target) if *target == pos => {
                self.pending_move = None;
                Ok(Action::Wait)
            }
            Decision::Explore(target) => self.step_toward(Intention::movement(*target), pos, actuators),
            Decision::Follow(leader) => self.follow(leader.clone(), pos, now, actuators, messenger),
        }
    }

    fn execute(
        &mut self,
        intention: Intention,
        pos:       Position,
        actuators: &mut impl Actuators,
    ) -> PlayerResult<Action> {
        self.paths.remove(&intention);
        let action = match intention.kind {
            IntentionKind::Pickup => {
                let here: Vec<Parcel> = {
                    let index = self.belief.parcels();
                    index.ids_at(pos).filter_map(|id| index.get(id)).cloned().collect()
                };
                let picked = actuators.pickup();
                self.belief.take_picked_up(picked.iter());
                for p in here.into_iter().filter(|p| picked.contains(&p.id)) {
                    self.carried.push((p.id, p.value));
                }
                log::info!("{}: picked up {} parcels at {pos}", self.id, picked.len());
                Action::PickedUp(picked.len())
            }
            IntentionKind::Putdown => {
                let dropped = actuators.putdown(None);
                self.carried.retain(|(id, _)| !dropped.contains(id));
                log::info!("{}: delivered {} parcels at {pos}", self.id, dropped.len());
                Action::PutDown(dropped.len())
            }
            IntentionKind::Move => {
                self.pending_move = None;
                return Ok(Action::Wait);
            }
        };
        self.advance_planner(&intention)?;
        Ok(action)
    }

    /// Re-root the planner on the intention just carried out.  If the tree
    /// no longer has it, or the real outcome differs from what the tree
    /// assumed, schedule a refresh instead.
    fn advance_planner(&mut self, intention: &Intention) -> PlayerResult<()> {
        let known = {
            let tree = self.planner.tree()?;
            tree.children(tree.root()).iter().any(|&c| tree.node(c).intention == *intention)
        };
        if !known {
            log::warn!("{}: {intention} no longer in the planner tree, refreshing", self.id);
            self.parcels_dirty = true;
            return Ok(());
        }
        self.planner.execute_intention(intention)?;
        let mut expected: Vec<&ParcelId> = self.planner.root()?.carried.iter().map(|(id, _)| id).collect();
        let mut actual: Vec<&ParcelId> = self.carried.iter().map(|(id, _)| id).collect();
        expected.sort();
        actual.sort();
        if expected != actual {
            self.parcels_dirty = true;
        }
        Ok(())
    }

    /// One step toward `intention.target`: along a committed detour if one
    /// starts here, else the direct next hop, else a freshly planned detour.
    fn step_toward(
        &mut self,
        intention: Intention,
        pos:       Position,
        actuators: &mut impl Actuators,
    ) -> PlayerResult<Action> {
        if let Some(dir) = self.paths.next_step(&intention, pos) {
            if actuators.move_to(dir) {
                self.paths.advance(&intention);
                self.set_position(pos.step(dir))?;
                return Ok(Action::Moved(dir));
            }
            self.paths.remove(&intention);
        }

        let target = intention.target;
        let hop = self
            .belief
            .engine()
            .next_positions(pos, target)
            .into_iter()
            .find(|&n| !self.belief.is_occupied(n));
        if let Some(dir) = hop.and_then(|n| pos.direction_to(n)) {
            if actuators.move_to(dir) {
                self.set_position(pos.step(dir))?;
                return Ok(Action::Moved(dir));
            }
        }

        match self.belief.recompute_path(pos, target) {
            Some(steps) if !steps.is_empty() => {
                let first = steps[0];
                let bottleneck = self.belief.compute_bottleneck(pos, target);
                self.paths.insert(intention, CommittedPath::new(pos, steps, bottleneck));
                if actuators.move_to(first) {
                    self.paths.advance(&intention);
                    self.set_position(pos.step(first))?;
                    Ok(Action::Moved(first))
                } else {
                    self.paths.remove(&intention);
                    Ok(Action::Wait)
                }
            }
            _ => {
                self.paths.mark_blocked(target);
                Ok(Action::Blocked(target))
            }
        }
    }

    fn follow(
        &mut self,
        leader:    AgentId,
        pos:       Position,
        now:       Timestamp,
        actuators: &mut impl Actuators,
        messenger: &mut impl Messenger,
    ) -> PlayerResult<Action> {
        let leader_pos = self
            .belief
            .teammate(&leader)
            .ok()
            .filter(|m| m.is_active(now, self.config.teammate_timeout_ms))
            .and_then(|m| m.position);
        let Some(leader_pos) = leader_pos else {
            log::warn!("{}: lost track of {leader}, hand-over abandoned", self.id);
            self.end_follow(now, messenger);
            return Ok(Action::Wait);
        };

        match self.belief.distance(pos, leader_pos) {
            Some(d) if d <= self.config.follow_distance => {
                let dropped = actuators.putdown(None);
                // The leader collects these; stop bidding for them.
                for id in &dropped {
                    self.discounts.concede(id);
                }
                self.carried.retain(|(id, _)| !dropped.contains(id));
                log::info!("{}: left {} parcels for {leader} at {pos}", self.id, dropped.len());
                self.end_follow(now, messenger);
                self.parcels_dirty = true;
                Ok(Action::PutDown(dropped.len()))
            }
            Some(_) => self.step_toward(Intention::movement(leader_pos), pos, actuators),
            None => {
                self.end_follow(now, messenger);
                Ok(Action::Wait)
            }
        }
    }

    fn end_follow(&mut self, now: Timestamp, messenger: &mut impl Messenger) {
        self.mode = Mode::Plan;
        self.send_team(messenger, now, TeamMessage::IgnoreMe(false));
    }

    fn set_position(&mut self, pos: Position) -> PlayerResult<()> {
        self.position = Some(pos);
        if self.planner.is_started() {
            self.planner.update_position(pos)?;
        }
        Ok(())
    }
}
