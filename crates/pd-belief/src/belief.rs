//! The `BeliefSet`: one agent's reconciled model of the world.
//!
//! # Sources
//!
//! Updates arrive from the agent's own sensors and from teammates'
//! forwarded sensing reports.  Parcel reports carry the reporter's position
//! (to tell "gone" from "out of range"); agent reports carry the reporter's
//! id and timestamp (to drop stale reports and prune agents the reporter no
//! longer sees).
//!
//! # Ownership
//!
//! The belief set owns the free-parcel index, the observed-agent table, the
//! teammate roster, and the occupied-tile set.  Carried parcels are not
//! tracked here: once picked up they leave the index.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use pd_core::{AgentConfig, AgentId, Direction, Intention, ParcelId, Position, Timestamp};
use pd_spatial::{AStarPlanner, DistanceEngine, PathPlanner};

use crate::agents::{AgentObservation, ObservedAgent, RandomAgentClassifier};
use crate::events::{BeliefObserver, ParcelChanges};
use crate::parcels::{Parcel, ParcelIndex, ParcelObservation};
use crate::promise::PromiseMap;
use crate::team::{TeamMate, TeamRoster};
use crate::BeliefResult;

pub struct BeliefSet {
    engine:         Arc<DistanceEngine>,
    config:         AgentConfig,
    self_id:        AgentId,
    parcels:        ParcelIndex,
    agents:         FxHashMap<AgentId, ObservedAgent>,
    /// Latest accepted report timestamp per reporter.
    reporter_clock: FxHashMap<AgentId, Timestamp>,
    team:           TeamRoster,
    occupied:       FxHashSet<Position>,
    promise:        PromiseMap,
    classifier:     RandomAgentClassifier,
    path_planner:   Arc<dyn PathPlanner>,
    last_purge:     Timestamp,
}

impl BeliefSet {
    pub fn new(engine: Arc<DistanceEngine>, config: &AgentConfig, self_id: AgentId) -> Self {
        let promise = PromiseMap::build(&engine, config);
        let classifier =
            RandomAgentClassifier::new(config, engine.map().width(), engine.map().height());
        Self {
            engine,
            config: config.clone(),
            self_id,
            parcels: ParcelIndex::new(),
            agents: FxHashMap::default(),
            reporter_clock: FxHashMap::default(),
            team: TeamRoster::new(),
            occupied: FxHashSet::default(),
            promise,
            classifier,
            path_planner: Arc::new(AStarPlanner),
            last_purge: Timestamp::ZERO,
        }
    }

    /// Replace the route reconciliation strategy.
    pub fn with_path_planner(mut self, planner: Arc<dyn PathPlanner>) -> Self {
        self.path_planner = planner;
        self
    }

    pub fn engine(&self) -> &Arc<DistanceEngine> {
        &self.engine
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn self_id(&self) -> &AgentId {
        &self.self_id
    }

    // ── Parcels ───────────────────────────────────────────────────────────

    pub fn parcels(&self) -> &ParcelIndex {
        &self.parcels
    }

    /// Merge one parcel sensing report taken from `reporter`.
    ///
    /// * A known free parcel missing from the report but inside the
    ///   reporter's sensing range was taken by someone: removed.
    /// * A new free parcel is inserted; a known one at a new tile is moved.
    /// * A parcel now carried leaves the index.  It is reported as removed
    ///   unless the carrier is this agent.
    /// * Parcels whose value reached zero are dropped.
    ///
    /// Fires `on_parcels_changed` once, if anything changed.
    pub fn update_parcels(
        &mut self,
        visible:  &[ParcelObservation],
        reporter: Position,
        now:      Timestamp,
        observer: &mut impl BeliefObserver,
    ) -> ParcelChanges {
        let mut changes = ParcelChanges::default();
        let seen: FxHashSet<_> = visible.iter().map(|o| &o.id).collect();

        let vanished: Vec<_> = self
            .parcels
            .iter()
            .filter(|p| !seen.contains(&p.id))
            .filter(|p| reporter.manhattan(p.position) < self.config.parcel_sensing_distance)
            .map(|p| p.id.clone())
            .collect();
        for id in vanished {
            self.parcels.remove(&id);
            changes.removed.push(id);
        }

        let decay = self.config.parcel_decay();
        for obs in visible {
            if let Some(carrier) = &obs.carried_by {
                if self.parcels.remove(&obs.id).is_some() && *carrier != self.self_id {
                    changes.removed.push(obs.id.clone());
                }
                continue;
            }
            if obs.reward <= 0.0 {
                if self.parcels.remove(&obs.id).is_some() {
                    changes.removed.push(obs.id.clone());
                }
                continue;
            }
            match self.parcels.relocate(&obs.id, obs.position) {
                None => {
                    self.parcels
                        .insert(Parcel::new(obs.id.clone(), obs.position, obs.reward, now, decay));
                    changes.new.push(obs.id.clone());
                }
                Some(from) => {
                    self.parcels.observe_value(&obs.id, obs.reward, now);
                    if from != obs.position {
                        changes.moved.push((obs.id.clone(), from, obs.position));
                    }
                }
            }
        }

        for id in self.parcels.expired(now) {
            self.parcels.remove(&id);
            changes.removed.push(id);
        }

        if !changes.is_empty() {
            log::debug!(
                "{}: parcels +{} ~{} -{}",
                self.self_id,
                changes.new.len(),
                changes.moved.len(),
                changes.removed.len()
            );
            observer.on_parcels_changed(&changes);
        }
        changes
    }

    /// Drop every parcel whose value is zero at `now`.  Returns how many.
    pub fn purge_expired(&mut self, now: Timestamp, observer: &mut impl BeliefObserver) -> usize {
        self.last_purge = now;
        let expired = self.parcels.expired(now);
        if expired.is_empty() {
            return 0;
        }
        for id in &expired {
            self.parcels.remove(id);
        }
        let changes = ParcelChanges { removed: expired, ..ParcelChanges::default() };
        log::debug!("{}: purged {} expired parcels", self.self_id, changes.removed.len());
        observer.on_parcels_changed(&changes);
        changes.removed.len()
    }

    /// [`purge_expired`](Self::purge_expired) if `purge_interval_ms` has
    /// passed since the last sweep.
    pub fn purge_if_due(&mut self, now: Timestamp, observer: &mut impl BeliefObserver) -> usize {
        if now.since(self.last_purge) < self.config.purge_interval_ms {
            return 0;
        }
        self.purge_expired(now, observer)
    }

    /// Remove parcels this agent just picked up.  No change event fires:
    /// the caller already knows.  Returns the parcels that were indexed.
    pub fn take_picked_up<'a, I>(&mut self, ids: I) -> Vec<Parcel>
    where
        I: IntoIterator<Item = &'a ParcelId>,
    {
        ids.into_iter().filter_map(|id| self.parcels.remove(id)).collect()
    }

    // ── Agents ────────────────────────────────────────────────────────────

    pub fn agents(&self) -> impl Iterator<Item = &ObservedAgent> + '_ {
        self.agents.values()
    }

    pub fn agent(&self, id: &AgentId) -> Option<&ObservedAgent> {
        self.agents.get(id)
    }

    /// Tiles currently occupied by agents other than self.
    pub fn occupied(&self) -> &FxHashSet<Position> {
        &self.occupied
    }

    #[inline]
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupied.contains(&pos)
    }

    /// Merge one agent sensing report from `reporter` taken at `reported_at`.
    ///
    /// Reports older than the last one accepted from the same reporter are
    /// ignored and `false` is returned.  Agents this reporter supplied last
    /// time but no longer sees are pruned.  Fires
    /// `on_occupied_positions_changed` if the occupied set differs.
    pub fn update_agents(
        &mut self,
        visible:     &[AgentObservation],
        reporter:    &AgentId,
        reported_at: Timestamp,
        observer:    &mut impl BeliefObserver,
    ) -> bool {
        let last = self.reporter_clock.entry(reporter.clone()).or_insert(reported_at);
        if reported_at < *last {
            log::trace!("{}: stale agent report from {reporter} dropped", self.self_id);
            return false;
        }
        *last = reported_at;

        let mut seen: FxHashSet<&AgentId> = FxHashSet::default();
        for obs in visible {
            if obs.id == self.self_id {
                continue;
            }
            seen.insert(&obs.id);
            match self.agents.get_mut(&obs.id) {
                None => {
                    self.agents
                        .insert(obs.id.clone(), ObservedAgent::first_report(obs, reporter, reported_at));
                }
                Some(agent) => {
                    if reported_at < agent.first_seen {
                        agent.first_seen = reported_at;
                        agent.first_score = obs.score;
                    }
                    if reported_at >= agent.last_seen {
                        agent.position = obs.position;
                        agent.score = obs.score;
                        agent.last_seen = reported_at;
                        agent.reporter = reporter.clone();
                    }
                }
            }
            if let Some(agent) = self.agents.get_mut(&obs.id) {
                agent.is_random =
                    !self.team.contains(&agent.id) && self.classifier.is_random(agent);
            }
        }

        self.agents
            .retain(|id, agent| agent.reporter != *reporter || seen.contains(id));

        self.refresh_occupied(observer);
        true
    }

    fn refresh_occupied(&mut self, observer: &mut impl BeliefObserver) {
        let mut occupied: FxHashSet<Position> =
            self.agents.values().map(|a| a.position).collect();
        for mate in self.team.mates() {
            if let Some(pos) = mate.position {
                occupied.insert(pos);
            }
        }
        if occupied != self.occupied {
            self.occupied = occupied;
            log::debug!("{}: {} occupied tiles", self.self_id, self.occupied.len());
            observer.on_occupied_positions_changed(&self.occupied);
        }
    }

    // ── Exploration ───────────────────────────────────────────────────────

    /// The `k` most promising tiles to explore from `from`, with every
    /// visible agent (and self, at `from`) penalized.  Unordered.
    pub fn promising_positions(&self, from: Position, k: usize) -> Vec<(Position, f64)> {
        let agents = self
            .agents
            .values()
            .map(|a| a.position)
            .chain(std::iter::once(from));
        self.promise.top_k(&self.engine, k, agents)
    }

    pub fn promise(&self) -> &PromiseMap {
        &self.promise
    }

    // ── Spatial delegation ────────────────────────────────────────────────

    #[inline]
    pub fn distance(&self, a: Position, b: Position) -> Option<u32> {
        self.engine.distance_if_possible(a, b)
    }

    pub fn compute_bottleneck(&self, start: Position, end: Position) -> FxHashSet<Position> {
        self.engine.bottleneck(start, end)
    }

    /// Route from `start` to `end` around every occupied tile.
    pub fn recompute_path(&self, start: Position, end: Position) -> Option<Vec<Direction>> {
        let mut avoid = self.occupied.clone();
        avoid.remove(&start);
        self.path_planner.plan(&self.engine, start, end, &avoid)
    }

    // ── Team ──────────────────────────────────────────────────────────────

    pub fn team(&self) -> &TeamRoster {
        &self.team
    }

    pub fn is_teammate(&self, id: &AgentId) -> bool {
        self.team.contains(id)
    }

    pub fn add_teammate(&mut self, id: AgentId, now: Timestamp) -> bool {
        if id == self.self_id {
            return false;
        }
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.is_random = false;
        }
        let added = self.team.add(id.clone(), now);
        if added {
            log::info!("{}: teammate {id} joined", self.self_id);
        }
        added
    }

    pub fn remove_teammate(
        &mut self,
        id:       &AgentId,
        observer: &mut impl BeliefObserver,
    ) -> BeliefResult<TeamMate> {
        let mate = self.team.remove(id)?;
        self.refresh_occupied(observer);
        Ok(mate)
    }

    pub fn teammate(&self, id: &AgentId) -> BeliefResult<&TeamMate> {
        self.team.get(id)
    }

    pub fn update_teammate_position(
        &mut self,
        id:       &AgentId,
        pos:      Position,
        now:      Timestamp,
        observer: &mut impl BeliefObserver,
    ) -> BeliefResult<()> {
        self.team.update_position(id, pos, now)?;
        self.refresh_occupied(observer);
        Ok(())
    }

    pub fn record_teammate_activity(&mut self, id: &AgentId, now: Timestamp) -> BeliefResult<()> {
        self.team.record_activity(id, now)
    }

    pub fn update_teammate_intentions(
        &mut self,
        id:         &AgentId,
        intentions: Vec<(Intention, f64)>,
        now:        Timestamp,
    ) -> BeliefResult<()> {
        self.team.update_intentions(id, intentions, now)
    }

    pub fn set_teammate_ignore(&mut self, id: &AgentId, ignore: bool, now: Timestamp) -> BeliefResult<()> {
        self.team.set_ignore(id, ignore, now)
    }

    /// Teammates taking part in assignment at `now`.
    pub fn active_teammates(&self, now: Timestamp) -> Vec<&TeamMate> {
        self.team.active(now, self.config.teammate_timeout_ms)
    }
}
