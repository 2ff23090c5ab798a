//! Unit tests for pd-player.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use rustc_hash::FxHashSet;

    use pd_belief::ParcelObservation;
    use pd_core::{AgentConfig, AgentId, Direction, ParcelId, Position};
    use pd_spatial::{DistanceEngine, GridMap};

    use crate::{Action, Actuators, Decision, Envelope, Messenger, Player, PlayerBuilder, PlayerObserver};

    /// Non-decaying parcels, short warm-up.
    pub fn config() -> AgentConfig {
        AgentConfig {
            parcel_decay_interval_ms: None,
            warmup_iterations:        200,
            ..AgentConfig::default()
        }
    }

    pub fn engine(ascii: &str, config: &AgentConfig) -> Arc<DistanceEngine> {
        let map = GridMap::from_ascii(ascii).unwrap();
        Arc::new(DistanceEngine::build(map, config).unwrap())
    }

    pub fn player(engine: &Arc<DistanceEngine>, at: Position) -> Player {
        PlayerBuilder::new("me", Arc::clone(engine), config())
            .position(at)
            .build()
            .unwrap()
    }

    // ── Mock world ────────────────────────────────────────────────────────

    /// Server stand-in for a single agent.
    pub struct World {
        engine:        Arc<DistanceEngine>,
        pub pos:       Position,
        pub free:      Vec<(ParcelId, Position)>,
        pub carried:   Vec<ParcelId>,
        pub delivered: Vec<ParcelId>,
        /// Tiles held by other agents.
        pub blockers:  FxHashSet<Position>,
    }

    impl World {
        pub fn new(engine: &Arc<DistanceEngine>, pos: Position) -> Self {
            Self {
                engine:    Arc::clone(engine),
                pos,
                free:      Vec::new(),
                carried:   Vec::new(),
                delivered: Vec::new(),
                blockers:  FxHashSet::default(),
            }
        }

        pub fn spawn(&mut self, id: &str, at: Position) {
            self.free.push((ParcelId::new(id), at));
        }

        /// Free parcels strictly inside `range` of the agent, reward 10.
        pub fn sense(&self, range: u32) -> Vec<ParcelObservation> {
            self.free
                .iter()
                .filter(|(_, p)| self.pos.manhattan(*p) < range)
                .map(|(id, p)| ParcelObservation::free(id.clone(), *p, 10.0))
                .collect()
        }
    }

    impl Actuators for World {
        fn move_to(&mut self, direction: Direction) -> bool {
            let next = self.pos.step(direction);
            if !self.engine.is_crossable(next) || self.blockers.contains(&next) {
                return false;
            }
            self.pos = next;
            true
        }

        fn pickup(&mut self) -> FxHashSet<ParcelId> {
            let here = self.pos;
            let (taken, rest): (Vec<_>, Vec<_>) = self.free.drain(..).partition(|(_, p)| *p == here);
            self.free = rest;
            let ids: FxHashSet<ParcelId> = taken.into_iter().map(|(id, _)| id).collect();
            self.carried.extend(ids.iter().cloned());
            ids
        }

        fn putdown(&mut self, parcels: Option<&[ParcelId]>) -> FxHashSet<ParcelId> {
            let dropped: Vec<ParcelId> = match parcels {
                None => std::mem::take(&mut self.carried),
                Some(ids) => {
                    let (out, keep): (Vec<_>, Vec<_>) =
                        self.carried.drain(..).partition(|id| ids.contains(id));
                    self.carried = keep;
                    out
                }
            };
            if self.engine.delivery_positions().contains(&self.pos) {
                self.delivered.extend(dropped.iter().cloned());
            } else {
                self.free.extend(dropped.iter().map(|id| (id.clone(), self.pos)));
            }
            dropped.into_iter().collect()
        }
    }

    // ── Mock bus and observer ─────────────────────────────────────────────

    #[derive(Default)]
    pub struct Outbox {
        pub sent:       Vec<(AgentId, Envelope)>,
        pub broadcasts: Vec<Envelope>,
    }

    impl Messenger for Outbox {
        fn send(&mut self, to: &AgentId, envelope: Envelope) {
            self.sent.push((to.clone(), envelope));
        }

        fn broadcast(&mut self, envelope: Envelope) {
            self.broadcasts.push(envelope);
        }
    }

    #[derive(Default)]
    pub struct Trace {
        pub decisions: Vec<Decision>,
        pub actions:   Vec<Action>,
        pub ticks:     usize,
    }

    impl PlayerObserver for Trace {
        fn on_decision(&mut self, _: &AgentId, _: pd_core::Timestamp, decision: &Decision) {
            self.decisions.push(decision.clone());
        }

        fn on_action(&mut self, _: &AgentId, _: pd_core::Timestamp, action: &Action) {
            self.actions.push(action.clone());
        }

        fn on_tick_end(&mut self, _: &AgentId, _: pd_core::Timestamp, _: usize) {
            self.ticks += 1;
        }
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod assignment {
    use crate::assignment::{assign_max, total_weight};

    #[test]
    fn higher_bid_wins_a_single_intention() {
        let w = vec![vec![6.0], vec![5.0]];
        assert_eq!(assign_max(&w), vec![Some(0), None]);
    }

    #[test]
    fn teammate_wins_when_it_bids_higher() {
        let w = vec![vec![5.0], vec![6.0]];
        assert_eq!(assign_max(&w), vec![None, Some(0)]);
    }

    #[test]
    fn equal_bids_go_to_the_first_row() {
        let w = vec![vec![4.0], vec![4.0]];
        assert_eq!(assign_max(&w), vec![Some(0), None]);
    }

    #[test]
    fn maximizes_the_team_total_not_the_first_row() {
        // Greedy self→0 would total 11; the optimum is 18.
        let w = vec![vec![10.0, 9.0], vec![9.0, 1.0]];
        let a = assign_max(&w);
        assert_eq!(a, vec![Some(1), Some(0)]);
        assert_eq!(total_weight(&w, &a), 18.0);
    }

    #[test]
    fn three_by_three() {
        let w = vec![
            vec![7.0, 5.0, 11.0],
            vec![5.0, 4.0, 1.0],
            vec![9.0, 3.0, 2.0],
        ];
        let a = assign_max(&w);
        assert_eq!(a, vec![Some(2), Some(1), Some(0)]);
        assert_eq!(total_weight(&w, &a), 24.0);
    }

    #[test]
    fn more_intentions_than_agents() {
        let w = vec![vec![1.0, 8.0, 3.0]];
        assert_eq!(assign_max(&w), vec![Some(1)]);
    }

    #[test]
    fn zero_row_gets_padding() {
        let w = vec![vec![0.0], vec![3.0]];
        assert_eq!(assign_max(&w), vec![None, Some(0)]);
    }

    #[test]
    fn negative_weights_count_as_zero() {
        let w = vec![vec![-5.0, 2.0], vec![1.0, -1.0]];
        let a = assign_max(&w);
        assert_eq!(a, vec![Some(1), Some(0)]);
        assert_eq!(total_weight(&w, &a), 3.0);
    }

    #[test]
    fn empty_inputs() {
        assert!(assign_max(&[]).is_empty());
        assert_eq!(assign_max(&[vec![], vec![]]), vec![None, None]);
    }
}

// ── Discount factors ──────────────────────────────────────────────────────────

#[cfg(test)]
mod discount {
    use pd_core::{AgentConfig, ParcelId};

    use crate::DiscountFactors;

    fn factors() -> DiscountFactors {
        DiscountFactors::new(&AgentConfig {
            discount_step: 0.1,
            discount_min:  0.5,
            discount_max:  1.5,
            ..AgentConfig::default()
        })
    }

    #[test]
    fn unknown_parcels_are_neutral() {
        let f = factors();
        assert_eq!(f.factor(&ParcelId::new("x")), 1.0);
        assert_eq!(f.mean(std::iter::empty()), 1.0);
    }

    #[test]
    fn nudges_stay_within_bounds() {
        let mut f = factors();
        let id = ParcelId::new("p");
        f.nudge(&id, true);
        assert!((f.factor(&id) - 1.1).abs() < 1e-12);
        for _ in 0..20 {
            f.nudge(&id, true);
        }
        assert_eq!(f.factor(&id), 1.5);
        for _ in 0..40 {
            f.nudge(&id, false);
        }
        assert_eq!(f.factor(&id), 0.5);
    }

    #[test]
    fn mean_and_retain() {
        let mut f = factors();
        let (a, b) = (ParcelId::new("a"), ParcelId::new("b"));
        f.nudge(&a, true);
        f.concede(&b);
        assert!((f.mean([&a, &b]) - 0.8).abs() < 1e-12);
        f.retain(|id| *id == a);
        assert_eq!(f.len(), 1);
        assert_eq!(f.factor(&b), 1.0);
    }
}

// ── Path cache ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod paths {
    use rustc_hash::FxHashSet;

    use pd_core::{Direction, Intention, Position};

    use crate::{CommittedPath, PathCache};

    fn detour() -> (Intention, CommittedPath) {
        let bottleneck: FxHashSet<Position> = [Position::new(0, 2)].into_iter().collect();
        let path = CommittedPath::new(
            Position::new(0, 1),
            vec![Direction::Down, Direction::Right, Direction::Right],
            bottleneck,
        );
        (Intention::pickup(Position::new(0, 3)), path)
    }

    #[test]
    fn follows_and_consumes_steps() {
        let mut cache = PathCache::new();
        let (i, path) = detour();
        cache.insert(i, path);
        assert_eq!(cache.next_step(&i, Position::new(0, 0)), None);
        assert_eq!(cache.next_step(&i, Position::new(0, 1)), Some(Direction::Down));
        assert_eq!(cache.remaining_from(&i, Position::new(0, 1)), Some(3));
        cache.advance(&i);
        assert_eq!(cache.next_step(&i, Position::new(1, 1)), Some(Direction::Right));
        cache.advance(&i);
        cache.advance(&i);
        assert!(cache.is_empty());
    }

    #[test]
    fn cleared_bottleneck_drops_the_detour() {
        let mut cache = PathCache::new();
        let (i, path) = detour();
        cache.insert(i, path);

        let still: FxHashSet<Position> = [Position::new(0, 2)].into_iter().collect();
        cache.occupied_changed(&still);
        assert!(cache.get(&i).is_some());

        let elsewhere: FxHashSet<Position> = [Position::new(5, 5)].into_iter().collect();
        cache.occupied_changed(&elsewhere);
        assert!(cache.get(&i).is_none());
    }

    #[test]
    fn blocked_targets_reset_on_occupancy_change() {
        let mut cache = PathCache::new();
        cache.mark_blocked(Position::new(3, 3));
        assert!(cache.is_blocked(Position::new(3, 3)));
        cache.occupied_changed(&FxHashSet::default());
        assert!(!cache.is_blocked(Position::new(3, 3)));
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod identity {
    use pd_core::AgentId;

    use crate::{AcceptAll, IdentityVerifier, SharedSecret};

    #[test]
    fn shared_secret_accepts_only_matching_proofs() {
        let blue = SharedSecret::new("blue");
        let red = SharedSecret::new("red");
        let alice = AgentId::new("alice");
        let proof = blue.proof_for(&alice);
        assert!(blue.verify(&alice, &proof));
        assert!(!red.verify(&alice, &proof));
        assert!(!blue.verify(&AgentId::new("mallory"), &proof));
    }

    #[test]
    fn accept_all_accepts_anything() {
        assert!(AcceptAll.verify(&AgentId::new("x"), "nonsense"));
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use pd_core::{AgentConfig, CoreError, PathReconciliation, Position};
    use pd_spatial::SpatialError;

    use super::helpers::{config, engine};
    use crate::{PlayerBuilder, PlayerError};

    #[test]
    fn rejects_invalid_config() {
        let e = engine("....D", &config());
        let bad = AgentConfig { movement_duration_ms: 0, ..config() };
        let err = PlayerBuilder::new("me", e, bad).build().err();
        assert!(matches!(err, Some(PlayerError::Config(CoreError::Config(_)))));
    }

    #[test]
    fn external_reconciliation_needs_a_planner() {
        let e = engine("....D", &config());
        let cfg = AgentConfig { path_reconciliation: PathReconciliation::External, ..config() };
        let err = PlayerBuilder::new("me", e, cfg).build().err();
        assert!(matches!(err, Some(PlayerError::Config(_))));
    }

    #[test]
    fn rejects_a_start_on_a_wall() {
        let e = engine("..#.D", &config());
        let err = PlayerBuilder::new("me", e, config()).position(Position::new(0, 2)).build().err();
        assert!(matches!(err, Some(PlayerError::Spatial(SpatialError::UnknownPosition(_)))));
    }
}

// ── Team messages ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod messages {
    use std::sync::Arc;

    use pd_core::{AgentId, Intention, Position, Timestamp};

    use super::helpers::{config, engine, player, Outbox};
    use crate::{Envelope, IdentityVerifier, PlayerBuilder, SharedSecret, TeamMessage};

    fn env(from: &str, at: u64, message: TeamMessage) -> Envelope {
        Envelope::new(AgentId::new(from), Timestamp(at), message)
    }

    fn hello(from: &str, at: u64) -> Envelope {
        env(from, at, TeamMessage::Hello { proof: String::new() })
    }

    #[test]
    fn announce_broadcasts_hello() {
        let e = engine("....D", &config());
        let p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        p.announce(Timestamp(0), &mut out);
        assert_eq!(out.broadcasts.len(), 1);
        assert!(matches!(out.broadcasts[0].message, TeamMessage::Hello { .. }));
    }

    #[test]
    fn hello_adds_teammate_and_answers_once() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();

        p.handle_message(hello("mate", 0), Timestamp(0), &mut out).unwrap();
        assert!(p.belief().is_teammate(&AgentId::new("mate")));
        let kinds: Vec<_> = out.sent.iter().map(|(_, e)| e.message.kind()).collect();
        assert_eq!(kinds, vec!["hello", "position"]);

        // A repeated hello does not trigger another answer.
        p.handle_message(hello("mate", 5), Timestamp(5), &mut out).unwrap();
        assert_eq!(out.sent.len(), 2);
    }

    #[test]
    fn unverified_hello_is_rejected() {
        let e = engine("....D", &config());
        let mut p = PlayerBuilder::new("me", Arc::clone(&e), config())
            .verifier(SharedSecret::new("blue"))
            .build()
            .unwrap();
        let mut out = Outbox::default();
        p.handle_message(hello("mallory", 0), Timestamp(0), &mut out).unwrap();
        assert!(!p.belief().is_teammate(&AgentId::new("mallory")));
        assert!(out.sent.is_empty());

        let proof = SharedSecret::new("blue").proof_for(&AgentId::new("mate"));
        p.handle_message(env("mate", 0, TeamMessage::Hello { proof }), Timestamp(0), &mut out)
            .unwrap();
        assert!(p.belief().is_teammate(&AgentId::new("mate")));
    }

    #[test]
    fn strangers_are_ignored() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        let pos = env("stranger", 0, TeamMessage::Position(Position::new(0, 3)));
        p.handle_message(pos, Timestamp(0), &mut out).unwrap();
        assert!(p.belief().teammate(&AgentId::new("stranger")).is_err());
        assert!(p.belief().occupied().is_empty());
    }

    #[test]
    fn stale_messages_are_dropped() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        let mate = AgentId::new("mate");
        p.handle_message(hello("mate", 10), Timestamp(10), &mut out).unwrap();

        let old = env("mate", 5, TeamMessage::Position(Position::new(0, 1)));
        p.handle_message(old, Timestamp(12), &mut out).unwrap();
        assert_eq!(p.belief().teammate(&mate).unwrap().position, None);

        let fresh = env("mate", 20, TeamMessage::Position(Position::new(0, 3)));
        p.handle_message(fresh, Timestamp(20), &mut out).unwrap();
        assert_eq!(p.belief().teammate(&mate).unwrap().position, Some(Position::new(0, 3)));
        assert!(p.belief().is_occupied(Position::new(0, 3)));
    }

    #[test]
    fn intentions_and_ignore_me_update_the_roster() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        let mate = AgentId::new("mate");
        p.handle_message(hello("mate", 0), Timestamp(0), &mut out).unwrap();

        let list = vec![(Intention::pickup(Position::new(0, 2)), 7.0)];
        p.handle_message(env("mate", 1, TeamMessage::Intentions(list.clone())), Timestamp(1), &mut out)
            .unwrap();
        assert_eq!(p.belief().teammate(&mate).unwrap().intentions, list);
        assert_eq!(p.belief().active_teammates(Timestamp(1)).len(), 1);

        p.handle_message(env("mate", 2, TeamMessage::IgnoreMe(true)), Timestamp(2), &mut out)
            .unwrap();
        assert!(p.belief().active_teammates(Timestamp(2)).is_empty());
    }

    #[test]
    fn own_sensing_is_forwarded_to_teammates() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        p.handle_message(hello("mate", 0), Timestamp(0), &mut out).unwrap();
        out.sent.clear();

        let parcels = vec![pd_belief::ParcelObservation::free("p0", Position::new(0, 2), 10.0)];
        p.on_parcel_sensing(&parcels, Timestamp(1), &mut out);
        assert_eq!(out.sent.len(), 1);
        match &out.sent[0].1.message {
            TeamMessage::ParcelSensing { reporter, parcels: fwd } => {
                assert_eq!(*reporter, Position::new(0, 0));
                assert_eq!(fwd, &parcels);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

// ── Control loop ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod control {
    use pd_belief::AgentObservation;
    use pd_core::{AgentId, DecayingValue, Direction, Intention, ParcelId, Position, Timestamp};

    use super::helpers::{config, engine, player, Outbox, Trace, World};
    use crate::{Action, Decision, Envelope, NoopMessenger, TeamMessage};

    fn ms(tick: u64) -> Timestamp {
        Timestamp(tick * 500)
    }

    #[test]
    fn idle_without_a_position() {
        let e = engine("....D", &config());
        let mut p = crate::PlayerBuilder::new("me", e.clone(), config()).build().unwrap();
        let mut world = World::new(&e, Position::new(0, 0));
        let mut trace = Trace::default();
        let d = p.tick(ms(0), &mut world, &mut NoopMessenger, &mut trace).unwrap();
        assert_eq!(d, Decision::Idle);
        assert_eq!(trace.ticks, 1);
    }

    #[test]
    fn corridor_pickup_then_delivery() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 2));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());

        for t in 0..12 {
            let seen = world.sense(5);
            p.on_parcel_sensing(&seen, ms(t), &mut out);
            p.tick(ms(t), &mut world, &mut out, &mut trace).unwrap();
            assert_eq!(p.position(), Some(world.pos));
            if !world.delivered.is_empty() {
                break;
            }
        }

        assert_eq!(world.delivered, vec![ParcelId::new("p0")]);
        assert_eq!(trace.decisions[0], Decision::Intention(Intention::pickup(Position::new(0, 2))));
        let is_pickup = |d: &Decision| matches!(d, Decision::Intention(i) if i.is_pickup());
        let is_putdown = |d: &Decision| matches!(d, Decision::Intention(i) if i.is_putdown());
        let last_pickup = trace.decisions.iter().rposition(is_pickup).unwrap();
        let first_putdown = trace.decisions.iter().position(is_putdown).unwrap();
        assert!(last_pickup < first_putdown);
        assert_eq!(
            trace.decisions[first_putdown],
            Decision::Intention(Intention::putdown(Position::new(0, 4)))
        );
        assert!(trace.actions.contains(&Action::PickedUp(1)));
        assert_eq!(trace.actions.last(), Some(&Action::PutDown(1)));
        assert!(p.carried().is_empty());
    }

    #[test]
    fn teammate_with_higher_bid_takes_the_parcel() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 2));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());
        let mate = AgentId::new("mate");

        let hello = Envelope::new(mate.clone(), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        let bid = vec![(Intention::pickup(Position::new(0, 2)), 100.0)];
        p.handle_message(Envelope::new(mate.clone(), ms(0), TeamMessage::Intentions(bid)), ms(0), &mut out)
            .unwrap();

        p.on_parcel_sensing(&world.sense(5), ms(0), &mut out);
        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();

        assert!(matches!(d, Decision::Explore(_)), "got {d:?}");
        assert!(p.discounts().factor(&ParcelId::new("p0")) < 1.0);
        // Our own bid went out to the teammate.
        let gossip = out
            .sent
            .iter()
            .find_map(|(to, e)| match &e.message {
                TeamMessage::Intentions(list) if *to == mate => Some(list.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(gossip.len(), 1);
        assert!(gossip[0].1 > 0.0 && gossip[0].1 < 100.0);
    }

    #[test]
    fn lower_teammate_bid_leaves_the_parcel_to_us() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 2));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());
        let mate = AgentId::new("mate");

        let hello = Envelope::new(mate.clone(), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        let bid = vec![(Intention::pickup(Position::new(0, 2)), 1.0)];
        p.handle_message(Envelope::new(mate, ms(0), TeamMessage::Intentions(bid)), ms(0), &mut out)
            .unwrap();

        p.on_parcel_sensing(&world.sense(5), ms(0), &mut out);
        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Intention(Intention::pickup(Position::new(0, 2))));
        assert!(p.discounts().factor(&ParcelId::new("p0")) > 1.0);
    }

    #[test]
    fn rival_closer_to_a_parcel_lowers_its_value() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut out = Outbox::default();
        let rival = vec![AgentObservation::new("rival", Position::new(0, 3), 0.0)];
        p.on_agent_sensing(&rival, ms(0), &mut out);

        // We are 4 away, the rival 1: advantage 3/4.
        let f = p.competition_factor(Position::new(0, 4), Position::new(0, 0));
        assert!((f - (1.0 - 0.75 * 0.75)).abs() < 1e-12);
        // Nobody is closer to (0,1).
        assert_eq!(p.competition_factor(Position::new(0, 1), Position::new(0, 0)), 1.0);
    }

    #[test]
    fn no_route_marks_the_target_blocked_and_falls_back() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 3));
        world.blockers.insert(Position::new(0, 1));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());

        let rival = vec![AgentObservation::new("rival", Position::new(0, 1), 0.0)];
        p.on_agent_sensing(&rival, ms(0), &mut out);
        p.on_parcel_sensing(&world.sense(5), ms(0), &mut out);

        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Intention(Intention::pickup(Position::new(0, 3))));
        assert_eq!(trace.actions[0], Action::Blocked(Position::new(0, 3)));
        assert!(p.paths().is_blocked(Position::new(0, 3)));
        assert_eq!(world.pos, Position::new(0, 0));

        let d = p.tick(ms(1), &mut world, &mut out, &mut trace).unwrap();
        assert!(matches!(d, Decision::Explore(_)), "got {d:?}");
    }

    #[test]
    fn refused_step_commits_a_detour_until_the_bottleneck_clears() {
        let ascii = ".....\n.###.\n....D";
        let e = engine(ascii, &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 4));
        world.blockers.insert(Position::new(0, 2));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());
        let target = Intention::pickup(Position::new(0, 4));

        let rival = vec![AgentObservation::new("rival", Position::new(0, 2), 0.0)];
        p.on_agent_sensing(&rival, ms(0), &mut out);
        p.on_parcel_sensing(&world.sense(5), ms(0), &mut out);

        p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(trace.actions[0], Action::Moved(Direction::Right));
        assert_eq!(world.pos, Position::new(0, 1));

        // Next hop is occupied: back off around the wall.
        let d = p.tick(ms(1), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Intention(target));
        assert_eq!(trace.actions[1], Action::Moved(Direction::Left));
        let detour = p.paths().get(&target).unwrap();
        assert_eq!(detour.at, Position::new(0, 0));
        assert_eq!(detour.remaining(), 8);
        assert!(detour.bottleneck.contains(&Position::new(0, 2)));

        // The rival walks away: the detour is dropped.
        p.on_agent_sensing(&[], ms(2), &mut out);
        assert!(p.paths().get(&target).is_none());
    }

    #[test]
    fn carrying_with_nothing_to_do_hands_over_to_a_teammate() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());
        let mate = AgentId::new("mate");

        let hello = Envelope::new(mate.clone(), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        let pos = Envelope::new(mate.clone(), ms(0), TeamMessage::Position(Position::new(0, 1)));
        p.handle_message(pos, ms(0), &mut out).unwrap();

        p.carried.push((ParcelId::new("c"), DecayingValue::constant(5.0)));
        world.carried.push(ParcelId::new("c"));
        out.sent.clear();

        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Follow(mate.clone()));
        assert_eq!(trace.actions[0], Action::PutDown(1));
        assert!(p.carried().is_empty());
        assert!(p.following().is_none());
        assert_eq!(world.free, vec![(ParcelId::new("c"), Position::new(0, 0))]);
        assert_eq!(p.discounts().factor(&ParcelId::new("c")), config().discount_min);

        let flags: Vec<bool> = out
            .sent
            .iter()
            .filter_map(|(to, e)| match e.message {
                TeamMessage::IgnoreMe(flag) if *to == mate => Some(flag),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn follower_walks_toward_a_distant_teammate() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());
        let mate = AgentId::new("mate");

        let hello = Envelope::new(mate.clone(), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        let pos = Envelope::new(mate.clone(), ms(0), TeamMessage::Position(Position::new(0, 3)));
        p.handle_message(pos, ms(0), &mut out).unwrap();
        p.carried.push((ParcelId::new("c"), DecayingValue::constant(5.0)));
        world.carried.push(ParcelId::new("c"));

        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Follow(mate.clone()));
        assert_eq!(trace.actions[0], Action::Moved(Direction::Right));
        assert_eq!(p.following(), Some(&mate));

        p.tick(ms(1), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(trace.actions[1], Action::Moved(Direction::Right));

        // One tile away: drop everything.
        let d = p.tick(ms(2), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Follow(mate));
        assert_eq!(trace.actions[2], Action::PutDown(1));
        assert_eq!(world.free, vec![(ParcelId::new("c"), Position::new(0, 2))]);
        assert!(p.following().is_none());
    }

    /// A player carrying one parcel, with a teammate on the roster at
    /// `mate_at`, planning as soon as it moves.
    fn carrier(ascii: &str, at: Position, mate_at: Position) -> (crate::Player, World, Outbox, AgentId) {
        let cfg = pd_core::AgentConfig { min_parcels_to_start: 0, ..config() };
        let e = engine(ascii, &cfg);
        let mut p = crate::PlayerBuilder::new("me", e.clone(), cfg).position(at).build().unwrap();
        let mut world = World::new(&e, at);
        let mut out = Outbox::default();
        let mate = AgentId::new("mate");

        let hello = Envelope::new(mate.clone(), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        let pos = Envelope::new(mate.clone(), ms(0), TeamMessage::Position(mate_at));
        p.handle_message(pos, ms(0), &mut out).unwrap();

        p.carried.push((ParcelId::new("c"), DecayingValue::constant(5.0)));
        world.carried.push(ParcelId::new("c"));
        out.sent.clear();
        (p, world, out, mate)
    }

    fn ignore_flags(out: &Outbox) -> Vec<bool> {
        out.sent
            .iter()
            .filter_map(|(_, e)| match e.message {
                TeamMessage::IgnoreMe(flag) => Some(flag),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn blocked_delivery_with_another_left_explores() {
        let (mut p, mut world, mut out, _) = carrier("D.S.D", Position::new(0, 1), Position::new(0, 3));
        p.paths.mark_blocked(Position::new(0, 0));
        let mut trace = Trace::default();

        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        let Decision::Explore(target) = d else {
            panic!("expected exploration, got {d:?}");
        };
        assert_ne!(target, Position::new(0, 0));
        assert!(p.planner().is_started());
        assert!(p.following().is_none());
        assert!(ignore_flags(&out).is_empty());
        assert_eq!(p.carried().len(), 1);
    }

    #[test]
    fn every_delivery_blocked_hands_over_instead() {
        let (mut p, mut world, mut out, mate) = carrier("S...D", Position::new(0, 3), Position::new(0, 0));
        p.paths.mark_blocked(Position::new(0, 4));
        let mut trace = Trace::default();

        let d = p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();
        assert_eq!(d, Decision::Follow(mate.clone()));
        assert_eq!(p.following(), Some(&mate));
        assert_eq!(ignore_flags(&out), vec![true]);
        assert_eq!(trace.actions[0], Action::Moved(Direction::Left));
    }

    #[test]
    fn bids_are_per_visit_means() {
        let e = engine("....D", &config());
        let mut p = player(&e, Position::new(0, 0));
        let mut world = World::new(&e, Position::new(0, 0));
        world.spawn("p0", Position::new(0, 2));
        let (mut out, mut trace) = (Outbox::default(), Trace::default());

        let hello = Envelope::new(AgentId::new("mate"), ms(0), TeamMessage::Hello { proof: String::new() });
        p.handle_message(hello, ms(0), &mut out).unwrap();
        p.on_parcel_sensing(&world.sense(5), ms(0), &mut out);
        p.tick(ms(0), &mut world, &mut out, &mut trace).unwrap();

        let pickup = Intention::pickup(Position::new(0, 2));
        let bid = out
            .sent
            .iter()
            .find_map(|(_, e)| match &e.message {
                TeamMessage::Intentions(list) => list.iter().find(|(i, _)| *i == pickup).map(|(_, u)| *u),
                _ => None,
            })
            .unwrap();
        // The planner ran its warm-up, yet the bid is one parcel's worth.
        let total = p.planner().compute_intention_utilities(ms(0)).unwrap()[0].1;
        assert!(total > 10.0);
        assert!((bid - 10.0).abs() < 1e-9, "bid {bid}");
    }

    #[test]
    fn explores_when_nothing_is_known() {
        let e = engine("S...D", &config());
        let mut p = player(&e, Position::new(0, 4));
        let mut world = World::new(&e, Position::new(0, 4));
        let mut trace = Trace::default();

        let d = p.tick(ms(0), &mut world, &mut NoopMessenger, &mut trace).unwrap();
        let Decision::Explore(target) = d else {
            panic!("expected exploration, got {d:?}");
        };
        assert_ne!(target, Position::new(0, 4));
        assert_eq!(trace.actions[0], Action::Moved(Direction::Left));
        assert!(!p.planner().is_started());

        // The target is kept across ticks.
        let d = p.tick(ms(1), &mut world, &mut NoopMessenger, &mut trace).unwrap();
        if world.pos != target {
            assert_eq!(d, Decision::Explore(target));
        }
    }
}
