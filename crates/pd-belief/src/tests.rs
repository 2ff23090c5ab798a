//! Unit tests for pd-belief.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use pd_core::{AgentConfig, AgentId};
    use pd_spatial::{DistanceEngine, GridMap};

    use crate::BeliefSet;

    pub fn engine(ascii: &str) -> Arc<DistanceEngine> {
        let map = GridMap::from_ascii(ascii).unwrap();
        Arc::new(DistanceEngine::build(map, &AgentConfig::default()).unwrap())
    }

    /// 5×5 field, spawn in the top-left corner, delivery bottom-right.
    pub fn field() -> BeliefSet {
        BeliefSet::new(
            engine(
                "
                S....
                .....
                .....
                .....
                ....D
                ",
            ),
            &AgentConfig::default(),
            AgentId::new("me"),
        )
    }
}

// ── Parcels ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod parcels {
    use pd_core::{AgentId, ParcelId, Position, Timestamp};

    use super::helpers::field;
    use crate::{NoopBeliefObserver, ParcelIndex, ParcelObservation, RecordingObserver};

    fn p(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn new_parcels_fire_one_batch() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        let seen = [
            ParcelObservation::free("p1", p(1, 1), 10.0),
            ParcelObservation::free("p2", p(2, 2), 20.0),
        ];
        let changes = belief.update_parcels(&seen, p(0, 0), Timestamp(0), &mut rec);
        assert_eq!(changes.new.len(), 2);
        assert_eq!(rec.parcel_batches.len(), 1);
        assert_eq!(belief.parcels().len(), 2);

        // The same report again changes nothing.
        belief.update_parcels(&seen, p(0, 0), Timestamp(100), &mut rec);
        assert_eq!(rec.parcel_batches.len(), 1);
    }

    #[test]
    fn relocation_keeps_position_index_consistent() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        belief.update_parcels(&[ParcelObservation::free("p1", p(1, 1), 10.0)], p(0, 0), Timestamp(0), &mut rec);
        belief.update_parcels(&[ParcelObservation::free("p1", p(1, 2), 10.0)], p(0, 0), Timestamp(0), &mut rec);

        let batch = &rec.parcel_batches[1];
        assert_eq!(batch.moved, vec![(ParcelId::new("p1"), p(1, 1), p(1, 2))]);
        let index = belief.parcels();
        assert_eq!(index.ids_at(p(1, 1)).count(), 0);
        assert_eq!(index.ids_at(p(1, 2)).cloned().collect::<Vec<_>>(), vec![ParcelId::new("p1")]);
        assert_eq!(index.occupied_positions().count(), 1);
    }

    #[test]
    fn vanished_in_range_is_removed_out_of_range_kept() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let seen = [
            ParcelObservation::free("near", p(1, 0), 10.0),
            ParcelObservation::free("far", p(4, 3), 10.0),
        ];
        belief.update_parcels(&seen, p(0, 0), Timestamp(0), &mut obs);

        // Reporter at (0,0) sees neither: "near" is within 5, "far" is 7 away.
        let changes = belief.update_parcels(&[], p(0, 0), Timestamp(0), &mut obs);
        assert_eq!(changes.removed, vec![ParcelId::new("near")]);
        assert!(belief.parcels().contains(&ParcelId::new("far")));
    }

    #[test]
    fn carried_parcels_leave_the_index() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        let seen = [
            ParcelObservation::free("mine", p(1, 1), 10.0),
            ParcelObservation::free("theirs", p(1, 2), 10.0),
        ];
        belief.update_parcels(&seen, p(0, 0), Timestamp(0), &mut rec);

        let carried = [
            ParcelObservation::carried("mine", p(1, 1), 10.0, AgentId::new("me")),
            ParcelObservation::carried("theirs", p(1, 2), 10.0, AgentId::new("rival")),
        ];
        let changes = belief.update_parcels(&carried, p(0, 0), Timestamp(0), &mut rec);
        assert!(belief.parcels().is_empty());
        // Our own pickup is not reported as lost.
        assert_eq!(changes.removed, vec![ParcelId::new("theirs")]);
    }

    #[test]
    fn expired_parcels_are_dropped_inline_and_on_timer() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        // Default decay: one unit per second.
        let seen = [
            ParcelObservation::free("a", p(3, 3), 2.0),
            ParcelObservation::free("b", p(3, 4), 5.0),
        ];
        belief.update_parcels(&seen, p(4, 4), Timestamp(0), &mut rec);

        assert_eq!(belief.purge_if_due(Timestamp(500), &mut rec), 0, "not due yet");
        assert_eq!(belief.purge_expired(Timestamp(2_000), &mut rec), 1);
        assert!(!belief.parcels().contains(&ParcelId::new("a")));

        // Inline: a report far from "b" still drops it once it is worth zero.
        let changes = belief.update_parcels(&[], p(0, 0), Timestamp(6_000), &mut rec);
        assert_eq!(changes.removed, vec![ParcelId::new("b")]);
    }

    #[test]
    fn fresh_observation_reanchors_value() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        belief.update_parcels(&[ParcelObservation::free("a", p(1, 1), 10.0)], p(0, 0), Timestamp(0), &mut obs);
        belief.update_parcels(&[ParcelObservation::free("a", p(1, 1), 8.0)], p(0, 0), Timestamp(3_000), &mut obs);
        let parcel = belief.parcels().get(&ParcelId::new("a")).unwrap();
        assert_eq!(parcel.value_at(Timestamp(3_000)), 8.0);
        assert_eq!(parcel.value_at(Timestamp(4_000)), 7.0);
    }

    #[test]
    fn take_picked_up_is_silent() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        belief.update_parcels(&[ParcelObservation::free("a", p(1, 1), 10.0)], p(0, 0), Timestamp(0), &mut rec);
        let taken = belief.take_picked_up(&[ParcelId::new("a"), ParcelId::new("ghost")]);
        assert_eq!(taken.len(), 1);
        assert!(belief.parcels().is_empty());
        assert_eq!(rec.parcel_batches.len(), 1);
    }

    #[test]
    fn index_replace_on_insert() {
        use crate::Parcel;
        use pd_core::Decay;

        let mut index = ParcelIndex::new();
        let id = ParcelId::new("x");
        index.insert(Parcel::new(id.clone(), p(0, 0), 1.0, Timestamp(0), Decay::None));
        index.insert(Parcel::new(id.clone(), p(2, 2), 1.0, Timestamp(0), Decay::None));
        assert_eq!(index.len(), 1);
        assert_eq!(index.ids_at(p(0, 0)).count(), 0);
        assert_eq!(index.ids_at(p(2, 2)).count(), 1);
        assert_eq!(index.relocate(&ParcelId::new("nope"), p(1, 1)), None);
    }
}

// ── Agents ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod agents {
    use pd_core::{AgentId, Position, Timestamp};

    use super::helpers::field;
    use crate::{AgentObservation, NoopBeliefObserver, RecordingObserver};

    fn me() -> AgentId {
        AgentId::new("me")
    }

    #[test]
    fn occupied_set_fires_only_on_difference() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        let seen = [AgentObservation::new("rival", Position::new(2, 2), 0.0)];
        assert!(belief.update_agents(&seen, &me(), Timestamp(0), &mut rec));
        assert_eq!(rec.occupied_updates.len(), 1);
        assert!(belief.is_occupied(Position::new(2, 2)));

        belief.update_agents(&seen, &me(), Timestamp(100), &mut rec);
        assert_eq!(rec.occupied_updates.len(), 1);

        let moved = [AgentObservation::new("rival", Position::new(2, 3), 0.0)];
        belief.update_agents(&moved, &me(), Timestamp(200), &mut rec);
        assert_eq!(rec.occupied_updates.len(), 2);
    }

    #[test]
    fn self_is_never_tracked() {
        let mut belief = field();
        let seen = [AgentObservation::new("me", Position::new(0, 0), 0.0)];
        belief.update_agents(&seen, &me(), Timestamp(0), &mut NoopBeliefObserver);
        assert_eq!(belief.agents().count(), 0);
        assert!(belief.occupied().is_empty());
    }

    #[test]
    fn stale_reports_are_ignored() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let mate = AgentId::new("mate");
        let now = [AgentObservation::new("rival", Position::new(1, 1), 0.0)];
        let old = [AgentObservation::new("rival", Position::new(3, 3), 0.0)];
        assert!(belief.update_agents(&now, &mate, Timestamp(1_000), &mut obs));
        assert!(!belief.update_agents(&old, &mate, Timestamp(500), &mut obs));
        assert_eq!(belief.agent(&AgentId::new("rival")).unwrap().position, Position::new(1, 1));
    }

    #[test]
    fn newer_report_from_other_reporter_wins_and_earliest_first_seen_kept() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let a = [AgentObservation::new("rival", Position::new(1, 1), 5.0)];
        let b = [AgentObservation::new("rival", Position::new(1, 2), 7.0)];
        belief.update_agents(&a, &AgentId::new("mate"), Timestamp(2_000), &mut obs);
        belief.update_agents(&b, &me(), Timestamp(1_000), &mut obs);

        let rival = belief.agent(&AgentId::new("rival")).unwrap();
        // Our report is older: position stays, first_seen moves back.
        assert_eq!(rival.position, Position::new(1, 1));
        assert_eq!(rival.first_seen, Timestamp(1_000));
        assert_eq!(rival.reporter, AgentId::new("mate"));
    }

    #[test]
    fn silent_reporter_prunes_its_agents() {
        let mut belief = field();
        let mut rec = RecordingObserver::default();
        let mate = AgentId::new("mate");
        let seen = [
            AgentObservation::new("r1", Position::new(1, 1), 0.0),
            AgentObservation::new("r2", Position::new(3, 3), 0.0),
        ];
        belief.update_agents(&seen, &mate, Timestamp(0), &mut rec);
        belief.update_agents(&seen[..1], &mate, Timestamp(100), &mut rec);
        assert!(belief.agent(&AgentId::new("r2")).is_none());
        assert!(!belief.is_occupied(Position::new(3, 3)));

        // Another reporter's silence does not prune r1.
        belief.update_agents(&[], &me(), Timestamp(200), &mut rec);
        assert!(belief.agent(&AgentId::new("r1")).is_some());
    }

    #[test]
    fn slow_scorers_are_classified_random() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let at = |score: f64| [
            AgentObservation::new("lazy", Position::new(1, 1), score),
        ];
        belief.update_agents(&at(0.0), &me(), Timestamp(0), &mut obs);
        belief.update_agents(&at(1.0), &me(), Timestamp(5_000), &mut obs);
        assert!(!belief.agent(&AgentId::new("lazy")).unwrap().is_random, "window too short");
        belief.update_agents(&at(2.0), &me(), Timestamp(12_000), &mut obs);
        assert!(belief.agent(&AgentId::new("lazy")).unwrap().is_random);
    }

    #[test]
    fn fast_scorers_are_rational() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let at = |score: f64| [
            AgentObservation::new("pro", Position::new(1, 1), score),
        ];
        belief.update_agents(&at(0.0), &me(), Timestamp(0), &mut obs);
        belief.update_agents(&at(200.0), &me(), Timestamp(12_000), &mut obs);
        assert!(!belief.agent(&AgentId::new("pro")).unwrap().is_random);
    }

    #[test]
    fn teammates_are_never_random() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        belief.add_teammate(AgentId::new("mate"), Timestamp(0));
        let at = |score: f64| [AgentObservation::new("mate", Position::new(1, 1), score)];
        belief.update_agents(&at(0.0), &me(), Timestamp(0), &mut obs);
        belief.update_agents(&at(0.0), &me(), Timestamp(20_000), &mut obs);
        assert!(!belief.agent(&AgentId::new("mate")).unwrap().is_random);
    }

    #[test]
    fn routes_avoid_occupied_tiles() {
        let mut belief = field();
        let mut obs = NoopBeliefObserver;
        let wall: Vec<_> = (0..4)
            .map(|c| AgentObservation::new(format!("r{c}"), Position::new(2, c), 0.0))
            .collect();
        belief.update_agents(&wall, &me(), Timestamp(0), &mut obs);

        let path = belief.recompute_path(Position::new(0, 0), Position::new(4, 0)).unwrap();
        let mut pos = Position::new(0, 0);
        for d in &path {
            pos = pos.step(*d);
            assert!(!belief.is_occupied(pos));
        }
        assert_eq!(pos, Position::new(4, 0));
        assert_eq!(path.len(), 12);
    }
}

// ── Team ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod team {
    use pd_core::{AgentId, Intention, Position, Timestamp};

    use super::helpers::field;
    use crate::{BeliefError, RecordingObserver, TeamRoster};

    #[test]
    fn unknown_teammate_errors() {
        let belief = field();
        assert!(matches!(
            belief.teammate(&AgentId::new("ghost")),
            Err(BeliefError::TeamMateNotFound(_))
        ));
        let mut roster = TeamRoster::new();
        assert!(roster.set_ignore(&AgentId::new("ghost"), true, Timestamp(0)).is_err());
    }

    #[test]
    fn self_cannot_join() {
        let mut belief = field();
        assert!(!belief.add_teammate(AgentId::new("me"), Timestamp(0)));
        assert!(belief.team().is_empty());
    }

    #[test]
    fn mutations_refresh_last_heard() {
        let mut belief = field();
        let mate = AgentId::new("mate");
        assert!(belief.add_teammate(mate.clone(), Timestamp(0)));
        assert!(!belief.add_teammate(mate.clone(), Timestamp(10)));

        let mut rec = RecordingObserver::default();
        belief.update_teammate_position(&mate, Position::new(1, 1), Timestamp(100), &mut rec).unwrap();
        assert_eq!(belief.teammate(&mate).unwrap().last_heard, Timestamp(100));
        assert!(belief.is_occupied(Position::new(1, 1)));
        assert_eq!(rec.occupied_updates.len(), 1);

        let ints = vec![(Intention::pickup(Position::new(2, 2)), 4.0)];
        belief.update_teammate_intentions(&mate, ints.clone(), Timestamp(200)).unwrap();
        let m = belief.teammate(&mate).unwrap();
        assert_eq!(m.intentions, ints);
        assert_eq!(m.last_heard, Timestamp(200));

        belief.record_teammate_activity(&mate, Timestamp(300)).unwrap();
        assert_eq!(belief.teammate(&mate).unwrap().last_heard, Timestamp(300));
    }

    #[test]
    fn active_excludes_ignored_and_silent() {
        let mut belief = field();
        for id in ["a", "b", "c"] {
            belief.add_teammate(AgentId::new(id), Timestamp(0));
        }
        belief.set_teammate_ignore(&AgentId::new("b"), true, Timestamp(4_000)).unwrap();
        belief.record_teammate_activity(&AgentId::new("c"), Timestamp(4_000)).unwrap();

        // Default timeout is 5 s: "a" went silent at t=0.
        let active: Vec<_> = belief
            .active_teammates(Timestamp(6_000))
            .into_iter()
            .map(|m| m.id.as_str().to_string())
            .collect();
        assert_eq!(active, vec!["c".to_string()]);
    }

    #[test]
    fn removing_a_mate_frees_its_tile() {
        let mut belief = field();
        let mate = AgentId::new("mate");
        let mut rec = RecordingObserver::default();
        belief.add_teammate(mate.clone(), Timestamp(0));
        belief.update_teammate_position(&mate, Position::new(3, 3), Timestamp(0), &mut rec).unwrap();
        belief.remove_teammate(&mate, &mut rec).unwrap();
        assert!(!belief.is_occupied(Position::new(3, 3)));
        assert!(belief.remove_teammate(&mate, &mut rec).is_err());
    }
}

// ── Promise ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod promise {
    use pd_core::Position;

    use super::helpers::{engine, field};

    #[test]
    fn weight_peaks_at_spawn() {
        let belief = field();
        let engine = belief.engine();
        let at_spawn = belief.promise().weight(engine, Position::new(0, 0)).unwrap();
        let near = belief.promise().weight(engine, Position::new(1, 1)).unwrap();
        let far = belief.promise().weight(engine, Position::new(4, 4)).unwrap();
        assert!(at_spawn > near && near > far);
        assert!((at_spawn - 1.0).abs() < 1e-12);
        assert!(belief.promise().weight(engine, Position::new(9, 9)).is_none());
    }

    #[test]
    fn top_k_returns_the_best_k() {
        let belief = field();
        let engine = belief.engine();
        let from = Position::new(4, 4);
        let all = belief.promise().penalized(engine, [from]);

        for k in [0, 1, 3, 25, 40] {
            let chosen = belief.promising_positions(from, k);
            assert_eq!(chosen.len(), k.min(engine.node_count()), "k = {k}");
            let floor = chosen.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
            for (i, &p) in engine.positions().iter().enumerate() {
                if !chosen.iter().any(|c| c.0 == p) {
                    assert!(all[i] <= floor, "unreturned {p} outweighs a returned tile");
                }
            }
        }
    }

    #[test]
    fn top_k_spans_every_component() {
        use pd_core::{AgentConfig, AgentId};

        let belief = crate::BeliefSet::new(engine("S.#.D"), &AgentConfig::default(), AgentId::new("me"));
        let from = Position::new(0, 0);
        let chosen = belief.promising_positions(from, 10);
        assert_eq!(chosen.len(), 4);
        assert!(chosen.iter().any(|c| c.0 == Position::new(0, 4)));
        assert_eq!(belief.distance(from, Position::new(0, 4)), None);
    }

    #[test]
    fn agents_push_exploration_away() {
        let belief = field();
        let engine = belief.engine();
        let clear = belief.promise().penalized(engine, std::iter::empty());
        let crowded = belief.promise().penalized(engine, [Position::new(0, 0)]);
        let i = engine.index_of(Position::new(0, 0)).unwrap();
        assert!(crowded[i] < clear[i]);
        let far = engine.index_of(Position::new(4, 4)).unwrap();
        assert_eq!(crowded[far], clear[far]);
    }
}
