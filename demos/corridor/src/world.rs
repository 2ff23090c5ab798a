//! In-process stand-in for the game server.
//!
//! Holds every agent's body and every parcel.  Parcels decay with the same
//! rule the agents assume, spawn on `S` tiles, and score for whoever drops
//! them on a `D` tile.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use pd_belief::{AgentObservation, ParcelObservation};
use pd_core::{AgentId, AgentRng, Decay, DecayingValue, Direction, ParcelId, Position, Timestamp};
use pd_player::Actuators;
use pd_spatial::DistanceEngine;

pub struct Body {
    pub id:        AgentId,
    pub pos:       Position,
    pub score:     f64,
    pub delivered: usize,
}

struct WorldParcel {
    id:      ParcelId,
    pos:     Position,
    value:   DecayingValue,
    carrier: Option<usize>,
}

pub struct World {
    engine:      Arc<DistanceEngine>,
    decay:       Decay,
    rng:         AgentRng,
    pub bodies:  Vec<Body>,
    parcels:     Vec<WorldParcel>,
    next_parcel: u64,
}

impl World {
    pub fn new(engine: Arc<DistanceEngine>, decay: Decay, seed: u64) -> Self {
        Self {
            engine,
            decay,
            rng: AgentRng::from_seed(seed),
            bodies: Vec::new(),
            parcels: Vec::new(),
            next_parcel: 0,
        }
    }

    pub fn add_agent(&mut self, id: AgentId, pos: Position) -> usize {
        self.bodies.push(Body { id, pos, score: 0.0, delivered: 0 });
        self.bodies.len() - 1
    }

    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    /// Drop a parcel on a random free spawn tile.
    pub fn spawn(&mut self, reward: f64, now: Timestamp) {
        let taken: FxHashSet<Position> = self
            .parcels
            .iter()
            .filter(|p| p.carrier.is_none())
            .map(|p| p.pos)
            .collect();
        let open: Vec<Position> = self
            .engine
            .spawn_positions()
            .iter()
            .copied()
            .filter(|p| !taken.contains(p))
            .collect();
        let Some(&pos) = self.rng.choose(&open) else {
            return;
        };
        let id = ParcelId::new(format!("p{}", self.next_parcel));
        self.next_parcel += 1;
        log::debug!("spawned {id} ({reward}) at {pos}");
        self.parcels.push(WorldParcel {
            id,
            pos,
            value: DecayingValue::new(reward, now, self.decay),
            carrier: None,
        });
    }

    /// Remove parcels whose value has run out, carried or not.
    pub fn decay(&mut self, now: Timestamp) {
        self.parcels.retain(|p| !p.value.is_expired(now));
    }

    fn parcel_pos(&self, p: &WorldParcel) -> Position {
        p.carrier.map_or(p.pos, |c| self.bodies[c].pos)
    }

    pub fn sense_parcels(&self, agent: usize, range: u32, now: Timestamp) -> Vec<ParcelObservation> {
        let here = self.bodies[agent].pos;
        self.parcels
            .iter()
            .filter(|p| here.manhattan(self.parcel_pos(p)) < range)
            .map(|p| {
                let pos = self.parcel_pos(p);
                let reward = p.value.value_at(now);
                match p.carrier {
                    Some(c) => ParcelObservation::carried(p.id.clone(), pos, reward, self.bodies[c].id.clone()),
                    None => ParcelObservation::free(p.id.clone(), pos, reward),
                }
            })
            .collect()
    }

    pub fn sense_agents(&self, agent: usize, range: u32) -> Vec<AgentObservation> {
        let here = self.bodies[agent].pos;
        self.bodies
            .iter()
            .enumerate()
            .filter(|&(i, b)| i != agent && here.manhattan(b.pos) < range)
            .map(|(_, b)| AgentObservation::new(b.id.clone(), b.pos, b.score))
            .collect()
    }

    /// Actuators bound to one agent for one tick.
    pub fn avatar(&mut self, agent: usize, now: Timestamp) -> Avatar<'_> {
        Avatar { world: self, agent, now }
    }
}

// ── Avatar ────────────────────────────────────────────────────────────────────

pub struct Avatar<'w> {
    world: &'w mut World,
    agent: usize,
    now:   Timestamp,
}

impl Actuators for Avatar<'_> {
    fn move_to(&mut self, direction: Direction) -> bool {
        let next = self.world.bodies[self.agent].pos.step(direction);
        if !self.world.engine.is_crossable(next) || self.world.bodies.iter().any(|b| b.pos == next) {
            return false;
        }
        self.world.bodies[self.agent].pos = next;
        true
    }

    fn pickup(&mut self) -> FxHashSet<ParcelId> {
        let here = self.world.bodies[self.agent].pos;
        let mut picked = FxHashSet::default();
        for p in &mut self.world.parcels {
            if p.carrier.is_none() && p.pos == here {
                p.carrier = Some(self.agent);
                picked.insert(p.id.clone());
            }
        }
        picked
    }

    fn putdown(&mut self, parcels: Option<&[ParcelId]>) -> FxHashSet<ParcelId> {
        let here = self.world.bodies[self.agent].pos;
        let on_delivery = self.world.engine.delivery_positions().contains(&here);
        let agent = self.agent;
        let chosen = |p: &WorldParcel| {
            p.carrier == Some(agent) && parcels.is_none_or(|ids| ids.contains(&p.id))
        };

        let dropped: FxHashSet<ParcelId> =
            self.world.parcels.iter().filter(|&p| chosen(p)).map(|p| p.id.clone()).collect();
        if on_delivery {
            let gained: f64 = self
                .world
                .parcels
                .iter()
                .filter(|&p| chosen(p))
                .map(|p| p.value.value_at(self.now))
                .sum();
            let body = &mut self.world.bodies[agent];
            body.score += gained;
            body.delivered += dropped.len();
            self.world.parcels.retain(|p| !dropped.contains(&p.id));
        } else {
            for p in self.world.parcels.iter_mut().filter(|p| dropped.contains(&p.id)) {
                p.carrier = None;
                p.pos = here;
            }
        }
        dropped
    }
}
