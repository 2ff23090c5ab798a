//! Other agents seen on the map.
//!
//! # Random vs. rational
//!
//! Competitors in this game are either purposeful scavengers or agents that
//! wander at random.  Only the former are worth yielding a parcel to, so
//! every observed agent carries an `is_random` flag.  The flag compares the
//! agent's observed score growth against what a rational scavenger should
//! earn:
//!
//! ```text
//! trip      = (width + height) / 2 steps
//! net       = max(0, reward_avg − decay(trip · movement_duration))
//! expected  = net / spawn_interval / (team_size + 1)      [points per ms]
//! ```
//!
//! i.e. the share of the spawn stream one more agent would collect on top
//! of our own team.  An agent that has been watched for at least
//! `random_agent_min_observation_ms` and is scoring below `expected` is
//! presumed random.  Before that window it counts as rational.

use pd_core::{AgentConfig, AgentId, Position, Timestamp};

// ── Observations ──────────────────────────────────────────────────────────────

/// One agent as reported by a sensing event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentObservation {
    pub id:       AgentId,
    pub position: Position,
    pub score:    f64,
}

impl AgentObservation {
    pub fn new(id: impl Into<AgentId>, position: Position, score: f64) -> Self {
        Self { id: id.into(), position, score }
    }
}

// ── ObservedAgent ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ObservedAgent {
    pub id:          AgentId,
    pub position:    Position,
    pub score:       f64,
    /// Earliest report of this agent from any teammate.
    pub first_seen:  Timestamp,
    pub first_score: f64,
    /// Timestamp of the report `position` and `score` come from.
    pub last_seen:   Timestamp,
    /// Teammate (or self) whose report was applied last.
    pub reporter:    AgentId,
    pub is_random:   bool,
}

impl ObservedAgent {
    pub fn first_report(obs: &AgentObservation, reporter: &AgentId, at: Timestamp) -> Self {
        Self {
            id:          obs.id.clone(),
            position:    obs.position,
            score:       obs.score,
            first_seen:  at,
            first_score: obs.score,
            last_seen:   at,
            reporter:    reporter.clone(),
            is_random:   false,
        }
    }

    /// Points per ms since first seen; `None` before any time has passed.
    pub fn score_rate(&self) -> Option<f64> {
        let window = self.last_seen.since(self.first_seen);
        if window == 0 {
            return None;
        }
        Some((self.score - self.first_score) / window as f64)
    }
}

// ── Classifier ────────────────────────────────────────────────────────────────

/// Expected scoring rate of a rational scavenger, fixed for one map.
#[derive(Copy, Clone, Debug)]
pub struct RandomAgentClassifier {
    expected_rate:   f64,
    min_observation: u64,
}

impl RandomAgentClassifier {
    pub fn new(config: &AgentConfig, map_width: usize, map_height: usize) -> Self {
        let trip_steps = ((map_width + map_height) / 2) as u32;
        let lost = config.parcel_decay().loss(config.travel_ms(trip_steps) as i64);
        let net = (config.parcel_reward_avg - lost).max(0.0);
        let spawn = config.parcel_spawn_interval_ms.max(1) as f64;
        let expected_rate = net / spawn / (config.team_size as f64 + 1.0);
        Self { expected_rate, min_observation: config.random_agent_min_observation_ms }
    }

    #[inline]
    pub fn expected_rate(&self) -> f64 {
        self.expected_rate
    }

    pub fn is_random(&self, agent: &ObservedAgent) -> bool {
        if agent.last_seen.since(agent.first_seen) < self.min_observation {
            return false;
        }
        agent.score_rate().is_some_and(|rate| rate < self.expected_rate)
    }
}
