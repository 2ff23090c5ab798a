//! Agent configuration.
//!
//! One `AgentConfig` is built at startup (typically from the game server's
//! handshake plus command-line overrides in the application crate) and
//! passed by reference to the distance engine, belief set, planner, and
//! control loop.  Nothing reads configuration from global state.

use crate::{CoreError, CoreResult, Decay};

/// How the control loop reconciles a blocked route.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathReconciliation {
    /// A* over the static graph, avoiding occupied tiles.
    #[default]
    AStar,
    /// Delegate to an externally supplied path solver.
    External,
}

/// Every tunable the decision engine reads.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AgentConfig {
    // ── World rules ───────────────────────────────────────────────────────
    /// Time one step takes.
    pub movement_duration_ms: u64,

    /// A parcel loses one unit of value every this many ms.  `None` means
    /// parcels never decay.
    pub parcel_decay_interval_ms: Option<u64>,

    /// Parcels strictly closer than this (manhattan) are visible.
    pub parcel_sensing_distance: u32,

    /// Agents strictly closer than this (manhattan) are visible.
    pub agent_sensing_distance: u32,

    /// Mean time between parcel spawns.
    pub parcel_spawn_interval_ms: u64,

    /// Mean reward of a freshly spawned parcel.
    pub parcel_reward_avg: f64,

    /// Number of agents on our team, including self.
    pub team_size: usize,

    // ── Exploration ───────────────────────────────────────────────────────
    /// Width of the Gaussian kernel centered at each spawn tile.
    pub promise_sigma: f64,

    /// Width of the Gaussian penalty centered at each visible agent.
    pub agent_penalty_sigma: f64,

    /// Tiles farther than this (euclidean) from an agent get no penalty.
    pub agent_penalty_radius: f64,

    /// Peak of the agent penalty kernel.
    pub agent_penalty_weight: f64,

    /// How many promising tiles the exploration fallback considers.
    pub exploration_candidates: usize,

    // ── Planner ───────────────────────────────────────────────────────────
    /// UCT exploration constant.
    pub uct_constant: f64,

    /// Tree iterations run per control tick.
    pub iterations_per_tick: usize,

    /// Tree iterations run before the first move.
    pub warmup_iterations: usize,

    /// Sensed parcels required before the planner starts.
    pub min_parcels_to_start: usize,

    /// Arena size above which re-rooting garbage is reclaimed.
    pub max_tree_nodes: usize,

    // ── Team ──────────────────────────────────────────────────────────────
    /// A teammate silent for longer than this is left out of assignment.
    pub teammate_timeout_ms: u64,

    /// Minimum observation window before an agent can be classified random.
    pub random_agent_min_observation_ms: u64,

    /// Multiplicative nudge applied to contested parcels each round.
    pub discount_step: f64,
    pub discount_min: f64,
    pub discount_max: f64,

    /// A following agent drops its parcels once this close to the leader.
    pub follow_distance: u32,

    // ── Housekeeping ──────────────────────────────────────────────────────
    /// Expired parcels are swept from the belief set at this period.
    pub purge_interval_ms: u64,

    pub path_reconciliation: PathReconciliation,

    /// Worker cap for the startup shortest-path computation.  `None` uses
    /// one worker per connected component.
    pub num_threads: Option<usize>,

    /// Master RNG seed.
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            movement_duration_ms:            500,
            parcel_decay_interval_ms:        Some(1_000),
            parcel_sensing_distance:         5,
            agent_sensing_distance:          5,
            parcel_spawn_interval_ms:        2_000,
            parcel_reward_avg:               30.0,
            team_size:                       1,
            promise_sigma:                   2.0,
            agent_penalty_sigma:             2.0,
            agent_penalty_radius:            4.0,
            agent_penalty_weight:            1.0,
            exploration_candidates:          5,
            uct_constant:                    std::f64::consts::SQRT_2,
            iterations_per_tick:             50,
            warmup_iterations:               200,
            min_parcels_to_start:            1,
            max_tree_nodes:                  200_000,
            teammate_timeout_ms:             5_000,
            random_agent_min_observation_ms: 10_000,
            discount_step:                   0.1,
            discount_min:                    0.5,
            discount_max:                    1.5,
            follow_distance:                 1,
            purge_interval_ms:               1_000,
            path_reconciliation:             PathReconciliation::AStar,
            num_threads:                     None,
            seed:                            42,
        }
    }
}

impl AgentConfig {
    /// Decay rate applied to every sensed parcel.
    #[inline]
    pub fn parcel_decay(&self) -> Decay {
        Decay::per_unit(self.parcel_decay_interval_ms)
    }

    /// Time to walk `steps` tiles.
    #[inline]
    pub fn travel_ms(&self, steps: u32) -> u64 {
        steps as u64 * self.movement_duration_ms
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.movement_duration_ms == 0 {
            return Err(CoreError::Config("movement_duration_ms must be > 0".into()));
        }
        if self.team_size == 0 {
            return Err(CoreError::Config("team_size must be ≥ 1".into()));
        }
        if self.promise_sigma <= 0.0 || self.agent_penalty_sigma <= 0.0 {
            return Err(CoreError::Config("kernel sigmas must be > 0".into()));
        }
        if self.agent_penalty_radius < 0.0 {
            return Err(CoreError::Config("agent_penalty_radius must be ≥ 0".into()));
        }
        if self.uct_constant < 0.0 {
            return Err(CoreError::Config("uct_constant must be ≥ 0".into()));
        }
        if !(0.0 < self.discount_min && self.discount_min <= 1.0 && 1.0 <= self.discount_max) {
            return Err(CoreError::Config(format!(
                "discount bounds must satisfy 0 < min ≤ 1 ≤ max (got {} / {})",
                self.discount_min, self.discount_max
            )));
        }
        if !(0.0..1.0).contains(&self.discount_step) {
            return Err(CoreError::Config("discount_step must be in [0, 1)".into()));
        }
        if self.num_threads == Some(0) {
            return Err(CoreError::Config("num_threads must be ≥ 1 when set".into()));
        }
        if self.exploration_candidates == 0 {
            return Err(CoreError::Config("exploration_candidates must be ≥ 1".into()));
        }
        Ok(())
    }
}
