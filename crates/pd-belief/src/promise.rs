//! Exploration promise.
//!
//! Parcels appear on spawn tiles, so a tile is worth exploring in proportion
//! to how many spawn tiles lie near it.  The static weight of a tile is a sum
//! of Gaussian kernels, one per spawn tile:
//!
//! ```text
//! w(p) = Σ_s exp(−‖p − s‖² / 2σ²)
//! ```
//!
//! Kernels are truncated at 3σ and evaluated only on the tiles the grid's
//! R-tree returns for that radius.  At query time a second kernel is
//! subtracted around every visible agent so the team spreads out instead of
//! converging on the same hot spot.

use pd_core::{AgentConfig, Position};
use pd_spatial::DistanceEngine;

#[inline]
fn gaussian(d2: f64, sigma: f64) -> f64 {
    (-d2 / (2.0 * sigma * sigma)).exp()
}

#[inline]
fn squared(a: Position, b: Position) -> f64 {
    let dr = (a.row - b.row) as f64;
    let dc = (a.col - b.col) as f64;
    dr * dr + dc * dc
}

pub struct PromiseMap {
    /// Indexed by `DistanceEngine::index_of`.
    weights:        Vec<f64>,
    penalty_sigma:  f64,
    penalty_radius: f64,
    penalty_weight: f64,
}

impl PromiseMap {
    pub fn build(engine: &DistanceEngine, config: &AgentConfig) -> Self {
        let mut weights = vec![0.0; engine.node_count()];
        let sigma = config.promise_sigma;
        for &spawn in engine.spawn_positions() {
            for pos in engine.map().tiles_within(spawn, 3.0 * sigma) {
                if let Some(i) = engine.index_of(pos) {
                    weights[i] += gaussian(squared(pos, spawn), sigma);
                }
            }
        }
        Self {
            weights,
            penalty_sigma:  config.agent_penalty_sigma,
            penalty_radius: config.agent_penalty_radius,
            penalty_weight: config.agent_penalty_weight,
        }
    }

    /// Static weight of a walkable tile.
    pub fn weight(&self, engine: &DistanceEngine, pos: Position) -> Option<f64> {
        engine.index_of(pos).map(|i| self.weights[i])
    }

    /// Weights after subtracting the penalty kernel around every agent in
    /// `agents`.
    pub fn penalized<I>(&self, engine: &DistanceEngine, agents: I) -> Vec<f64>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut out = self.weights.clone();
        for agent in agents {
            for pos in engine.map().tiles_within(agent, self.penalty_radius) {
                if let Some(i) = engine.index_of(pos) {
                    out[i] -= self.penalty_weight * gaussian(squared(pos, agent), self.penalty_sigma);
                }
            }
        }
        out
    }

    /// The `k` highest-weight tiles of the whole map, in no particular
    /// order.  Reachability is left to the caller.
    ///
    /// Uses quickselect rather than a full sort.  Equal weights are ordered
    /// by position so the result is deterministic.
    pub fn top_k<I>(
        &self,
        engine: &DistanceEngine,
        k:      usize,
        agents: I,
    ) -> Vec<(Position, f64)>
    where
        I: IntoIterator<Item = Position>,
    {
        let weights = self.penalized(engine, agents);
        let mut candidates: Vec<(Position, f64)> = engine
            .positions()
            .iter()
            .zip(weights)
            .map(|(&p, w)| (p, w))
            .collect();

        if k == 0 {
            return Vec::new();
        }
        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, |a, b| {
                b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
            });
            candidates.truncate(k);
        }
        candidates
    }
}
