//! Per-parcel discount factors.
//!
//! After every assignment round each parcel at a contested pickup tile gets
//! its factor nudged: up when this agent won the tile, down when a teammate
//! did.  Pickup utilities are scaled by the tile's mean factor, so an agent
//! that already holds a tile keeps it and one that lost it stops bidding as
//! hard.  This damps the flip-flopping two teammates otherwise show over a
//! pair of nearly equal parcels.

use rustc_hash::FxHashMap;

use pd_core::{AgentConfig, ParcelId};

pub struct DiscountFactors {
    factors: FxHashMap<ParcelId, f64>,
    step:    f64,
    min:     f64,
    max:     f64,
}

impl DiscountFactors {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            factors: FxHashMap::default(),
            step:    config.discount_step,
            min:     config.discount_min,
            max:     config.discount_max,
        }
    }

    /// Current factor; `1.0` for parcels never nudged.
    #[inline]
    pub fn factor(&self, id: &ParcelId) -> f64 {
        self.factors.get(id).copied().unwrap_or(1.0)
    }

    /// Mean factor over `ids`; `1.0` if empty.
    pub fn mean<'a, I>(&self, ids: I) -> f64
    where
        I: IntoIterator<Item = &'a ParcelId>,
    {
        let (sum, n) = ids
            .into_iter()
            .fold((0.0, 0usize), |(s, n), id| (s + self.factor(id), n + 1));
        if n == 0 { 1.0 } else { sum / n as f64 }
    }

    /// Move `id`'s factor one step toward `max` (`won`) or `min`.
    pub fn nudge(&mut self, id: &ParcelId, won: bool) {
        let f = self.factor(id);
        let next = if won { f * (1.0 + self.step) } else { f * (1.0 - self.step) };
        self.factors.insert(id.clone(), next.clamp(self.min, self.max));
    }

    /// Drop `id` straight to the floor: a teammate is collecting it.
    pub fn concede(&mut self, id: &ParcelId) {
        self.factors.insert(id.clone(), self.min);
    }

    /// Forget every parcel for which `keep` is false.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&ParcelId) -> bool,
    {
        self.factors.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
