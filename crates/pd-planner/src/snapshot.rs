//! Frozen view of the free parcels the planner searches over.
//!
//! The tree never reads the live belief set.  It is built against one
//! snapshot and rebuilt (see `Planner::refresh`) when the parcels change.

use rustc_hash::FxHashMap;

use pd_belief::{BeliefSet, Parcel};
use pd_core::{DecayingValue, ParcelId, Position, Timestamp};

#[derive(Clone, Debug, Default)]
pub struct WorldSnapshot {
    by_position: FxHashMap<Position, Vec<(ParcelId, DecayingValue)>>,
}

impl WorldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every free parcel still worth something at `now`.
    pub fn capture(belief: &BeliefSet, now: Timestamp) -> Self {
        Self::from_parcels(belief.parcels().iter().filter(|p| p.value_at(now) > 0.0))
    }

    pub fn from_parcels<'a, I>(parcels: I) -> Self
    where
        I: IntoIterator<Item = &'a Parcel>,
    {
        let mut snap = Self::new();
        for p in parcels {
            snap.insert(p.position, p.id.clone(), p.value);
        }
        snap
    }

    pub fn insert(&mut self, pos: Position, id: ParcelId, value: DecayingValue) {
        self.by_position.entry(pos).or_default().push((id, value));
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    pub fn parcel_count(&self) -> usize {
        self.by_position.values().map(Vec::len).sum()
    }

    /// Tiles holding parcels, sorted.
    pub fn positions(&self) -> Vec<Position> {
        let mut out: Vec<Position> = self.by_position.keys().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn parcels_at(&self, pos: Position) -> &[(ParcelId, DecayingValue)] {
        self.by_position.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total value of the parcels on `pos` at `t`.
    pub fn value_at(&self, pos: Position, t: Timestamp) -> f64 {
        self.parcels_at(pos).iter().map(|(_, v)| v.value_at(t)).sum()
    }
}
