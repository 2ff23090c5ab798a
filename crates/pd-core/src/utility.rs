//! Time-aware accumulated reward used by tree backpropagation.
//!
//! A `Utility` is a scalar valid at `anchor` plus the multiset of parcels
//! whose delivery contributed to it.  Evaluating at another instant replays
//! every constituent parcel's decay between `anchor` and that instant and
//! adjusts the scalar accordingly, so a reward collected deep in the tree
//! can be re-expressed at an ancestor's arrival time.

use rustc_hash::FxHashMap;

use crate::{DecayingValue, ParcelId, Timestamp};

#[derive(Clone, Debug)]
pub struct Utility {
    value:   f64,
    /// Parcel → (its decaying value, multiplicity).
    parcels: FxHashMap<ParcelId, (DecayingValue, u32)>,
    anchor:  Timestamp,
}

impl Utility {
    /// No reward, anchored at `anchor`.
    pub fn zero(anchor: Timestamp) -> Self {
        Self { value: 0.0, parcels: FxHashMap::default(), anchor }
    }

    #[inline]
    pub fn anchor(&self) -> Timestamp {
        self.anchor
    }

    /// The raw scalar at the anchor instant.
    #[inline]
    pub fn raw(&self) -> f64 {
        self.value
    }

    /// Number of distinct parcels contributing.
    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    /// Replay the constituent parcels' decay from the anchor to `t`.
    pub fn value_at(&self, t: Timestamp) -> f64 {
        let decayed: f64 = self
            .parcels
            .values()
            .map(|(v, count)| (v.value_at(self.anchor) - v.value_at(t)) * *count as f64)
            .sum();
        (self.value - decayed).max(0.0)
    }

    /// Fold an instantaneous `reward` earned at `at` from `parcels` into a new
    /// utility anchored at `at`.
    ///
    /// `combine(r, ps, t).value_at(t) == self.value_at(t) + r`.
    pub fn combine<I>(&self, reward: f64, parcels: I, at: Timestamp) -> Utility
    where
        I: IntoIterator<Item = (ParcelId, DecayingValue)>,
    {
        let mut out = Utility {
            value:   self.value_at(at) + reward,
            parcels: self.parcels.clone(),
            anchor:  at,
        };
        for (id, value) in parcels {
            out.parcels.entry(id).or_insert((value, 0)).1 += 1;
        }
        out
    }

    /// Accumulate `other` into `self`, re-expressing it at `self.anchor`.
    pub fn accumulate(&mut self, other: &Utility) {
        self.value += other.value_at(self.anchor);
        for (id, (value, count)) in &other.parcels {
            self.parcels.entry(id.clone()).or_insert((*value, 0)).1 += count;
        }
    }
}
