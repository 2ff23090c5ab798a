//! Change notification.
//!
//! The belief set does not own its listeners.  Each update method takes a
//! `&mut impl BeliefObserver` and calls it at most once per event kind, and
//! only when something actually changed.

use rustc_hash::FxHashSet;

use pd_core::{ParcelId, Position};

/// One batch of free-parcel changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParcelChanges {
    pub new:     Vec<ParcelId>,
    /// `(parcel, from, to)`.
    pub moved:   Vec<(ParcelId, Position, Position)>,
    pub removed: Vec<ParcelId>,
}

impl ParcelChanges {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.moved.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.moved.len() + self.removed.len()
    }
}

/// Callbacks fired by [`BeliefSet`][crate::BeliefSet] update methods.
///
/// Both methods default to no-ops.
pub trait BeliefObserver {
    /// Free parcels appeared, moved, or disappeared.
    fn on_parcels_changed(&mut self, _changes: &ParcelChanges) {}

    /// The set of tiles occupied by other agents differs from last time.
    fn on_occupied_positions_changed(&mut self, _occupied: &FxHashSet<Position>) {}
}

/// A [`BeliefObserver`] that ignores everything.
pub struct NoopBeliefObserver;

impl BeliefObserver for NoopBeliefObserver {}

/// Records every notification.  Handy in tests and for batching changes
/// until the next control tick.
#[derive(Default)]
pub struct RecordingObserver {
    pub parcel_batches:   Vec<ParcelChanges>,
    pub occupied_updates: Vec<FxHashSet<Position>>,
}

impl BeliefObserver for RecordingObserver {
    fn on_parcels_changed(&mut self, changes: &ParcelChanges) {
        self.parcel_batches.push(changes.clone());
    }

    fn on_occupied_positions_changed(&mut self, occupied: &FxHashSet<Position>) {
        self.occupied_updates.push(occupied.clone());
    }
}
