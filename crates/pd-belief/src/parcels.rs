//! Free-parcel bookkeeping.
//!
//! [`ParcelIndex`] keeps two views of the same data: `id → Parcel` and
//! `position → {id}`.  Every mutation goes through `insert`, `relocate`, or
//! `remove`, so a parcel in the id map always appears in the position map
//! under exactly its current position and nowhere else.

use rustc_hash::{FxHashMap, FxHashSet};

use pd_core::{AgentId, Decay, DecayingValue, ParcelId, Position, Timestamp};

// ── Observations ──────────────────────────────────────────────────────────────

/// One parcel as reported by a sensing event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParcelObservation {
    pub id:         ParcelId,
    pub position:   Position,
    /// Value at the instant of the report.
    pub reward:     f64,
    pub carried_by: Option<AgentId>,
}

impl ParcelObservation {
    pub fn free(id: impl Into<ParcelId>, position: Position, reward: f64) -> Self {
        Self { id: id.into(), position, reward, carried_by: None }
    }

    pub fn carried(id: impl Into<ParcelId>, position: Position, reward: f64, by: AgentId) -> Self {
        Self { id: id.into(), position, reward, carried_by: Some(by) }
    }
}

// ── Parcel ────────────────────────────────────────────────────────────────────

/// A parcel known to lie on the floor.
#[derive(Clone, Debug)]
pub struct Parcel {
    pub id:       ParcelId,
    pub position: Position,
    pub value:    DecayingValue,
}

impl Parcel {
    pub fn new(id: ParcelId, position: Position, reward: f64, seen_at: Timestamp, decay: Decay) -> Self {
        Self { id, position, value: DecayingValue::new(reward, seen_at, decay) }
    }

    #[inline]
    pub fn value_at(&self, t: Timestamp) -> f64 {
        self.value.value_at(t)
    }
}

// ── ParcelIndex ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ParcelIndex {
    by_id:       FxHashMap<ParcelId, Parcel>,
    by_position: FxHashMap<Position, FxHashSet<ParcelId>>,
}

impl ParcelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    #[inline]
    pub fn get(&self, id: &ParcelId) -> Option<&Parcel> {
        self.by_id.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &ParcelId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> + '_ {
        self.by_id.values()
    }

    /// IDs of the parcels lying on `pos`.
    pub fn ids_at(&self, pos: Position) -> impl Iterator<Item = &ParcelId> + '_ {
        self.by_position.get(&pos).into_iter().flatten()
    }

    /// Positions holding at least one parcel.
    pub fn occupied_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.by_position.keys().copied()
    }

    /// Insert a new parcel, replacing any previous entry with the same id.
    pub fn insert(&mut self, parcel: Parcel) {
        if let Some(old) = self.by_id.get(&parcel.id) {
            let old_pos = old.position;
            self.unlink(&parcel.id, old_pos);
        }
        self.by_position
            .entry(parcel.position)
            .or_default()
            .insert(parcel.id.clone());
        self.by_id.insert(parcel.id.clone(), parcel);
    }

    /// Move a known parcel.  Returns the previous position.
    pub fn relocate(&mut self, id: &ParcelId, to: Position) -> Option<Position> {
        let parcel = self.by_id.get_mut(id)?;
        let from = parcel.position;
        if from == to {
            return Some(from);
        }
        parcel.position = to;
        self.unlink(id, from);
        self.by_position.entry(to).or_default().insert(id.clone());
        Some(from)
    }

    /// Re-anchor a known parcel's value on a fresh observation.
    pub fn observe_value(&mut self, id: &ParcelId, reward: f64, at: Timestamp) {
        if let Some(parcel) = self.by_id.get_mut(id) {
            parcel.value = parcel.value.observed(reward, at);
        }
    }

    pub fn remove(&mut self, id: &ParcelId) -> Option<Parcel> {
        let parcel = self.by_id.remove(id)?;
        self.unlink(id, parcel.position);
        Some(parcel)
    }

    /// IDs of every parcel whose value is zero at `now`.
    pub fn expired(&self, now: Timestamp) -> Vec<ParcelId> {
        self.by_id
            .values()
            .filter(|p| p.value.is_expired(now))
            .map(|p| p.id.clone())
            .collect()
    }

    fn unlink(&mut self, id: &ParcelId, pos: Position) {
        if let Some(set) = self.by_position.get_mut(&pos) {
            set.remove(id);
            if set.is_empty() {
                self.by_position.remove(&pos);
            }
        }
    }
}
