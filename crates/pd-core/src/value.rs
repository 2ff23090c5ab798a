//! Rewards that shrink linearly with time.
//!
//! A [`DecayingValue`] is `(base, anchor)` plus a [`Decay`] rate.  It never
//! mutates: `value_at(t)` is a pure function of `t`, so a parcel's value can
//! be projected to any arrival instant the planner considers.
//!
//! Evaluating before the anchor extrapolates backwards (the value was larger
//! then).  [`Utility`][crate::Utility] relies on this to replay rewards
//! earned at a later instant back to an ancestor's earlier arrival.

use crate::Timestamp;

/// Linear decay rate of a reward.
///
/// Stored as "`amount` lost every `every_ms`" rather than a per-ms float so
/// the common cases (one unit per interval, whole value over a lifetime)
/// evaluate exactly at interval boundaries.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decay {
    /// The value never changes.
    #[default]
    None,
    /// The value drops by `amount` every `every_ms` milliseconds.
    Linear { amount: f64, every_ms: u64 },
}

impl Decay {
    /// One unit of value is lost every `interval_ms` (the game server's rule).
    /// `None` means parcels never decay.
    pub fn per_unit(interval_ms: Option<u64>) -> Decay {
        match interval_ms {
            Some(ms) if ms > 0 => Decay::Linear { amount: 1.0, every_ms: ms },
            _ => Decay::None,
        }
    }

    /// A value of `base` reaches zero exactly `lifetime_ms` after its anchor.
    pub fn over(base: f64, lifetime_ms: u64) -> Decay {
        if lifetime_ms == 0 || base <= 0.0 {
            return Decay::None;
        }
        Decay::Linear { amount: base, every_ms: lifetime_ms }
    }

    /// Amount lost across `elapsed_ms` (negative when going backwards).
    #[inline]
    pub fn loss(self, elapsed_ms: i64) -> f64 {
        match self {
            Decay::None => 0.0,
            Decay::Linear { amount, every_ms } => amount * elapsed_ms as f64 / every_ms as f64,
        }
    }

    /// Milliseconds needed to lose `value`, `None` for a non-decaying value.
    pub fn millis_to_lose(self, value: f64) -> Option<u64> {
        match self {
            Decay::Linear { amount, every_ms } if amount > 0.0 => {
                Some((value * every_ms as f64 / amount).ceil().max(0.0) as u64)
            }
            _ => None,
        }
    }
}

/// A reward observed as `base` at `anchor`, shrinking at `decay`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecayingValue {
    pub base:   f64,
    pub anchor: Timestamp,
    pub decay:  Decay,
}

impl DecayingValue {
    #[inline]
    pub fn new(base: f64, anchor: Timestamp, decay: Decay) -> Self {
        Self { base, anchor, decay }
    }

    /// A value that never decays.
    #[inline]
    pub fn constant(base: f64) -> Self {
        Self { base, anchor: Timestamp::ZERO, decay: Decay::None }
    }

    /// `max(0, base − decay(t − anchor))`.
    #[inline]
    pub fn value_at(&self, t: Timestamp) -> f64 {
        (self.base - self.decay.loss(t.signed_since(self.anchor))).max(0.0)
    }

    /// First instant at which the value is zero, `None` if it never expires.
    pub fn expires_at(&self) -> Option<Timestamp> {
        if self.base <= 0.0 {
            return Some(self.anchor);
        }
        self.decay
            .millis_to_lose(self.base)
            .map(|ms| self.anchor.offset(ms))
    }

    #[inline]
    pub fn is_expired(&self, t: Timestamp) -> bool {
        self.value_at(t) <= 0.0
    }

    /// Same decay rate, re-anchored on a fresh observation.
    #[inline]
    pub fn observed(&self, base: f64, at: Timestamp) -> Self {
        Self { base, anchor: at, decay: self.decay }
    }
}
