//! Time model.
//!
//! # Design
//!
//! Every instant the agent reasons about is a `Timestamp`: milliseconds
//! since the agent process started (or since tick 0 of a simulated world).
//! Integer milliseconds keep ordering exact; decay arithmetic converts to
//! `f64` only at the point of evaluation.
//!
//! The source of "now" is abstracted behind [`Clock`] so that the control
//! loop can run against wall-clock time in production and a
//! [`ManualClock`] in tests and simulations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ── Timestamp ─────────────────────────────────────────────────────────────────

/// Milliseconds since the epoch of the current run.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    /// The instant `ms` milliseconds after `self`.
    #[inline]
    pub fn offset(self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is
    /// actually later.
    #[inline]
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Signed milliseconds from `earlier` to `self`.  Negative when `self`
    /// precedes `earlier`; used to replay decay backwards in time.
    #[inline]
    pub fn signed_since(self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }
}

impl std::ops::Add<u64> for Timestamp {
    type Output = Timestamp;
    #[inline]
    fn add(self, rhs: u64) -> Timestamp {
        self.offset(rhs)
    }
}

impl std::ops::Sub for Timestamp {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Timestamp) -> u64 {
        self.since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ms", self.0)
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time measured from construction.
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed().as_millis() as u64)
    }
}

/// A clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now_ms: AtomicU64::new(start.0) }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn set(&self, at: Timestamp) {
        self.now_ms.store(at.0, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ms.load(Ordering::Relaxed))
    }
}
