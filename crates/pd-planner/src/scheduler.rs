//! Cooperative scheduling for the planner.
//!
//! The planner never runs unbounded.  A [`Scheduler`] hands it one quantum
//! of iterations at a time and checks a [`StopToken`] at every iteration
//! boundary, so a stop request takes effect after at most one descent.
//! Between quanta the owner is free to apply belief updates and act.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Planner, PlannerResult};

/// Shared cancellation flag.  Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs the planner in fixed-size quanta.
pub struct Scheduler {
    quantum: usize,
    total:   u64,
}

impl Scheduler {
    pub fn new(quantum: usize) -> Self {
        Self { quantum: quantum.max(1), total: 0 }
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Iterations run so far across all quanta.
    pub fn total_iterations(&self) -> u64 {
        self.total
    }

    /// Run one quantum.  Returns the iterations actually run, fewer than
    /// the quantum only when the planner was stopped.
    pub fn run_quantum(&mut self, planner: &mut Planner) -> PlannerResult<usize> {
        self.run_for(planner, self.quantum)
    }

    /// Run exactly `iterations` iterations (warm-up before the first move),
    /// honoring the stop token.
    pub fn warm_up(&mut self, planner: &mut Planner, iterations: usize) -> PlannerResult<usize> {
        let done = self.run_for(planner, iterations)?;
        log::debug!("planner warm-up: {done} iterations");
        Ok(done)
    }

    fn run_for(&mut self, planner: &mut Planner, iterations: usize) -> PlannerResult<usize> {
        let done = planner.run(iterations)?;
        self.total += done as u64;
        Ok(done)
    }
}
