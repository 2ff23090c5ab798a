//! Obstacle-aware routing.
//!
//! # Pluggability
//!
//! The control loop reconciles blocked routes through the [`PathPlanner`]
//! trait.  [`AStarPlanner`] is the default; an application that wants to
//! hand the problem to an external planner (e.g. a PDDL solver) implements
//! the trait and selects it with `PathReconciliation::External`.
//!
//! # Heuristic
//!
//! A* here uses the precomputed static distance, which ignores dynamic
//! obstacles and is therefore admissible and consistent.  With no
//! obstacles in the way it expands exactly the tiles on one shortest path.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use pd_core::{Direction, Position};

use crate::DistanceEngine;

// ── PathPlanner trait ─────────────────────────────────────────────────────────

/// Pluggable route reconciliation.
///
/// Implementations must be `Send + Sync` so a planner can be shared between
/// teammates running in the same process.
pub trait PathPlanner: Send + Sync {
    /// Directions leading from `start` to `goal` without stepping on any
    /// tile in `avoid`.  `None` if no such route exists or the planner failed.
    fn plan(
        &self,
        engine: &DistanceEngine,
        start:  Position,
        goal:   Position,
        avoid:  &FxHashSet<Position>,
    ) -> Option<Vec<Direction>>;
}

/// A* over the static grid.
pub struct AStarPlanner;

impl PathPlanner for AStarPlanner {
    fn plan(
        &self,
        engine: &DistanceEngine,
        start:  Position,
        goal:   Position,
        avoid:  &FxHashSet<Position>,
    ) -> Option<Vec<Direction>> {
        astar(engine, start, goal, avoid)
    }
}

// ── A* internals ──────────────────────────────────────────────────────────────

pub(crate) fn astar(
    engine: &DistanceEngine,
    start:  Position,
    goal:   Position,
    avoid:  &FxHashSet<Position>,
) -> Option<Vec<Direction>> {
    // Static reachability first: this also rejects non-walkable endpoints.
    let h0 = engine.distance_if_possible(start, goal)?;
    if start == goal {
        return Some(Vec::new());
    }
    if avoid.contains(&goal) {
        return None;
    }

    let mut best: FxHashMap<Position, u32> = FxHashMap::default();
    let mut prev: FxHashMap<Position, Position> = FxHashMap::default();
    best.insert(start, 0);

    // Min-heap on (f, g, position); position breaks ties deterministically.
    let mut heap: BinaryHeap<Reverse<(u32, u32, Position)>> = BinaryHeap::new();
    heap.push(Reverse((h0, 0, start)));

    while let Some(Reverse((_, g, pos))) = heap.pop() {
        if pos == goal {
            return Some(reconstruct(&prev, start, goal));
        }
        if g > best.get(&pos).copied().unwrap_or(u32::MAX) {
            continue;
        }
        for &next in engine.adjacent(pos) {
            if avoid.contains(&next) {
                continue;
            }
            let Some(h) = engine.distance_if_possible(next, goal) else {
                continue;
            };
            let g_next = g + 1;
            if g_next < best.get(&next).copied().unwrap_or(u32::MAX) {
                best.insert(next, g_next);
                prev.insert(next, pos);
                heap.push(Reverse((g_next + h, g_next, next)));
            }
        }
    }
    None
}

fn reconstruct(
    prev:  &FxHashMap<Position, Position>,
    start: Position,
    goal:  Position,
) -> Vec<Direction> {
    let mut steps = Vec::new();
    let mut cur = goal;
    while cur != start {
        let Some(&from) = prev.get(&cur) else {
            break;
        };
        if let Some(dir) = from.direction_to(cur) {
            steps.push(dir);
        }
        cur = from;
    }
    steps.reverse();
    steps
}
