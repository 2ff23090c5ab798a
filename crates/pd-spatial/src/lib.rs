//! `pd-spatial`: grid map, distances, and routing.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`grid`]     | `GridMap` (tiles + R-tree), `GridMapBuilder`, ASCII parsing    |
//! | [`loader`]   | `load_map_csv`, `load_map_reader`                              |
//! | [`distance`] | `DistanceEngine`: O(1) distance / next-hop / bottleneck        |
//! | [`seidel`]   | exact all-pairs shortest paths on one connected component      |
//! | [`router`]   | `PathPlanner` trait, `AStarPlanner`, A* over occupied tiles    |
//! | [`error`]    | `SpatialError`, `SpatialResult<T>`                             |
//!
//! # Build once, query forever
//!
//! The map never changes during a run.  [`DistanceEngine::build`] splits the
//! walkable tiles into connected components and computes every component's
//! distance matrix on a Rayon pool (one worker per component).  All later
//! queries are table lookups; only [`DistanceEngine::recompute_path`] does
//! search work, and it uses the static distance as an exact heuristic.

pub mod distance;
pub mod error;
pub mod grid;
pub mod loader;
pub mod router;
pub mod seidel;


pub use distance::DistanceEngine;
pub use error::{SpatialError, SpatialResult};
pub use grid::{GridMap, GridMapBuilder};
pub use loader::{load_map_csv, load_map_reader};
pub use router::{AStarPlanner, PathPlanner};
