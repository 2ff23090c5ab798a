//! Spatial-subsystem error type.

use thiserror::Error;

use pd_core::Position;

/// Errors produced by `pd-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("{to} is unreachable from {from}")]
    Unreachable { from: Position, to: Position },

    #[error("{0} is not a walkable tile")]
    UnknownPosition(Position),

    #[error("map has no delivery tile")]
    NoDeliveryTile,

    #[error("no delivery tile reachable from {0}")]
    NoReachableDelivery(Position),

    #[error("shortest-path recursion exceeded depth {0}")]
    RecursionLimit(u32),

    #[error("failed to start distance workers: {0}")]
    ThreadPool(String),

    #[error("map parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
