use pd_belief::BeliefError;
use pd_core::CoreError;
use pd_planner::PlannerError;
use pd_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("spatial error: {0}")]
    Spatial(#[from] SpatialError),

    #[error("belief error: {0}")]
    Belief(#[from] BeliefError),

    #[error("planner error: {0}")]
    Planner(#[from] PlannerError),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
