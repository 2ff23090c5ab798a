//! Belief-set error type.

use thiserror::Error;

use pd_core::AgentId;

#[derive(Debug, Error)]
pub enum BeliefError {
    #[error("{0} is not on the team roster")]
    TeamMateNotFound(AgentId),
}

pub type BeliefResult<T> = Result<T, BeliefError>;
