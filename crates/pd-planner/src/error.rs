//! Planner error type.
//!
//! Every variant is an invariant violation: the caller and the tree
//! disagree about the tree's shape.

use thiserror::Error;

use pd_core::Intention;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner used before start()")]
    NotStarted,

    #[error("root has no child for intention {0}")]
    IntentionNotFound(Intention),

    #[error("cannot select a child of a terminal node")]
    TerminalNode,
}

pub type PlannerResult<T> = Result<T, PlannerError>;
