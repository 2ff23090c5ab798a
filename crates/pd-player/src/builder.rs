//! Fluent builder for constructing a [`Player`].

use std::sync::Arc;

use pd_belief::BeliefSet;
use pd_core::{AgentConfig, AgentId, CoreError, PathReconciliation, Position};
use pd_planner::Planner;
use pd_spatial::{DistanceEngine, PathPlanner, SpatialError};

use crate::collab::{AcceptAll, IdentityVerifier};
use crate::{Player, PlayerResult};

/// Fluent builder for [`Player`].
///
/// # Required inputs
///
/// - [`AgentId`]: this agent's id on the game server
/// - [`DistanceEngine`]: built once per map and shared between teammates
/// - [`AgentConfig`]
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                                         |
/// |----------------------|-------------------------------------------------|
/// | `.verifier(v)`       | [`AcceptAll`]                                   |
/// | `.path_planner(p)`   | A*; mandatory for `External` reconciliation     |
/// | `.position(p)`       | unknown until the first position update         |
///
/// # Example
///
/// ```rust,ignore
/// let engine = Arc::new(DistanceEngine::build(map, &config)?);
/// let mut player = PlayerBuilder::new("alice", engine, config)
///     .verifier(SharedSecret::new("team-blue"))
///     .build()?;
/// player.announce(clock.now(), &mut bus);
/// ```
pub struct PlayerBuilder {
    id:           AgentId,
    engine:       Arc<DistanceEngine>,
    config:       AgentConfig,
    verifier:     Option<Box<dyn IdentityVerifier>>,
    path_planner: Option<Arc<dyn PathPlanner>>,
    position:     Option<Position>,
}

impl PlayerBuilder {
    pub fn new(id: impl Into<AgentId>, engine: Arc<DistanceEngine>, config: AgentConfig) -> Self {
        Self {
            id: id.into(),
            engine,
            config,
            verifier:     None,
            path_planner: None,
            position:     None,
        }
    }

    /// How inbound `Hello`s are checked and how our own is signed.
    pub fn verifier(mut self, verifier: impl IdentityVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// External route solver.  Only consulted when the configuration asks
    /// for `PathReconciliation::External`.
    pub fn path_planner(mut self, planner: Arc<dyn PathPlanner>) -> Self {
        self.path_planner = Some(planner);
        self
    }

    /// Starting tile, if already known.
    pub fn position(mut self, pos: Position) -> Self {
        self.position = Some(pos);
        self
    }

    /// Validate inputs and return a ready [`Player`].
    pub fn build(self) -> PlayerResult<Player> {
        self.config.validate()?;

        if let Some(pos) = self.position {
            if !self.engine.is_crossable(pos) {
                return Err(SpatialError::UnknownPosition(pos).into());
            }
        }

        let mut belief = BeliefSet::new(Arc::clone(&self.engine), &self.config, self.id.clone());
        match (self.config.path_reconciliation, self.path_planner) {
            (PathReconciliation::External, Some(planner)) => {
                belief = belief.with_path_planner(planner);
            }
            (PathReconciliation::External, None) => {
                return Err(CoreError::Config(
                    "external path reconciliation needs a path planner".into(),
                )
                .into());
            }
            (PathReconciliation::AStar, Some(_)) => {
                log::warn!("{}: path planner supplied but A* reconciliation selected", self.id);
            }
            (PathReconciliation::AStar, None) => {}
        }

        let planner = Planner::new(Arc::clone(&self.engine), &self.config);
        let verifier = self.verifier.unwrap_or_else(|| Box::new(AcceptAll));

        Ok(Player::assemble(self.id, self.config, belief, planner, verifier, self.position))
    }
}
