//! Control-loop observer for telemetry and tests.

use pd_core::{AgentId, Direction, Intention, Position, Timestamp};

/// What the player decided to pursue this tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// An intention won in assignment.
    Intention(Intention),
    /// Walk toward a promising tile.
    Explore(Position),
    /// Carry parcels toward a teammate and hand them over.
    Follow(AgentId),
    /// Nothing to do (no position yet, or nowhere to go).
    Idle,
}

/// What the player did about it.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Moved(Direction),
    /// The server refused the step and no detour exists.
    Blocked(Position),
    PickedUp(usize),
    PutDown(usize),
    Wait,
}

/// Callbacks invoked by [`Player::tick`][crate::Player::tick].
///
/// All methods have default no-op implementations.
///
/// # Example: decision log
///
/// ```rust,ignore
/// struct DecisionLog(Vec<Decision>);
///
/// impl PlayerObserver for DecisionLog {
///     fn on_decision(&mut self, _agent: &AgentId, _now: Timestamp, d: &Decision) {
///         self.0.push(d.clone());
///     }
/// }
/// ```
pub trait PlayerObserver {
    /// Called at the very start of each tick.
    fn on_tick_start(&mut self, _agent: &AgentId, _now: Timestamp) {}

    /// Called once assignment (or a fallback) has picked a goal.
    fn on_decision(&mut self, _agent: &AgentId, _now: Timestamp, _decision: &Decision) {}

    /// Called after the actuators were driven.
    fn on_action(&mut self, _agent: &AgentId, _now: Timestamp, _action: &Action) {}

    /// Called at the end of each tick with the planner iterations it ran.
    fn on_tick_end(&mut self, _agent: &AgentId, _now: Timestamp, _iterations: usize) {}
}

/// A [`PlayerObserver`] that does nothing.
pub struct NoopObserver;

impl PlayerObserver for NoopObserver {}
