//! `pd-belief`: the agent's reconciled local world model.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`belief`]  | `BeliefSet`: the single owner of everything below               |
//! | [`parcels`] | `ParcelObservation`, `Parcel`, `ParcelIndex` (id + position)    |
//! | [`agents`]  | `AgentObservation`, `ObservedAgent`, random-agent classifier    |
//! | [`team`]    | `TeamMate`, `TeamRoster`                                        |
//! | [`promise`] | Gaussian spawn promise, agent penalty, top-k selection          |
//! | [`events`]  | `BeliefObserver`, `ParcelChanges`                               |
//! | [`error`]   | `BeliefError`, `BeliefResult<T>`                                |
//!
//! # Notifications
//!
//! Update methods take a `&mut impl BeliefObserver`.  Each call fires at
//! most one `on_parcels_changed` and one `on_occupied_positions_changed`,
//! and only when the underlying state actually changed.

pub mod agents;
pub mod belief;
pub mod error;
pub mod events;
pub mod parcels;
pub mod promise;
pub mod team;

#[cfg(test)]
mod tests;

pub use agents::{AgentObservation, ObservedAgent, RandomAgentClassifier};
pub use belief::BeliefSet;
pub use error::{BeliefError, BeliefResult};
pub use events::{BeliefObserver, NoopBeliefObserver, ParcelChanges, RecordingObserver};
pub use parcels::{Parcel, ParcelIndex, ParcelObservation};
pub use promise::PromiseMap;
pub use team::{TeamMate, TeamRoster};
