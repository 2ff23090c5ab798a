//! `pd-core`: foundational types for the pickup-and-delivery agent.
//!
//! This crate is a dependency of every other `pd-*` crate.  It has no `pd-*`
//! dependencies and only small external ones (`rand`, `rustc-hash`,
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`geo`]       | `Position`, `Direction`, `Tile`                           |
//! | [`ids`]       | `AgentId`, `ParcelId`                                     |
//! | [`time`]      | `Timestamp`, `Clock`, `ManualClock`, `SystemClock`        |
//! | [`value`]     | `DecayingValue`, `Decay`                                  |
//! | [`utility`]   | `Utility`, a replayable time-aware reward                 |
//! | [`intention`] | `Intention`, `IntentionKind`                              |
//! | [`config`]    | `AgentConfig`, `PathReconciliation`                       |
//! | [`rng`]       | `AgentRng`                                                |
//! | [`error`]     | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public value types.  |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod intention;
pub mod rng;
pub mod time;
pub mod utility;
pub mod value;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{AgentConfig, PathReconciliation};
pub use error::{CoreError, CoreResult};
pub use geo::{Direction, Position, Tile};
pub use ids::{AgentId, ParcelId};
pub use intention::{Intention, IntentionKind};
pub use rng::AgentRng;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use utility::Utility;
pub use value::{Decay, DecayingValue};
