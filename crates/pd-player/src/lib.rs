//! `pd-player`: the per-agent control loop.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                     |
//! |----------------|--------------------------------------------------------------|
//! | [`player`]     | `Player`: sensing entry points, team traffic, `tick`         |
//! | [`builder`]    | `PlayerBuilder`                                              |
//! | [`assignment`] | Hungarian maximum-weight assignment                          |
//! | [`discount`]   | `DiscountFactors`: per-parcel damping of contested pickups   |
//! | [`paths`]      | `PathCache`: committed detours, bottlenecks, blocked targets |
//! | [`collab`]     | `Actuators`, `Messenger`, `IdentityVerifier` + verifiers     |
//! | [`message`]    | `TeamMessage`, `Envelope`                                    |
//! | [`observer`]   | `PlayerObserver`, `Decision`, `Action`                       |
//! | [`error`]      | `PlayerError`, `PlayerResult<T>`                             |
//!
//! # Cargo features
//!
//! | Feature | Effect                                                 |
//! |---------|--------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on `TeamMessage`, `Envelope` |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let engine = Arc::new(DistanceEngine::build(map, &config)?);
//! let mut player = PlayerBuilder::new("alice", engine, config).build()?;
//! player.on_position_update(start, clock.now(), &mut bus)?;
//! loop {
//!     player.on_parcel_sensing(&server.parcels_near(...), clock.now(), &mut bus);
//!     player.tick(clock.now(), &mut server, &mut bus, &mut NoopObserver)?;
//! }
//! ```

pub mod assignment;
pub mod builder;
pub mod collab;
pub mod discount;
pub mod error;
pub mod message;
pub mod observer;
pub mod paths;
pub mod player;

#[cfg(test)]
mod tests;

pub use assignment::assign_max;
pub use builder::PlayerBuilder;
pub use collab::{AcceptAll, Actuators, IdentityVerifier, Messenger, NoopMessenger, SharedSecret};
pub use discount::DiscountFactors;
pub use error::{PlayerError, PlayerResult};
pub use message::{Envelope, TeamMessage};
pub use observer::{Action, Decision, NoopObserver, PlayerObserver};
pub use paths::{CommittedPath, PathCache};
pub use player::Player;
