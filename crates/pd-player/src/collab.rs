//! Traits for the world outside the agent.
//!
//! The player never talks to the game server or the team bus directly.
//! Applications hand it an [`Actuators`] for the current tick, a
//! [`Messenger`] for outbound team traffic, and (at build time) an
//! [`IdentityVerifier`] deciding which `Hello`s to trust.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use pd_core::{AgentId, Direction, ParcelId};

use crate::message::Envelope;

// ── Actuators ─────────────────────────────────────────────────────────────────

/// Commands sent to the game server on behalf of one agent.
pub trait Actuators {
    /// Step one tile.  `false` if the server refused (wall, another agent).
    fn move_to(&mut self, direction: Direction) -> bool;

    /// Pick up every parcel on the current tile.  Returns the ids actually
    /// picked up.
    fn pickup(&mut self) -> FxHashSet<ParcelId>;

    /// Drop `parcels` (or everything carried, for `None`) on the current
    /// tile.  Returns the ids actually dropped.
    fn putdown(&mut self, parcels: Option<&[ParcelId]>) -> FxHashSet<ParcelId>;
}

// ── Messenger ─────────────────────────────────────────────────────────────────

/// Outbound team traffic.  Delivery is fire-and-forget; a teammate that
/// stops hearing from us simply times us out.
pub trait Messenger {
    /// Send to one teammate.
    fn send(&mut self, to: &AgentId, envelope: Envelope);

    /// Send to everyone listening, including agents not yet on the roster.
    /// Used for `Hello`.
    fn broadcast(&mut self, envelope: Envelope);
}

/// A [`Messenger`] that drops everything.  For solo agents and tests.
pub struct NoopMessenger;

impl Messenger for NoopMessenger {
    fn send(&mut self, _to: &AgentId, _envelope: Envelope) {}

    fn broadcast(&mut self, _envelope: Envelope) {}
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Decides whether a `Hello` really comes from a teammate.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, claimed: &AgentId, proof: &str) -> bool;

    /// The proof this agent attaches to its own `Hello`.
    fn proof_for(&self, id: &AgentId) -> String;
}

/// Trusts everyone.
pub struct AcceptAll;

impl IdentityVerifier for AcceptAll {
    fn verify(&self, _claimed: &AgentId, _proof: &str) -> bool {
        true
    }

    fn proof_for(&self, _id: &AgentId) -> String {
        String::new()
    }
}

/// Teammates share a secret; the proof is a keyed hash of the claimed id.
///
/// This keeps accidental cross-talk between teams out.  It is not a
/// cryptographic signature.
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl IdentityVerifier for SharedSecret {
    fn verify(&self, claimed: &AgentId, proof: &str) -> bool {
        self.proof_for(claimed) == proof
    }

    fn proof_for(&self, id: &AgentId) -> String {
        let mut h = FxHasher::default();
        self.secret.hash(&mut h);
        id.as_str().hash(&mut h);
        format!("{:016x}", h.finish())
    }
}
