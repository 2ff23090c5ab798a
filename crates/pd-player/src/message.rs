//! Messages exchanged between teammates.
//!
//! Every message travels in an [`Envelope`] stamped with the sender's id
//! and send time.  Receivers drop envelopes older than the last one they
//! accepted from the same sender, so a delayed report never overwrites a
//! fresher one.

use pd_belief::{AgentObservation, ParcelObservation};
use pd_core::{AgentId, Intention, Position, Timestamp};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TeamMessage {
    /// Join request.  `proof` is checked by the receiver's
    /// [`IdentityVerifier`][crate::IdentityVerifier].
    Hello { proof: String },

    /// Sender's own position.
    Position(Position),

    /// Forwarded parcel sensing, with where the sender stood.
    ParcelSensing {
        reporter: Position,
        parcels:  Vec<ParcelObservation>,
    },

    /// Forwarded agent sensing.
    AgentSensing(Vec<AgentObservation>),

    /// Sender's `(intention, utility)` list for this round.
    Intentions(Vec<(Intention, f64)>),

    /// Sender is (or stops) handing its parcels over and wants to be left
    /// out of assignment meanwhile.
    IgnoreMe(bool),
}

impl TeamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            TeamMessage::Hello { .. }         => "hello",
            TeamMessage::Position(_)          => "position",
            TeamMessage::ParcelSensing { .. } => "parcel-sensing",
            TeamMessage::AgentSensing(_)      => "agent-sensing",
            TeamMessage::Intentions(_)        => "intentions",
            TeamMessage::IgnoreMe(_)          => "ignore-me",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub sender:  AgentId,
    pub sent_at: Timestamp,
    pub message: TeamMessage,
}

impl Envelope {
    pub fn new(sender: AgentId, sent_at: Timestamp, message: TeamMessage) -> Self {
        Self { sender, sent_at, message }
    }
}
