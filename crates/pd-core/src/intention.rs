//! Intentions: the goals an agent commits to.

use std::fmt;

use crate::Position;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntentionKind {
    Pickup,
    Putdown,
    Move,
}

impl IntentionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentionKind::Pickup  => "pickup",
            IntentionKind::Putdown => "putdown",
            IntentionKind::Move    => "move",
        }
    }
}

/// A target position plus what to do there.  Equality is by `(kind, target)`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intention {
    pub kind:   IntentionKind,
    pub target: Position,
}

impl Intention {
    #[inline]
    pub const fn pickup(target: Position) -> Self {
        Self { kind: IntentionKind::Pickup, target }
    }

    #[inline]
    pub const fn putdown(target: Position) -> Self {
        Self { kind: IntentionKind::Putdown, target }
    }

    #[inline]
    pub const fn movement(target: Position) -> Self {
        Self { kind: IntentionKind::Move, target }
    }

    #[inline]
    pub fn is_pickup(&self) -> bool {
        self.kind == IntentionKind::Pickup
    }

    #[inline]
    pub fn is_putdown(&self) -> bool {
        self.kind == IntentionKind::Putdown
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.target)
    }
}
