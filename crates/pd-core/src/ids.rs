//! Opaque string identifiers for agents and parcels.
//!
//! The game server names entities with strings.  Each ID wraps an
//! `Arc<str>` so clones are a reference-count bump and the wrappers can be
//! used freely as map keys.  Equality, ordering, and hashing go through the
//! underlying string.

use std::fmt;
use std::sync::Arc;

/// Generate a typed ID wrapper around a shared string.
macro_rules! interned_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        $vis struct $name(Arc<str>);

        impl $name {
            pub fn new(raw: impl AsRef<str>) -> Self {
                $name(Arc::from(raw.as_ref()))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                $name::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                $name(Arc::from(raw))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

interned_id! {
    /// Identifier of an agent (self, teammate, or competitor).
    pub struct AgentId;
}

interned_id! {
    /// Identifier of a parcel.
    pub struct ParcelId;
}
