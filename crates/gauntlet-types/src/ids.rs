//! Type-safe identifier wrappers.
//!
//! Episode- and run-level identifiers wrap a [`Uuid`] (v7, time-ordered) so
//! hall-of-fame records sort by creation time. Episodes started by the state
//! machine draw their id from the episode seed instead, so a replay logs the
//! same id. Creature identifiers are
//! sequential within an episode instead: an episode replayed from the same
//! seed must hand out the same ids, which a random UUID cannot guarantee.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Build a v4-format identifier from caller-supplied random
            /// bytes, so a seeded generator yields a reproducible id.
            pub const fn from_random_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one episode (one attempt at a gauntlet).
    EpisodeId
}

define_id! {
    /// Unique identifier for a hall-of-fame record.
    RunId
}

/// Identifier for a creature instance, unique within one episode.
///
/// Allocated sequentially by the roster manager starting at 1. Ids are
/// never reused, including after a creature faints or is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonId(pub u32);

impl MonId {
    /// Return the raw sequence number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for MonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "mon#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_ids_are_distinct() {
        let a = EpisodeId::new();
        let b = EpisodeId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn ids_from_random_bytes_are_stable() {
        let a = EpisodeId::from_random_bytes([7; 16]);
        assert_eq!(a, EpisodeId::from_random_bytes([7; 16]));
        assert_ne!(a, EpisodeId::from_random_bytes([8; 16]));
        assert_eq!(a.into_inner().get_version_num(), 4);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = RunId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn mon_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&MonId(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
        assert_eq!(MonId(7).to_string(), "mon#7");
    }
}
