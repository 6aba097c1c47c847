//! Type-safe identifier wrappers around the backend's integer keys.
//!
//! The raid backend keys participants and guild groups by opaque integers
//! (chat platform account numbers). Each gets its own newtype so a member
//! id can never be passed where a group id is expected.

use serde::{Deserialize, Serialize};

/// Generates a transparent newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Opaque identifier of a raid participant (`qqid` on the wire).
    MemberId
}

define_id! {
    /// Identifier of the guild group whose boss is being tracked.
    GroupId
}
