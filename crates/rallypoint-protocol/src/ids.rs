//! Identifier newtypes.
//!
//! Every identifier in Rallypoint is minted by a hosted service and is
//! opaque to us: a player id comes from the identity provider, a lobby id
//! from the lobby service, allocation ids and join codes from the relay.
//! They are all strings underneath, and wrapping each in its own type
//! means you can't hand a `LobbyId` to a function that wants a
//! `PlayerId`.
//!
//! `#[serde(transparent)]` serializes each one as the bare string, so a
//! `PlayerId("abc")` becomes `"abc"` in JSON rather than `{"0":"abc"}`.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the identifier as a string slice.
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
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// A signed-in player's stable identifier, issued by the identity service.
    PlayerId
);

string_id!(
    /// Identifier of a remote lobby resource.
    LobbyId
);

string_id!(
    /// Identifier of a relay allocation (one per connected peer).
    AllocationId
);

string_id!(
    /// Short opaque code that resolves to a host's relay allocation.
    ///
    /// Hosts publish this into the lobby's shared data so that clients
    /// can find it in their snapshot.
    JoinCode
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_string() {
        assert_eq!(PlayerId::from("p-1").to_string(), "p-1");
        assert_eq!(JoinCode::from("ABC123").to_string(), "ABC123");
    }

    #[test]
    fn test_ids_of_different_types_compare_by_value() {
        let a = LobbyId::from("x");
        let b = LobbyId::from(String::from("x"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "x");
    }
}
