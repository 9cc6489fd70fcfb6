//! Relay binding and character selection values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AllocationId, JoinCode, ProtocolError};

/// The result of talking to the relay service.
///
/// For a host this is a fresh allocation plus the join code that points
/// at it. For a client it is the host's join code plus the client's own
/// allocation. It isn't stored by the session; the host publishes the
/// join code into the lobby's shared data under
/// [`JOIN_CODE_KEY`](crate::JOIN_CODE_KEY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBinding {
    pub join_code: JoinCode,
    pub allocation_id: AllocationId,
}

/// Playable characters, chosen per player via the
/// [`CHARACTER_KEY`](crate::CHARACTER_KEY) annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Character {
    #[default]
    Catriona,
    Robert,
}

impl Character {
    /// The annotation value for this character.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Catriona => "CATRIONA",
            Self::Robert => "ROBERT",
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Character {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CATRIONA" => Ok(Self::Catriona),
            "ROBERT" => Ok(Self::Robert),
            other => Err(ProtocolError::Unknown {
                kind: "character",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_parses_annotation_values() {
        assert_eq!("ROBERT".parse::<Character>().unwrap(), Character::Robert);
        assert_eq!(Character::Catriona.to_string(), "CATRIONA");
    }

    #[test]
    fn test_character_rejects_lowercase() {
        assert!("robert".parse::<Character>().is_err());
    }

    #[test]
    fn test_default_character_is_catriona() {
        assert_eq!(Character::default(), Character::Catriona);
    }
}
