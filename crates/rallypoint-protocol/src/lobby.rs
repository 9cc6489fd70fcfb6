//! Lobby and player snapshots.
//!
//! A [`Lobby`] is the local copy of a remote lobby resource. The service
//! is the source of truth: every successful call returns a fresh
//! snapshot, and the coordinator replaces its copy wholesale. Nothing in
//! here merges snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AllocationId, JoinCode, LobbyId, PlayerId};

// ---------------------------------------------------------------------------
// Well-known annotation keys
// ---------------------------------------------------------------------------

/// Lobby key holding the game build's version tag.
pub const VERSION_KEY: &str = "Version";

/// Query slot the version tag is indexed under. A string slot, so tags
/// like `"1.2.3"` work and `"0.10"` never equals `"0.1"`.
pub const VERSION_INDEX: DataIndex = DataIndex::S1;

/// Lobby key under which the host publishes its relay join code.
pub const JOIN_CODE_KEY: &str = "JoinCode";

/// Player key for the readiness flag.
pub const READY_KEY: &str = "Ready";

/// Player key for the chosen character.
pub const CHARACTER_KEY: &str = "Character";

// ---------------------------------------------------------------------------
// Visibility / indexing
// ---------------------------------------------------------------------------

/// Who may read an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Visibility {
    /// Anyone, including players who are only browsing.
    #[default]
    Public,
    /// Members of the lobby.
    Member,
    /// Only the owner (the host for lobby data, the player for player data).
    Private,
}

/// An indexed custom slot. Only indexed lobby data can be used in
/// query filters and orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataIndex {
    /// String slots.
    S1,
    S2,
    S3,
    S4,
    S5,
    /// Numeric slots.
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl DataIndex {
    /// Whether values in this slot compare numerically.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::N1 | Self::N2 | Self::N3 | Self::N4 | Self::N5)
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// A lobby-scoped annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObject {
    pub visibility: Visibility,
    pub value: String,
    /// Custom index slot, if the value should be queryable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<DataIndex>,
}

impl DataObject {
    /// Creates an unindexed annotation.
    pub fn new(visibility: Visibility, value: impl Into<String>) -> Self {
        Self {
            visibility,
            value: value.into(),
            index: None,
        }
    }

    /// Places the annotation in an indexed slot.
    pub fn indexed(mut self, index: DataIndex) -> Self {
        self.index = Some(index);
        self
    }
}

/// A player-scoped annotation (readiness, chosen character, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDataObject {
    pub visibility: Visibility,
    pub value: String,
}

impl PlayerDataObject {
    pub fn new(visibility: Visibility, value: impl Into<String>) -> Self {
        Self {
            visibility,
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player as it appears inside a lobby snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Relay allocation this player connected through, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<AllocationId>,
    #[serde(default)]
    pub data: BTreeMap<String, PlayerDataObject>,
}

impl Player {
    /// A player with no annotations and no allocation.
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            allocation_id: None,
            data: BTreeMap::new(),
        }
    }

    /// Returns the value stored under `key`, if any.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|d| d.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// Local snapshot of a remote lobby resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    pub id: LobbyId,
    pub name: String,
    pub host_id: PlayerId,
    pub max_players: u32,
    pub is_private: bool,
    #[serde(default)]
    pub data: BTreeMap<String, DataObject>,
    #[serde(default)]
    pub players: Vec<Player>,
    /// Service-assigned creation stamp. Larger means newer.
    pub created_at: u64,
    /// Bumped by the service on every shared-data write. Sent back on
    /// writes so the service can reject an update based on a stale
    /// snapshot. Membership changes leave it alone.
    pub revision: u64,
}

impl Lobby {
    /// Free player slots (never negative).
    pub fn available_slots(&self) -> u32 {
        self.max_players
            .saturating_sub(self.players.len() as u32)
    }

    /// Whether `player_id` is this lobby's host.
    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.host_id == *player_id
    }

    /// Returns the value stored under `key`, if any.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|d| d.value.as_str())
    }

    /// The host's relay join code, once published.
    pub fn join_code(&self) -> Option<JoinCode> {
        self.data_value(JOIN_CODE_KEY).map(JoinCode::from)
    }

    /// Looks up a member by id.
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *player_id)
    }

    /// Whether `player_id` is a member (host included).
    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.player(player_id).is_some()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Payload for registering a new lobby. The `player` becomes the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    pub name: String,
    pub max_players: u32,
    pub is_private: bool,
    pub player: Player,
    #[serde(default)]
    pub data: BTreeMap<String, DataObject>,
}

/// Payload for replacing a lobby's shared data.
///
/// `data` is the complete mapping, not a delta. When
/// `expected_revision` is set, the service rejects the write with a
/// conflict if the lobby changed since that revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLobbyRequest {
    pub data: BTreeMap<String, DataObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<u64>,
}

/// Payload for updating one member. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlayerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<AllocationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, PlayerDataObject>>,
}
