//! Lobby data model for Rallypoint.
//!
//! This crate defines the "nouns" every other layer talks about:
//!
//! - **Identity** ([`PlayerId`], [`LobbyId`], [`AllocationId`], [`JoinCode`]) —
//!   opaque string identifiers handed out by the hosted services.
//! - **Snapshots** ([`Lobby`], [`Player`], [`DataObject`], [`PlayerDataObject`]) —
//!   the local copy of a remote lobby resource and its annotations.
//! - **Queries** ([`QuerySpec`], [`QueryFilter`], [`QueryOrder`]) — how
//!   candidate lobbies are discovered. Evaluation is the service's job.
//! - **Requests** ([`CreateLobbyRequest`], [`UpdateLobbyRequest`],
//!   [`UpdatePlayerRequest`]) — the payloads of state-changing calls.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how snapshots are
//!   rendered to bytes (used for debug output).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about services, coordinators, or
//! tasks. It only describes data.
//!
//! ```text
//! Services (remote calls) → Protocol (Lobby, Player) → Session (coordinator)
//! ```

mod codec;
mod error;
mod ids;
mod lobby;
mod query;
mod relay;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{AllocationId, JoinCode, LobbyId, PlayerId};
pub use lobby::{
    CreateLobbyRequest, DataIndex, DataObject, Lobby, Player,
    PlayerDataObject, UpdateLobbyRequest, UpdatePlayerRequest, Visibility,
    CHARACTER_KEY, JOIN_CODE_KEY, READY_KEY, VERSION_INDEX, VERSION_KEY,
};
pub use query::{
    FilterOp, QueryField, QueryFilter, QueryOrder, QuerySpec,
    MAX_QUERY_RESULTS,
};
pub use relay::{Character, RelayBinding};
