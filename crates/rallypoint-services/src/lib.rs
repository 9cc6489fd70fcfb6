//! External service seams for Rallypoint.
//!
//! Rallypoint doesn't host lobbies, relay packets, or sign players in.
//! Those jobs belong to hosted providers. This crate defines one trait
//! per collaborator so the coordinator can be written against the
//! contract instead of a vendor SDK:
//!
//! - [`LobbyService`] — create/query/join/leave/delete lobbies, update
//!   shared data and players, send heartbeats
//! - [`RelayService`] — allocate relay slots and resolve join codes
//! - [`IdentityService`] — anonymous sign-in
//! - [`NetworkSession`] — start the game network as host or client
//!
//! # Why `impl Future + Send` instead of `async fn`?
//!
//! The heartbeat task calls [`LobbyService::send_heartbeat`] from a
//! spawned Tokio task, and spawned futures must be `Send`. Spelling the
//! return type out lets us require that. Implementors can still write
//! plain `async fn` in their `impl` blocks.
//!
//! # Feature Flags
//!
//! - `memory` (default) — in-process loopback implementations of every
//!   trait, used by tests, demos, and local development

mod error;
#[cfg(feature = "memory")]
pub mod memory;

pub use error::ServiceError;

use std::fmt;
use std::future::Future;

use rallypoint_protocol::{
    AllocationId, Character, CreateLobbyRequest, JoinCode, Lobby, LobbyId,
    Player, PlayerId, QueryFilter, QuerySpec, RelayBinding,
    UpdateLobbyRequest, UpdatePlayerRequest,
};
use tokio::sync::broadcast;

/// The hosted lobby provider.
///
/// Every state-changing call returns the lobby's new snapshot (except
/// removals and deletes, which have nothing left to return).
pub trait LobbyService: Send + Sync + 'static {
    /// Registers a new lobby with `request.player` as host.
    fn create_lobby(
        &self,
        request: CreateLobbyRequest,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Returns public lobbies matching `query`, at most `query.count()`.
    fn query_lobbies(
        &self,
        query: &QuerySpec,
    ) -> impl Future<Output = Result<Vec<Lobby>, ServiceError>> + Send;

    /// Lets the service pick a lobby matching `filters` and joins it.
    ///
    /// Fails with [`ServiceError::NotFound`] when nothing matches.
    fn quick_join(
        &self,
        filters: &[QueryFilter],
        player: &Player,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Joins a specific lobby.
    fn join_by_id(
        &self,
        lobby_id: &LobbyId,
        player: &Player,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Fetches the current snapshot.
    fn get_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Replaces the lobby's shared data.
    fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        request: UpdateLobbyRequest,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Updates one member's allocation and/or annotations.
    fn update_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
        request: UpdatePlayerRequest,
    ) -> impl Future<Output = Result<Lobby, ServiceError>> + Send;

    /// Removes a member from the lobby.
    fn remove_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Deletes the lobby resource.
    fn delete_lobby(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Liveness signal. Lobbies that stop receiving these are marked
    /// inactive and eventually purged by the provider.
    fn send_heartbeat(
        &self,
        lobby_id: &LobbyId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// The hosted relay provider.
pub trait RelayService: Send + Sync + 'static {
    /// Reserves a host allocation for up to `max_connections` peers.
    fn create_allocation(
        &self,
        max_connections: u32,
    ) -> impl Future<Output = Result<AllocationId, ServiceError>> + Send;

    /// Returns the join code pointing at a host allocation.
    fn get_join_code(
        &self,
        allocation_id: &AllocationId,
    ) -> impl Future<Output = Result<JoinCode, ServiceError>> + Send;

    /// Resolves a join code into a client allocation.
    fn join_allocation(
        &self,
        join_code: &JoinCode,
    ) -> impl Future<Output = Result<AllocationId, ServiceError>> + Send;
}

/// The hosted identity provider.
pub trait IdentityService: Send + Sync + 'static {
    /// Signs in without credentials and returns a stable player id.
    fn sign_in_anonymously(
        &self,
    ) -> impl Future<Output = Result<PlayerId, ServiceError>> + Send;
}

/// Which side of the game network this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkRole {
    #[default]
    Offline,
    Host,
    Client,
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::Host => f.write_str("host"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Emitted by the network session when a client finished loading a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLoaded {
    /// Network-level client number of whoever finished loading.
    pub client_id: u64,
    pub scene: String,
}

/// The engine-side networking layer.
pub trait NetworkSession: Send + Sync + 'static {
    /// Starts hosting through the given relay allocation.
    fn start_host(
        &self,
        binding: &RelayBinding,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Connects to a host through the given relay allocation.
    fn start_client(
        &self,
        binding: &RelayBinding,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Tears down the network session. Idempotent.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;

    /// Current role.
    fn role(&self) -> NetworkRole;

    /// The local client's network number, once connected.
    fn local_client_id(&self) -> Option<u64>;

    /// Switches every connected peer to `scene`. Host only.
    fn load_scene(
        &self,
        scene: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Registers a new observer for scene-load completions.
    fn subscribe_scenes(&self) -> broadcast::Receiver<SceneLoaded>;

    /// Asks the host to show `character` for `client_id`'s avatar.
    fn set_player_visuals(
        &self,
        client_id: u64,
        character: Character,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}
