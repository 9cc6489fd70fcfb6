//! Client builder: signs in and wires a ready-to-use [`LobbyFlow`].
//!
//! This is the entry point for games using Rallypoint. It ties together
//! all the layers: identity → session coordinator → relay/network flows.

use std::sync::Arc;

use rallypoint_connect::{FlowConfig, LobbyFlow};
use rallypoint_heartbeat::HeartbeatConfig;
use rallypoint_services::memory::{
    LoopbackNetwork, MemoryIdentityService, MemoryLobbyService, MemoryRelayService,
};
use rallypoint_services::{IdentityService, LobbyService, NetworkSession, RelayService};
use rallypoint_session::{CoordinatorConfig, LocalPlayer, SessionCoordinator};

use crate::RallypointError;

/// Builder for configuring and connecting a Rallypoint client.
///
/// # Example
///
/// ```rust,ignore
/// use rallypoint::prelude::*;
///
/// let mut flow = RallypointClient::builder()
///     .game_version("1.2")
///     .connect(&identity, lobby, relay, network)
///     .await?;
/// flow.host_lobby(LobbySettings::new("Friday night", 4)).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RallypointClientBuilder {
    coordinator: CoordinatorConfig,
    flow: FlowConfig,
}

impl RallypointClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the game version tag stamped into hosted lobbies and used to
    /// filter searches.
    pub fn game_version(mut self, version: impl Into<String>) -> Self {
        self.coordinator.game_version = version.into();
        self
    }

    /// Sets the heartbeat configuration used while hosting. `None`
    /// disables heartbeats.
    pub fn heartbeat(mut self, config: Option<HeartbeatConfig>) -> Self {
        self.coordinator.heartbeat = config.map(HeartbeatConfig::validated);
        self
    }

    /// Replaces the whole coordinator configuration.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator = config;
        self
    }

    /// Sets the scene names and relay sizing.
    pub fn flow_config(mut self, config: FlowConfig) -> Self {
        self.flow = config;
        self
    }

    /// Signs in through `identity` and wires a flow over the given
    /// services.
    ///
    /// # Errors
    /// Fails only if sign-in fails.
    pub async fn connect<I, L, R, N>(
        self,
        identity: &I,
        lobby: Arc<L>,
        relay: Arc<R>,
        network: Arc<N>,
    ) -> Result<LobbyFlow<L, R, N>, RallypointError>
    where
        I: IdentityService,
        L: LobbyService,
        R: RelayService,
        N: NetworkSession,
    {
        let player = LocalPlayer::sign_in(identity).await?;
        tracing::info!(
            player_id = %player.id(),
            version = %self.coordinator.game_version,
            "rallypoint client ready"
        );

        let coordinator = SessionCoordinator::new(lobby, player, self.coordinator);
        Ok(LobbyFlow::new(coordinator, relay, network, self.flow))
    }
}

/// Namespace for the builder entry point.
pub struct RallypointClient;

impl RallypointClient {
    /// Creates a new builder.
    pub fn builder() -> RallypointClientBuilder {
        RallypointClientBuilder::new()
    }
}

/// A flow running entirely on the in-memory services.
pub type LocalFlow = LobbyFlow<MemoryLobbyService, MemoryRelayService, LoopbackNetwork>;

/// One shared set of in-memory lobby and relay services.
///
/// Every client connected through the same `LocalServices` sees the same
/// lobbies, like players of one game sharing a hosted backend. Each
/// client gets its own loopback network session.
#[derive(Debug, Clone, Default)]
pub struct LocalServices {
    pub lobby: Arc<MemoryLobbyService>,
    pub relay: Arc<MemoryRelayService>,
}

impl LocalServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs `player_id` in and connects a flow whose network session
    /// numbers the local client `client_id`.
    pub async fn connect(
        &self,
        builder: RallypointClientBuilder,
        player_id: &str,
        client_id: u64,
    ) -> Result<LocalFlow, RallypointError> {
        let identity = MemoryIdentityService::with_player_id(player_id);
        builder
            .connect(
                &identity,
                Arc::clone(&self.lobby),
                Arc::clone(&self.relay),
                Arc::new(LoopbackNetwork::new(client_id)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = RallypointClient::builder();
        assert_eq!(builder.coordinator.game_version, "0.1");
        assert_eq!(builder.flow.game_scene, "Game");
    }

    #[test]
    fn test_builder_clamps_heartbeat() {
        let builder = RallypointClient::builder()
            .heartbeat(Some(HeartbeatConfig::with_interval(Duration::from_secs(600))));
        let interval = builder.coordinator.heartbeat.map(|h| h.interval);
        assert_eq!(interval, Some(HeartbeatConfig::MAX_INTERVAL));
    }

    #[tokio::test]
    async fn test_connect_signs_in() {
        let services = LocalServices::new();
        let flow = services
            .connect(RallypointClient::builder(), "alice", 0)
            .await
            .unwrap();
        assert_eq!(flow.coordinator().local_player().id().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_connect_sign_in_failure() {
        let identity = MemoryIdentityService::new();
        identity.set_offline(true);
        let services = LocalServices::new();

        let result = RallypointClient::builder()
            .connect(
                &identity,
                Arc::clone(&services.lobby),
                Arc::clone(&services.relay),
                Arc::new(LoopbackNetwork::default()),
            )
            .await;
        assert!(matches!(result, Err(RallypointError::Session(_))));
    }
}
