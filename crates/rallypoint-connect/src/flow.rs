//! Multi-step connect flows.
//!
//! Getting two players into the same game takes several remote calls,
//! any of which can fail:
//!
//! ```text
//! host:   create lobby → relay allocation → publish join code
//!         → record own allocation → start host
//! client: find/join lobby → read join code → relay join
//!         → record own allocation → start client
//! ```
//!
//! Each flow runs these in order and, when a step after the lobby step
//! fails, compensates before returning: the host closes the lobby it just
//! created, the client leaves the lobby it just joined. No flow leaves a
//! half-built remote lobby behind, and no flow leaves the UI on the
//! loading screen.
//!
//! Everything the flows need (coordinator, relay, network, UI) is passed
//! in on construction. There are no globals.

use std::sync::Arc;

use rallypoint_protocol::{
    CHARACTER_KEY, Character, JOIN_CODE_KEY, Lobby, LobbyId, QueryFilter, QuerySpec, RelayBinding,
    Visibility,
};
use rallypoint_services::{LobbyService, NetworkRole, NetworkSession, RelayService};
use rallypoint_session::{LobbySettings, SessionCoordinator, SessionError};
use tokio::sync::watch;

use crate::{ConnectError, FlowConfig, RelayBinder, SceneObserver, UiProjector, UiState};

/// Drives the lobby UI's flows against a coordinator, a relay and a
/// network session.
pub struct LobbyFlow<L: LobbyService, R: RelayService, N: NetworkSession> {
    coordinator: SessionCoordinator<L>,
    relay: RelayBinder<R>,
    network: Arc<N>,
    ui: UiProjector,
    config: FlowConfig,
    character: watch::Sender<Character>,
    scenes: Option<SceneObserver>,
}

impl<L, R, N> LobbyFlow<L, R, N>
where
    L: LobbyService,
    R: RelayService,
    N: NetworkSession,
{
    pub fn new(
        coordinator: SessionCoordinator<L>,
        relay: Arc<R>,
        network: Arc<N>,
        config: FlowConfig,
    ) -> Self {
        let (character, _) = watch::channel(coordinator.local_player().character());
        Self {
            coordinator,
            relay: RelayBinder::new(relay),
            network,
            ui: UiProjector::new(),
            config,
            character,
            scenes: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn coordinator(&self) -> &SessionCoordinator<L> {
        &self.coordinator
    }

    /// Direct access for lobby operations the flows don't wrap
    /// (shared-data writes, refresh).
    pub fn coordinator_mut(&mut self) -> &mut SessionCoordinator<L> {
        &mut self.coordinator
    }

    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    pub fn relay(&self) -> &RelayBinder<R> {
        &self.relay
    }

    pub fn ui(&self) -> &UiProjector {
        &self.ui
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// True while a scene observer is registered.
    pub fn observing_scenes(&self) -> bool {
        self.scenes.as_ref().is_some_and(|s| !s.is_finished())
    }

    // -----------------------------------------------------------------------
    // Host
    // -----------------------------------------------------------------------

    /// Creates a lobby, binds a relay, publishes the join code and starts
    /// hosting.
    ///
    /// If anything after the lobby creation fails, the lobby is closed
    /// again before the error is returned. If even the close fails, the
    /// session is dropped locally and its heartbeat stopped, so the
    /// provider purges the lobby as inactive.
    pub async fn host_lobby(&mut self, settings: LobbySettings) -> Result<RelayBinding, ConnectError> {
        self.ui.show(UiState::Loading);
        let max_connections = self.config.relay_connections_for(settings.max_players);

        if let Err(e) = self.coordinator.create_session(settings).await {
            self.ui.show_message(UiState::Menu, format!("could not create lobby: {e}"));
            return Err(e.into());
        }

        match self.finish_hosting(max_connections).await {
            Ok(binding) => {
                self.start_observing();
                self.ui.show(UiState::HostingLobby);
                tracing::info!(join_code = %binding.join_code, "hosting lobby");
                Ok(binding)
            }
            Err(e) => {
                tracing::warn!(error = %e, "hosting failed, closing lobby");
                if let Err(cleanup) = self.coordinator.close().await {
                    // Without heartbeats the provider purges the lobby.
                    tracing::error!(error = %cleanup, "closing lobby after failed host setup failed, abandoning it");
                    self.coordinator.reset();
                }
                self.network.shutdown().await;
                self.ui.show_message(UiState::Menu, format!("unable to start host: {e}"));
                Err(e)
            }
        }
    }

    async fn finish_hosting(&mut self, max_connections: u32) -> Result<RelayBinding, ConnectError> {
        let binding = self.relay.bind_host(max_connections).await?;
        self.coordinator
            .update_shared_data(JOIN_CODE_KEY, binding.join_code.as_str(), Visibility::Public)
            .await?;
        let me = self.coordinator.local_player().id().clone();
        self.coordinator
            .set_player_allocation(&me, binding.allocation_id.clone())
            .await?;
        self.network
            .start_host(&binding)
            .await
            .map_err(ConnectError::Network)?;
        Ok(binding)
    }

    // -----------------------------------------------------------------------
    // Client
    // -----------------------------------------------------------------------

    /// Joins a random open lobby running our game version and connects to
    /// its host.
    ///
    /// Returns `Ok(false)` when there was nothing to join.
    pub async fn join_random_lobby(&mut self) -> Result<bool, ConnectError> {
        self.ui.show(UiState::Loading);

        match self.coordinator.search_and_join_random().await {
            Ok(true) => {}
            Ok(false) => {
                self.ui.show_message(UiState::Menu, "no lobby found");
                return Ok(false);
            }
            Err(e) => {
                self.ui.show_message(UiState::Menu, format!("could not join a lobby: {e}"));
                return Err(e.into());
            }
        }

        self.connect_as_client().await.map(|_| true)
    }

    /// Joins a specific lobby and connects to its host.
    pub async fn join_lobby_by_id(&mut self, lobby_id: &LobbyId) -> Result<RelayBinding, ConnectError> {
        self.ui.show(UiState::Loading);

        if let Err(e) = self.coordinator.try_join_by_id(lobby_id).await {
            self.ui.show_message(UiState::Menu, format!("could not join lobby {lobby_id}: {e}"));
            return Err(e.into());
        }

        self.connect_as_client().await
    }

    /// Lets the lobby service pick a lobby matching `filters`, then
    /// connects to its host.
    pub async fn quick_join(&mut self, filters: &[QueryFilter]) -> Result<RelayBinding, ConnectError> {
        self.ui.show(UiState::Loading);

        if let Err(e) = self.coordinator.quick_join(filters).await {
            let message = if e.is_not_found() {
                "no lobby found".to_owned()
            } else {
                format!("quick join failed: {e}")
            };
            self.ui.show_message(UiState::Menu, message);
            return Err(e.into());
        }

        self.connect_as_client().await
    }

    async fn connect_as_client(&mut self) -> Result<RelayBinding, ConnectError> {
        match self.finish_joining().await {
            Ok(binding) => {
                self.start_observing();
                self.ui.show(UiState::JoinedLobby);
                tracing::info!(join_code = %binding.join_code, "joined lobby as client");
                Ok(binding)
            }
            Err(e) => {
                tracing::warn!(error = %e, "client setup failed, leaving lobby");
                if let Err(cleanup) = self.coordinator.leave().await {
                    tracing::error!(error = %cleanup, "leaving lobby after failed client setup failed, abandoning it");
                    self.coordinator.reset();
                }
                self.network.shutdown().await;
                self.ui.show_message(UiState::Menu, format!("unable to start client: {e}"));
                Err(e)
            }
        }
    }

    async fn finish_joining(&mut self) -> Result<RelayBinding, ConnectError> {
        let lobby = self
            .coordinator
            .current_session()
            .ok_or(SessionError::NoActiveSession)?;
        let join_code = lobby
            .join_code()
            .ok_or_else(|| ConnectError::MissingJoinCode(lobby.id.clone()))?;

        let binding = self.relay.bind_client(&join_code).await?;
        let me = self.coordinator.local_player().id().clone();
        self.coordinator
            .set_player_allocation(&me, binding.allocation_id.clone())
            .await?;
        self.network
            .start_client(&binding)
            .await
            .map_err(ConnectError::Network)?;
        Ok(binding)
    }

    // -----------------------------------------------------------------------
    // Browse
    // -----------------------------------------------------------------------

    /// Lists open lobbies for our game version in the browser.
    pub async fn browse(&mut self) -> Result<Vec<Lobby>, ConnectError> {
        let query = QuerySpec::open_lobbies(&self.coordinator.config().game_version);
        self.browse_with(&query).await
    }

    /// Lists lobbies matching `query` in the browser.
    pub async fn browse_with(&mut self, query: &QuerySpec) -> Result<Vec<Lobby>, ConnectError> {
        let prior = self.ui.state();
        self.ui.show(UiState::Loading);

        match self.coordinator.search_sessions(query).await {
            Ok(lobbies) => {
                self.ui.show_browser(lobbies.clone());
                Ok(lobbies)
            }
            Err(e) => {
                self.ui.show_message(prior, format!("search failed: {e}"));
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Leave, close, start
    // -----------------------------------------------------------------------

    /// Leaves the joined lobby and shuts the client down.
    ///
    /// Hosts close instead; for them this does nothing.
    pub async fn leave_lobby(&mut self) -> Result<(), ConnectError> {
        if self.coordinator.is_host() {
            tracing::debug!("host can't leave its own lobby, ignoring");
            return Ok(());
        }
        let prior = self.ui.state();
        self.ui.show(UiState::Loading);

        if let Err(e) = self.coordinator.leave().await {
            self.ui.show_message(prior, format!("could not leave lobby: {e}"));
            return Err(e.into());
        }
        self.end_network_session().await;
        self.ui.show(UiState::Menu);
        Ok(())
    }

    /// Deletes the hosted lobby and shuts the host down.
    ///
    /// Only the host can close; for anyone else this does nothing.
    pub async fn close_lobby(&mut self) -> Result<(), ConnectError> {
        if self.coordinator.current_session().is_some() && !self.coordinator.is_host() {
            tracing::debug!("only the host can close the lobby, ignoring");
            return Ok(());
        }
        let prior = self.ui.state();
        self.ui.show(UiState::Loading);

        if let Err(e) = self.coordinator.close().await {
            self.ui.show_message(prior, format!("could not close lobby: {e}"));
            return Err(e.into());
        }
        self.end_network_session().await;
        self.ui.show(UiState::Menu);
        Ok(())
    }

    /// Switches every peer to the game scene. Host only.
    pub async fn start_game(&mut self) -> Result<(), ConnectError> {
        if !self.coordinator.is_host() || self.network.role() != NetworkRole::Host {
            return Err(ConnectError::NotHost);
        }
        let prior = self.ui.state();
        self.ui.show(UiState::Loading);

        match self.network.load_scene(&self.config.game_scene).await {
            Ok(()) => {
                tracing::info!(scene = %self.config.game_scene, "game started");
                self.ui.show(prior);
                Ok(())
            }
            Err(e) => {
                self.ui.show_message(prior, format!("could not start game: {e}"));
                Err(ConnectError::Network(e))
            }
        }
    }

    /// Picks the local player's character. Pushed to the lobby when in
    /// one, and used for the next game scene load either way.
    pub async fn set_character(&mut self, character: Character) -> Result<(), ConnectError> {
        self.character.send_replace(character);
        self.coordinator
            .set_local_player_data(CHARACTER_KEY, character.as_str(), Visibility::Member)
            .await?;
        Ok(())
    }

    /// The network session went away underneath us: forget the lobby
    /// locally and go back to the menu.
    pub async fn network_lost(&mut self) {
        tracing::warn!("network session lost, resetting");
        self.coordinator.reset();
        self.end_network_session().await;
        self.ui.show_message(UiState::Menu, "connection lost");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start_observing(&mut self) {
        self.scenes = Some(SceneObserver::spawn(
            Arc::clone(&self.network),
            self.config.lobby_scene.clone(),
            self.character.subscribe(),
        ));
    }

    async fn end_network_session(&mut self) {
        self.scenes = None;
        self.network.shutdown().await;
    }
}
