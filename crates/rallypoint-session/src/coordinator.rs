//! The session coordinator: one lobby at a time, one call at a time.
//!
//! `SessionCoordinator` holds the only local snapshot of the active lobby
//! and is the only thing that mutates it. Every operation takes
//! `&mut self`, so the borrow checker guarantees that at most one remote
//! call is in flight and that nobody observes a half-applied update.
//! Anything that wants to watch it from elsewhere subscribes to
//! [`CoordinatorEvent`]s instead of sharing the snapshot.
//!
//! # Snapshot rules
//!
//! - The snapshot is replaced wholesale with whatever the service
//!   returns. It's never patched locally.
//! - A failed remote call leaves the snapshot untouched and puts the
//!   state machine back where the call started.
//! - `leave` and `close` only clear the snapshot after the service
//!   confirms (or reports the lobby already gone).
//!
//! # Heartbeats
//!
//! While hosting, a heartbeat task keeps the lobby alive. Host-side data
//! writes nudge it so the service sees a beat shortly after the change.
//! The task is owned by the coordinator: close, reset, or drop it and the
//! heartbeat stops.

use std::sync::Arc;

use rallypoint_heartbeat::{HeartbeatHandle, spawn_heartbeat};
use rallypoint_protocol::{
    AllocationId, Codec, CreateLobbyRequest, DataObject, JsonCodec, Lobby, LobbyId, PlayerId,
    QueryFilter, QuerySpec, UpdateLobbyRequest, UpdatePlayerRequest, VERSION_INDEX, VERSION_KEY,
    Visibility,
};
use rallypoint_services::{LobbyService, ServiceError};
use rand::seq::IndexedRandom;
use tokio::sync::broadcast;

use crate::{CoordinatorConfig, CoordinatorEvent, CoordinatorState, LocalPlayer, SessionError};

/// What the host asks for when creating a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySettings {
    pub name: String,
    pub max_players: u32,
    pub is_private: bool,
}

impl LobbySettings {
    pub fn new(name: impl Into<String>, max_players: u32) -> Self {
        Self {
            name: name.into(),
            max_players,
            is_private: false,
        }
    }

    /// Private lobbies never show up in searches; join them by id.
    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }
}

/// Owns the local view of the active lobby.
///
/// Generic over the lobby service so tests (and the demo) can plug in the
/// in-memory loopback.
pub struct SessionCoordinator<L: LobbyService> {
    lobby: Arc<L>,
    player: LocalPlayer,
    config: CoordinatorConfig,
    current: Option<Lobby>,
    state: CoordinatorState,
    heartbeat: Option<HeartbeatHandle>,
    events: broadcast::Sender<CoordinatorEvent>,
    codec: JsonCodec,
}

impl<L: LobbyService> SessionCoordinator<L> {
    pub fn new(lobby: Arc<L>, player: LocalPlayer, config: CoordinatorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            lobby,
            player,
            config,
            current: None,
            state: CoordinatorState::NoSession,
            heartbeat: None,
            events,
            codec: JsonCodec,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The active lobby snapshot, if any.
    pub fn current_session(&self) -> Option<&Lobby> {
        self.current.as_ref()
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn local_player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn lobby_service(&self) -> &Arc<L> {
        &self.lobby
    }

    /// True when a session is active and the local player hosts it.
    pub fn is_host(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|lobby| lobby.is_host(self.player.id()))
    }

    /// True while a heartbeat task is alive for the hosted lobby.
    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(|hb| !hb.is_finished())
    }

    /// Registers an observer of state and snapshot changes.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Creates a lobby hosted by the local player and makes it the active
    /// session.
    ///
    /// The lobby is stamped with the configured game version (indexed
    /// under [`VERSION_INDEX`]) so that version-filtered searches can
    /// find it.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyInSession`] if a session is active
    /// - [`SessionError::Validation`] for a blank or overlong name, or a
    ///   capacity outside `1..=max_players`
    /// - whatever the service reports
    pub async fn create_session(&mut self, settings: LobbySettings) -> Result<&Lobby, SessionError> {
        self.ensure_idle()?;
        self.validate(&settings)?;

        let mut data = std::collections::BTreeMap::new();
        data.insert(
            VERSION_KEY.to_owned(),
            DataObject::new(Visibility::Public, self.config.game_version.clone())
                .indexed(VERSION_INDEX),
        );
        let request = CreateLobbyRequest {
            name: settings.name,
            max_players: settings.max_players,
            is_private: settings.is_private,
            player: self.player.as_player(),
            data,
        };

        self.transition(CoordinatorState::Creating);
        match self.lobby.create_lobby(request).await {
            Ok(lobby) => {
                tracing::info!(
                    lobby_id = %lobby.id,
                    name = %lobby.name,
                    max_players = lobby.max_players,
                    "lobby created"
                );
                let lobby_id = lobby.id.clone();
                self.replace_session(lobby);
                self.start_heartbeat(lobby_id);
                self.transition(CoordinatorState::Hosting);
                self.session()
            }
            Err(e) => {
                tracing::warn!(error = %e, "lobby creation failed");
                self.transition(CoordinatorState::NoSession);
                Err(e.into())
            }
        }
    }

    fn validate(&self, settings: &LobbySettings) -> Result<(), SessionError> {
        if settings.name.trim().is_empty() {
            return Err(SessionError::Validation("lobby name must not be empty".into()));
        }
        if settings.name.chars().count() > self.config.max_name_len {
            return Err(SessionError::Validation(format!(
                "lobby name is longer than {} characters",
                self.config.max_name_len
            )));
        }
        if settings.max_players == 0 || settings.max_players > self.config.max_players {
            return Err(SessionError::Validation(format!(
                "max players must be between 1 and {}",
                self.config.max_players
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Search & join
    // -----------------------------------------------------------------------

    /// Runs `query` against the service. Doesn't touch the session.
    ///
    /// At most `query.count()` lobbies come back.
    pub async fn search_sessions(&self, query: &QuerySpec) -> Result<Vec<Lobby>, SessionError> {
        let mut results = self.lobby.query_lobbies(query).await?;
        results.truncate(query.count());
        tracing::debug!(found = results.len(), "lobby search finished");
        Ok(results)
    }

    /// Searches for open lobbies running our game version and joins one at
    /// random.
    ///
    /// Returns `Ok(false)` when nothing matched. That's a normal outcome,
    /// not an error.
    pub async fn search_and_join_random(&mut self) -> Result<bool, SessionError> {
        self.ensure_idle()?;

        self.transition(CoordinatorState::Searching);
        let query = QuerySpec::open_lobbies(&self.config.game_version);
        let results = match self.search_sessions(&query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "lobby search failed");
                self.transition(CoordinatorState::NoSession);
                return Err(e);
            }
        };

        let pick = {
            let mut rng = rand::rng();
            results.choose(&mut rng).map(|lobby| lobby.id.clone())
        };
        let Some(lobby_id) = pick else {
            tracing::info!("no open lobby found");
            self.transition(CoordinatorState::NoSession);
            return Ok(false);
        };
        tracing::debug!(%lobby_id, candidates = results.len(), "picked a lobby at random");

        self.join_inner(&lobby_id).await.map(|_| true)
    }

    /// Lets the service pick a lobby matching `filters` and joins it.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] when nothing matched.
    pub async fn quick_join(&mut self, filters: &[QueryFilter]) -> Result<&Lobby, SessionError> {
        self.ensure_idle()?;

        let player = self.player.as_player();
        self.transition(CoordinatorState::Joining);
        match self.lobby.quick_join(filters, &player).await {
            Ok(lobby) => {
                tracing::info!(lobby_id = %lobby.id, "quick joined lobby");
                self.replace_session(lobby);
                self.transition(CoordinatorState::Joined);
                self.session()
            }
            Err(e) => {
                tracing::info!(error = %e, "quick join failed");
                self.transition(CoordinatorState::NoSession);
                Err(e.into())
            }
        }
    }

    /// Joins a specific lobby, keeping the failure kind.
    pub async fn try_join_by_id(&mut self, lobby_id: &LobbyId) -> Result<&Lobby, SessionError> {
        self.ensure_idle()?;
        self.join_inner(lobby_id).await
    }

    /// Joins a specific lobby. `false` on any failure, with the session
    /// left as it was.
    pub async fn join_by_id(&mut self, lobby_id: &LobbyId) -> bool {
        match self.try_join_by_id(lobby_id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(%lobby_id, error = %e, "join by id failed");
                false
            }
        }
    }

    async fn join_inner(&mut self, lobby_id: &LobbyId) -> Result<&Lobby, SessionError> {
        let player = self.player.as_player();
        self.transition(CoordinatorState::Joining);
        match self.lobby.join_by_id(lobby_id, &player).await {
            Ok(lobby) => {
                tracing::info!(%lobby_id, players = lobby.players.len(), "joined lobby");
                self.replace_session(lobby);
                self.transition(CoordinatorState::Joined);
                self.session()
            }
            Err(e) => {
                self.transition(CoordinatorState::NoSession);
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Leave & close
    // -----------------------------------------------------------------------

    /// Leaves the active lobby as a member.
    ///
    /// No-op without a session, and no-op for the host (hosts close).
    /// A lobby that's already gone counts as left.
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        let Some(lobby) = &self.current else {
            return Ok(());
        };
        if lobby.is_host(self.player.id()) {
            tracing::debug!(lobby_id = %lobby.id, "host can't leave, ignoring");
            return Ok(());
        }
        let lobby_id = lobby.id.clone();
        let prior = self.state;

        self.transition(CoordinatorState::Leaving);
        match self.lobby.remove_player(&lobby_id, self.player.id()).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => {
                tracing::info!(%lobby_id, "left lobby");
                self.clear_session();
                self.transition(CoordinatorState::NoSession);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%lobby_id, error = %e, "leave failed");
                self.transition(prior);
                Err(e.into())
            }
        }
    }

    /// Deletes the hosted lobby.
    ///
    /// No-op without a session and for non-hosts, so a second close is
    /// harmless. A lobby that's already gone counts as closed.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        let Some(lobby) = &self.current else {
            return Ok(());
        };
        if !lobby.is_host(self.player.id()) {
            tracing::debug!(lobby_id = %lobby.id, "only the host can close, ignoring");
            return Ok(());
        }
        let lobby_id = lobby.id.clone();
        let prior = self.state;

        self.transition(CoordinatorState::Closing);
        if let Some(heartbeat) = &self.heartbeat {
            heartbeat.pause();
        }
        match self.lobby.delete_lobby(&lobby_id).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => {
                tracing::info!(%lobby_id, "lobby closed");
                self.stop_heartbeat().await;
                self.clear_session();
                self.transition(CoordinatorState::NoSession);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%lobby_id, error = %e, "close failed");
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.resume();
                }
                self.transition(prior);
                Err(e.into())
            }
        }
    }

    /// Forgets the active session without telling the service.
    ///
    /// Used when the network layer went away underneath us.
    pub fn reset(&mut self) {
        if self.current.is_some() {
            tracing::info!("session reset locally");
        }
        self.clear_session();
        self.transition(CoordinatorState::NoSession);
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Writes one shared lobby key (host only).
    ///
    /// The full data map goes out with the merged key, so other keys are
    /// preserved. With optimistic writes on, a stale snapshot is rejected
    /// by the service; we then refresh and report
    /// [`SessionError::ConflictOrStale`] so the caller can retry against
    /// fresh data. If the refresh finds the lobby gone, the session is
    /// cleared and [`SessionError::NotFound`] is returned instead.
    pub async fn update_shared_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        visibility: Visibility,
    ) -> Result<&Lobby, SessionError> {
        let lobby = self.session()?;
        if !lobby.is_host(self.player.id()) {
            return Err(SessionError::NotHost);
        }

        let key = key.into();
        let mut data = lobby.data.clone();
        let index = data.get(&key).and_then(|existing| existing.index);
        data.insert(
            key.clone(),
            DataObject {
                visibility,
                value: value.into(),
                index,
            },
        );
        let request = UpdateLobbyRequest {
            data,
            expected_revision: self.config.optimistic_writes.then_some(lobby.revision),
        };
        let lobby_id = lobby.id.clone();

        match self.lobby.update_lobby(&lobby_id, request).await {
            Ok(updated) => {
                tracing::debug!(%lobby_id, %key, revision = updated.revision, "shared data updated");
                self.replace_session(updated);
                if let Some(heartbeat) = &self.heartbeat {
                    heartbeat.nudge();
                }
                self.session()
            }
            Err(ServiceError::Conflict(msg)) => {
                tracing::warn!(%lobby_id, %key, "shared data write was stale, refreshing");
                match self.refresh().await {
                    Err(gone @ SessionError::NotFound(_)) => Err(gone),
                    Err(e) => {
                        tracing::warn!(%lobby_id, error = %e, "refresh after stale write failed");
                        Err(SessionError::ConflictOrStale(msg))
                    }
                    Ok(_) => Err(SessionError::ConflictOrStale(msg)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records a relay allocation on a member of the active lobby, then
    /// re-reads the lobby.
    pub async fn set_player_allocation(
        &mut self,
        player_id: &PlayerId,
        allocation_id: AllocationId,
    ) -> Result<&Lobby, SessionError> {
        let lobby_id = self.session()?.id.clone();
        let request = UpdatePlayerRequest {
            allocation_id: Some(allocation_id),
            data: None,
        };
        let updated = self.lobby.update_player(&lobby_id, player_id, request).await?;
        self.replace_session(updated);

        let fresh = self.lobby.get_lobby(&lobby_id).await?;
        self.replace_session(fresh);
        tracing::debug!(%lobby_id, %player_id, "player allocation recorded");
        self.session()
    }

    /// Sets one of the local player's own annotations. When in a session
    /// the full player data is pushed to the service as well.
    pub async fn set_local_player_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        visibility: Visibility,
    ) -> Result<(), SessionError> {
        self.player.set_data(key, value, visibility);

        let Some(lobby) = &self.current else {
            return Ok(());
        };
        let lobby_id = lobby.id.clone();
        let request = UpdatePlayerRequest {
            allocation_id: None,
            data: Some(self.player.data().clone()),
        };
        let updated = self
            .lobby
            .update_player(&lobby_id, self.player.id(), request)
            .await?;
        self.replace_session(updated);
        Ok(())
    }

    /// Re-fetches the active lobby.
    ///
    /// If the lobby is gone the session is cleared and
    /// [`SessionError::NotFound`] is returned.
    pub async fn refresh(&mut self) -> Result<&Lobby, SessionError> {
        let lobby_id = self.session()?.id.clone();
        match self.lobby.get_lobby(&lobby_id).await {
            Ok(fresh) => {
                self.replace_session(fresh);
                self.session()
            }
            Err(ServiceError::NotFound(msg)) => {
                tracing::info!(%lobby_id, "lobby is gone, clearing session");
                self.clear_session();
                self.transition(CoordinatorState::NoSession);
                Err(SessionError::NotFound(msg))
            }
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn session(&self) -> Result<&Lobby, SessionError> {
        self.current.as_ref().ok_or(SessionError::NoActiveSession)
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match &self.current {
            Some(lobby) => Err(SessionError::AlreadyInSession(lobby.id.clone())),
            None => Ok(()),
        }
    }

    fn transition(&mut self, to: CoordinatorState) {
        let from = std::mem::replace(&mut self.state, to);
        if from != to {
            tracing::trace!(%from, %to, "coordinator state changed");
            self.emit(CoordinatorEvent::StateChanged { from, to });
        }
    }

    fn replace_session(&mut self, lobby: Lobby) {
        if tracing::enabled!(tracing::Level::TRACE) {
            let rendered = self
                .codec
                .render(&lobby)
                .unwrap_or_else(|e| format!("<unrenderable: {e}>"));
            tracing::trace!(snapshot = %rendered, "lobby snapshot");
        }
        self.current = Some(lobby.clone());
        self.emit(CoordinatorEvent::SessionReplaced(lobby));
    }

    fn clear_session(&mut self) {
        // Dropping the handle aborts the task.
        self.heartbeat = None;
        if let Some(lobby) = self.current.take() {
            self.emit(CoordinatorEvent::SessionCleared { lobby_id: lobby.id });
        }
    }

    async fn stop_heartbeat(&mut self) {
        let Some(heartbeat) = self.heartbeat.take() else {
            return;
        };
        if let Some(report) = heartbeat.stop().await {
            tracing::debug!(
                exit = ?report.exit,
                beats = report.metrics.total_beats,
                failures = report.metrics.total_failures,
                "heartbeat stopped"
            );
        }
    }

    fn start_heartbeat(&mut self, lobby_id: LobbyId) {
        let Some(config) = self.config.heartbeat.clone() else {
            return;
        };
        let lobby = Arc::clone(&self.lobby);
        let label = lobby_id.to_string();
        self.heartbeat = Some(spawn_heartbeat(label, config, move || {
            let lobby = Arc::clone(&lobby);
            let lobby_id = lobby_id.clone();
            async move { lobby.send_heartbeat(&lobby_id).await }
        }));
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use rallypoint_services::memory::MemoryLobbyService;

    use super::*;

    fn coordinator(id: &str) -> SessionCoordinator<MemoryLobbyService> {
        SessionCoordinator::new(
            Arc::new(MemoryLobbyService::new()),
            LocalPlayer::new(PlayerId::from(id)),
            CoordinatorConfig::default(),
        )
    }

    #[test]
    fn test_settings_default_to_public() {
        let settings = LobbySettings::new("Test", 4);
        assert!(!settings.is_private);
        assert!(settings.private(true).is_private);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let c = coordinator("host");
        assert!(c.validate(&LobbySettings::new("   ", 4)).is_err());
        assert!(c.validate(&LobbySettings::new("x".repeat(65), 4)).is_err());
        assert!(c.validate(&LobbySettings::new("Test", 0)).is_err());
        assert!(c.validate(&LobbySettings::new("Test", 101)).is_err());
        assert!(c.validate(&LobbySettings::new("x".repeat(64), 100)).is_ok());
    }

    #[test]
    fn test_new_coordinator_is_idle() {
        let c = coordinator("host");
        assert_eq!(c.state(), CoordinatorState::NoSession);
        assert!(c.current_session().is_none());
        assert!(!c.is_host());
        assert!(!c.heartbeat_running());
    }

    #[tokio::test]
    async fn test_update_without_session_is_rejected() {
        let mut c = coordinator("host");
        let err = c
            .update_shared_data("Mode", "ffa", Visibility::Public)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NoActiveSession);
    }

    #[tokio::test]
    async fn test_reset_clears_without_remote_calls() {
        let mut c = coordinator("host");
        c.create_session(LobbySettings::new("Test", 4)).await.unwrap();
        let requests = c.lobby_service().request_count();

        c.reset();
        assert!(c.current_session().is_none());
        assert_eq!(c.state(), CoordinatorState::NoSession);
        assert!(!c.heartbeat_running());
        assert_eq!(c.lobby_service().request_count(), requests);
    }
}
