//! Flow configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FlowConfig
// ---------------------------------------------------------------------------

/// Settings for a [`LobbyFlow`](crate::LobbyFlow).
///
/// Scene names are whatever the game's network layer understands; the
/// flow only passes them through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Scene the host switches everyone to on "start game".
    pub game_scene: String,

    /// The lobby scene. Loading it doesn't trigger visuals requests.
    pub lobby_scene: String,

    /// Relay capacity to request when hosting. `None` sizes the
    /// allocation from the lobby: every seat except the host's own.
    pub relay_max_connections: Option<u32>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            game_scene: "Game".into(),
            lobby_scene: "Lobby".into(),
            relay_max_connections: None,
        }
    }
}

impl FlowConfig {
    pub fn with_game_scene(mut self, scene: impl Into<String>) -> Self {
        self.game_scene = scene.into();
        self
    }

    pub fn with_lobby_scene(mut self, scene: impl Into<String>) -> Self {
        self.lobby_scene = scene.into();
        self
    }

    pub fn with_relay_max_connections(mut self, max_connections: u32) -> Self {
        self.relay_max_connections = Some(max_connections.max(1));
        self
    }

    /// Relay connections to reserve for a lobby of `max_players`.
    pub fn relay_connections_for(&self, max_players: u32) -> u32 {
        self.relay_max_connections
            .unwrap_or_else(|| max_players.saturating_sub(1))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_config_default() {
        let config = FlowConfig::default();
        assert_eq!(config.game_scene, "Game");
        assert_eq!(config.lobby_scene, "Lobby");
        assert_eq!(config.relay_max_connections, None);
    }

    #[test]
    fn test_relay_connections_follow_lobby_size() {
        let config = FlowConfig::default();
        assert_eq!(config.relay_connections_for(4), 3);
        assert_eq!(config.relay_connections_for(1), 1);
    }

    #[test]
    fn test_explicit_relay_connections_win() {
        let config = FlowConfig::default().with_relay_max_connections(10);
        assert_eq!(config.relay_connections_for(4), 10);

        let config = FlowConfig::default().with_relay_max_connections(0);
        assert_eq!(config.relay_connections_for(4), 1);
    }
}
