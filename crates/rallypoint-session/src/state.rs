//! Coordinator state, events, and configuration.

use std::fmt;

use rallypoint_heartbeat::HeartbeatConfig;
use rallypoint_protocol::{Lobby, LobbyId};

/// Where the coordinator is in its lifecycle.
///
/// The transitional states (`Creating`, `Searching`, `Joining`,
/// `Closing`, `Leaving`) only exist while a remote call is in flight.
/// A failed call falls back to the stable state it started from.
///
/// ```text
///             create            close
/// NoSession ─────────→ Hosting ───────→ NoSession
///     │
///     │ search / join    leave
///     └──────────────→ Joined ───────→ NoSession
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoordinatorState {
    #[default]
    NoSession,
    Creating,
    Hosting,
    Searching,
    Joining,
    Joined,
    Closing,
    Leaving,
}

impl CoordinatorState {
    /// True for states a remote call can't leave us in.
    pub fn is_stable(self) -> bool {
        matches!(self, Self::NoSession | Self::Hosting | Self::Joined)
    }

    /// True while a remote call is in flight.
    pub fn is_busy(self) -> bool {
        !self.is_stable()
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSession => "no-session",
            Self::Creating => "creating",
            Self::Hosting => "hosting",
            Self::Searching => "searching",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Closing => "closing",
            Self::Leaving => "leaving",
        };
        f.write_str(name)
    }
}

/// Something observable happened to the coordinator.
///
/// Delivered over a broadcast channel; slow subscribers may miss events
/// and should re-read [`SessionCoordinator::current_session`](crate::SessionCoordinator::current_session)
/// after a lag.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    StateChanged {
        from: CoordinatorState,
        to: CoordinatorState,
    },
    /// The local snapshot was replaced with a newer one.
    SessionReplaced(Lobby),
    /// The local snapshot was dropped (closed, left, or gone remotely).
    SessionCleared { lobby_id: LobbyId },
}

/// Tunables for a [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Stamped into every created lobby under `Version` and used to
    /// filter searches, so mismatched builds never meet.
    pub game_version: String,

    /// Upper bound for `max_players` on create.
    pub max_players: u32,

    /// Upper bound for lobby name length, in characters.
    pub max_name_len: usize,

    /// Heartbeat settings while hosting. `None` disables heartbeats.
    pub heartbeat: Option<HeartbeatConfig>,

    /// Send the last-seen revision with shared-data writes so that a
    /// stale snapshot is rejected instead of overwriting newer data.
    pub optimistic_writes: bool,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            game_version: "0.1".into(),
            max_players: 100,
            max_name_len: 64,
            heartbeat: Some(HeartbeatConfig::default()),
            optimistic_writes: true,
            event_capacity: 64,
        }
    }
}

impl CoordinatorConfig {
    /// Default config stamped with a different game version.
    pub fn for_version(version: impl Into<String>) -> Self {
        Self {
            game_version: version.into(),
            ..Self::default()
        }
    }
}
