//! # Rallypoint
//!
//! Lobby, relay, and session coordination for multiplayer games.
//!
//! Rallypoint sits between a game's UI and three hosted services: a lobby
//! provider, a relay provider, and an identity provider. It keeps one
//! authoritative local view of "the lobby I'm in", runs the multi-step
//! host and join flows with cleanup when a step fails, keeps hosted
//! lobbies alive with heartbeats, and publishes which screen the UI
//! should show.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rallypoint::prelude::*;
//!
//! # async fn run() -> Result<(), RallypointError> {
//! let services = LocalServices::new();
//! let mut host = services.connect(RallypointClient::builder(), "host", 0).await?;
//! let _binding = host.host_lobby(LobbySettings::new("Test", 4)).await?;
//!
//! let mut guest = services.connect(RallypointClient::builder(), "guest", 1).await?;
//! guest.join_random_lobby().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod logging;

pub use client::{LocalFlow, LocalServices, RallypointClient, RallypointClientBuilder};
pub use error::RallypointError;

pub use rallypoint_connect as connect;
pub use rallypoint_heartbeat as heartbeat;
pub use rallypoint_protocol as protocol;
pub use rallypoint_services as services;
pub use rallypoint_session as session;

pub mod prelude {
    pub use crate::logging::{DEFAULT_FILTER, init_tracing};
    pub use crate::{LocalFlow, LocalServices, RallypointClient, RallypointError};

    pub use rallypoint_connect::{
        ConnectError, FlowConfig, LobbyFlow, ScreenLayout, UiSnapshot, UiState,
    };
    pub use rallypoint_heartbeat::HeartbeatConfig;
    pub use rallypoint_protocol::{
        CHARACTER_KEY, Character, FilterOp, JOIN_CODE_KEY, JoinCode, Lobby, LobbyId, PlayerId,
        QueryField, QueryFilter, QueryOrder, QuerySpec, READY_KEY, RelayBinding, VERSION_INDEX,
        VERSION_KEY, Visibility,
    };
    pub use rallypoint_services::{
        IdentityService, LobbyService, NetworkRole, NetworkSession, RelayService, ServiceError,
    };
    pub use rallypoint_session::{
        CoordinatorConfig, CoordinatorEvent, CoordinatorState, LobbySettings, LocalPlayer,
        SessionCoordinator, SessionError,
    };
}
