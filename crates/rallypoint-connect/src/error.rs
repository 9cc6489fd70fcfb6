//! Error types for the connect layer.

use rallypoint_protocol::LobbyId;
use rallypoint_services::ServiceError;
use rallypoint_session::SessionError;

/// Errors that can occur while connecting to (or tearing down) a game.
///
/// Every multi-step flow that fails after the lobby step has already run
/// its cleanup by the time one of these reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// A lobby step failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The relay service refused an allocation or join code.
    #[error("relay failed: {0}")]
    Relay(ServiceError),

    /// The network layer couldn't start (or switch scenes).
    #[error("network failed: {0}")]
    Network(ServiceError),

    /// The joined lobby doesn't advertise a relay join code yet.
    #[error("lobby {0} has no join code")]
    MissingJoinCode(LobbyId),

    /// Only the running host can do this.
    #[error("only the host can do this")]
    NotHost,
}

impl ConnectError {
    /// True when the failure just means "nothing to join".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_not_found())
    }
}
