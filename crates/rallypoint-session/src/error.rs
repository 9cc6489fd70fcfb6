//! Error types for the session layer.

use rallypoint_protocol::LobbyId;
use rallypoint_services::ServiceError;

/// Errors surfaced by the [`SessionCoordinator`](crate::SessionCoordinator).
///
/// Remote failures keep their kind on the way up: a missing lobby is
/// `NotFound`, an outage is `ServiceUnavailable`. Collapsing them into
/// "it didn't work" is left to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Bad input to create or update: empty name, capacity out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The lobby doesn't exist, or no lobby matched a quick join.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient remote failure (outage, rate limit).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The write was based on a stale snapshot, or the lobby is full.
    #[error("conflict: {0}")]
    ConflictOrStale(String),

    /// The service refused the call for this player.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation needs an active session and there is none.
    #[error("no active session")]
    NoActiveSession,

    /// One lobby at a time: leave or close the current one first.
    #[error("already in lobby {0}")]
    AlreadyInSession(LobbyId),

    /// Only the host may do this.
    #[error("only the host can do this")]
    NotHost,
}

impl SessionError {
    /// Whether this is a normal "nothing there" outcome rather than a
    /// failure. Quick join misses land here.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ServiceError> for SessionError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::Validation(msg),
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::Unavailable(msg) => Self::ServiceUnavailable(msg),
            ServiceError::RateLimited { retry_after } => {
                Self::ServiceUnavailable(format!("rate limited, retry after {retry_after:?}"))
            }
            ServiceError::Conflict(msg) => Self::ConflictOrStale(msg),
            ServiceError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}
