//! Unified error type for Rallypoint.

use rallypoint_connect::ConnectError;
use rallypoint_protocol::ProtocolError;
use rallypoint_services::ServiceError;
use rallypoint_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rallypoint` facade, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RallypointError {
    /// Encoding or decoding a lobby payload failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A raw service call failed (sign-in, direct service use).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A lobby operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A connect flow failed (relay, network start).
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

impl RallypointError {
    /// True when the failure just means "nothing there": no lobby found,
    /// unknown lobby id.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Service(e) => matches!(e, ServiceError::NotFound(_)),
            Self::Session(e) => e.is_not_found(),
            Self::Connect(e) => e.is_not_found(),
            Self::Protocol(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use rallypoint_protocol::LobbyId;

    use super::*;

    #[test]
    fn test_from_service_error() {
        let err: RallypointError = ServiceError::Unavailable("down".into()).into();
        assert!(matches!(err, RallypointError::Service(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::Unknown {
            kind: "character",
            value: "NOBODY".into(),
        };
        let err: RallypointError = err.into();
        assert!(matches!(err, RallypointError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: RallypointError = SessionError::NotHost.into();
        assert!(matches!(err, RallypointError::Session(_)));
    }

    #[test]
    fn test_from_connect_error() {
        let err: RallypointError = ConnectError::MissingJoinCode(LobbyId::from("l-1")).into();
        assert!(matches!(err, RallypointError::Connect(_)));
        assert!(err.to_string().contains("l-1"));
    }

    #[test]
    fn test_not_found_is_recognised_at_every_layer() {
        let service: RallypointError = ServiceError::NotFound("x".into()).into();
        let session: RallypointError = SessionError::NotFound("x".into()).into();
        let connect: RallypointError =
            ConnectError::Session(SessionError::NotFound("x".into())).into();
        assert!(service.is_not_found());
        assert!(session.is_not_found());
        assert!(connect.is_not_found());

        let other: RallypointError = SessionError::NotHost.into();
        assert!(!other.is_not_found());
    }
}
