use std::time::Duration;

/// Errors reported by an external service.
///
/// Providers report failures in their own vocabulary (HTTP statuses,
/// SDK exceptions). Implementations of the service traits translate
/// them into these kinds so the coordinator can react uniformly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request was malformed: empty name, bad capacity, ...
    #[error("validation failed: {0}")]
    Validation(String),

    /// The lobby, player, or join code doesn't exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient failure: network error, provider outage.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Too many requests (HTTP 429). Retry after the given delay.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The write was based on a stale snapshot, or the lobby is full.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller isn't allowed to do this (e.g. a non-host deleting).
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl ServiceError {
    /// Whether retrying the same call later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(ServiceError::Unavailable("x".into()).is_transient());
        assert!(
            ServiceError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(!ServiceError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ServiceError::Conflict("lobby is full".into());
        assert_eq!(err.to_string(), "conflict: lobby is full");
    }
}
