//! Loopback identity service.

use rallypoint_protocol::PlayerId;

use super::{Outage, random_hex};
use crate::{IdentityService, ServiceError};

/// Signs players in without talking to anyone.
///
/// By default every sign-in mints a fresh random id, like anonymous
/// sign-in on a new device. [`with_player_id`](Self::with_player_id)
/// pins the id, which keeps tests readable.
#[derive(Debug, Default)]
pub struct MemoryIdentityService {
    fixed: Option<PlayerId>,
    outage: Outage,
}

impl MemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always signs in as `player_id`.
    pub fn with_player_id(player_id: impl Into<PlayerId>) -> Self {
        Self {
            fixed: Some(player_id.into()),
            outage: Outage::default(),
        }
    }

    /// While offline, sign-in fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.outage.set(offline);
    }
}

impl IdentityService for MemoryIdentityService {
    async fn sign_in_anonymously(&self) -> Result<PlayerId, ServiceError> {
        self.outage.check("identity service")?;
        Ok(self
            .fixed
            .clone()
            .unwrap_or_else(|| PlayerId(format!("player-{}", random_hex(6)))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_random_ids_differ() {
        let identity = MemoryIdentityService::new();
        let a = identity.sign_in_anonymously().await.unwrap();
        let b = identity.sign_in_anonymously().await.unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("player-"));
    }

    #[tokio::test]
    async fn test_fixed_id_is_stable() {
        let identity = MemoryIdentityService::with_player_id("alice");
        assert_eq!(
            identity.sign_in_anonymously().await.unwrap(),
            PlayerId::from("alice")
        );
    }
}
