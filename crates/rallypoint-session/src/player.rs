//! The signed-in local player.
//!
//! Rallypoint doesn't authenticate anyone itself. The identity provider
//! hands out a stable player id (anonymously, in this sample) and we wrap
//! it together with the player's own annotations: readiness, chosen
//! character, whatever the game needs. Those annotations ride along
//! whenever we create or join a lobby, so other members see them
//! without a separate update call.

use std::collections::BTreeMap;

use rallypoint_protocol::{
    CHARACTER_KEY, Character, Player, PlayerDataObject, PlayerId, READY_KEY, Visibility,
};
use rallypoint_services::IdentityService;

use crate::SessionError;

/// The signed-in identity plus its player-scoped annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    id: PlayerId,
    data: BTreeMap<String, PlayerDataObject>,
}

impl LocalPlayer {
    /// Wraps an already-known id. New players start "not ready",
    /// visible to lobby members.
    pub fn new(id: PlayerId) -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            READY_KEY.to_owned(),
            PlayerDataObject::new(Visibility::Member, "No"),
        );
        Self { id, data }
    }

    /// Signs in anonymously through `identity`.
    ///
    /// # Errors
    /// Whatever the identity provider reports, mapped into
    /// [`SessionError`].
    pub async fn sign_in<I: IdentityService>(identity: &I) -> Result<Self, SessionError> {
        let id = identity.sign_in_anonymously().await?;
        tracing::info!(player_id = %id, "player signed in");
        Ok(Self::new(id))
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn data(&self) -> &BTreeMap<String, PlayerDataObject> {
        &self.data
    }

    /// Returns the value stored under `key`, if any.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|d| d.value.as_str())
    }

    /// Sets (or replaces) one annotation locally.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>, visibility: Visibility) {
        self.data
            .insert(key.into(), PlayerDataObject::new(visibility, value));
    }

    /// The chosen character. Falls back to the default when unset or
    /// unrecognised.
    pub fn character(&self) -> Character {
        match self.data_value(CHARACTER_KEY) {
            None => Character::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::debug!(value, "unknown character, using default");
                Character::default()
            }),
        }
    }

    /// The lobby-facing representation sent with create/join calls.
    pub fn as_player(&self) -> Player {
        Player {
            id: self.id.clone(),
            allocation_id: None,
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rallypoint_services::memory::MemoryIdentityService;

    use super::*;

    #[test]
    fn test_new_player_is_not_ready() {
        let player = LocalPlayer::new(PlayerId::from("p"));
        assert_eq!(player.data_value(READY_KEY), Some("No"));
        assert_eq!(player.data()[READY_KEY].visibility, Visibility::Member);
    }

    #[test]
    fn test_character_defaults_and_parses() {
        let mut player = LocalPlayer::new(PlayerId::from("p"));
        assert_eq!(player.character(), Character::Catriona);

        player.set_data(CHARACTER_KEY, "ROBERT", Visibility::Public);
        assert_eq!(player.character(), Character::Robert);

        player.set_data(CHARACTER_KEY, "NOBODY", Visibility::Public);
        assert_eq!(player.character(), Character::Catriona);
    }

    #[test]
    fn test_as_player_carries_annotations() {
        let mut player = LocalPlayer::new(PlayerId::from("p"));
        player.set_data(READY_KEY, "Yes", Visibility::Member);
        let snapshot = player.as_player();
        assert_eq!(snapshot.id, PlayerId::from("p"));
        assert_eq!(snapshot.data_value(READY_KEY), Some("Yes"));
        assert!(snapshot.allocation_id.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_uses_identity_provider() {
        let identity = MemoryIdentityService::with_player_id("alice");
        let player = LocalPlayer::sign_in(&identity).await.unwrap();
        assert_eq!(player.id(), &PlayerId::from("alice"));
    }

    #[tokio::test]
    async fn test_sign_in_outage_is_service_unavailable() {
        let identity = MemoryIdentityService::new();
        identity.set_offline(true);
        let err = LocalPlayer::sign_in(&identity).await.unwrap_err();
        assert!(matches!(err, SessionError::ServiceUnavailable(_)));
    }
}
