//! Scene-load observer: shows the local player's chosen character once a
//! game scene has loaded.
//!
//! One observer per session. The flow spawns it when the network session
//! starts and drops it when the session ends; dropping aborts the task,
//! so no subscription outlives the session that registered it.

use std::sync::Arc;

use rallypoint_protocol::Character;
use rallypoint_services::{NetworkSession, SceneLoaded};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Handle to a running scene observer task.
#[derive(Debug)]
pub struct SceneObserver {
    task: JoinHandle<()>,
}

impl SceneObserver {
    /// Subscribes to `network`'s scene loads and starts observing.
    ///
    /// Loads of `lobby_scene` and loads by other clients are ignored.
    /// For every other scene the local client finishes loading, the
    /// current value of `character` is requested as its visuals.
    pub fn spawn<N: NetworkSession>(
        network: Arc<N>,
        lobby_scene: impl Into<String>,
        character: watch::Receiver<Character>,
    ) -> Self {
        // Subscribe before spawning so no load announced after this call
        // is missed.
        let scenes = network.subscribe_scenes();
        let task = tokio::spawn(observe(network, scenes, lobby_scene.into(), character));
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SceneObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn observe<N: NetworkSession>(
    network: Arc<N>,
    mut scenes: broadcast::Receiver<SceneLoaded>,
    lobby_scene: String,
    character: watch::Receiver<Character>,
) {
    loop {
        let loaded = match scenes.recv().await {
            Ok(loaded) => loaded,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "scene observer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if loaded.scene == lobby_scene {
            continue;
        }
        let Some(local) = network.local_client_id() else {
            continue;
        };
        if loaded.client_id != local {
            tracing::trace!(client_id = loaded.client_id, scene = %loaded.scene, "remote scene load");
            continue;
        }

        let chosen = *character.borrow();
        match network.set_player_visuals(local, chosen).await {
            Ok(()) => {
                tracing::info!(client_id = local, scene = %loaded.scene, %chosen, "player visuals set");
            }
            Err(e) => {
                tracing::warn!(client_id = local, error = %e, "setting player visuals failed");
            }
        }
    }
    tracing::debug!("scene observer stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rallypoint_protocol::{AllocationId, JoinCode, RelayBinding};
    use rallypoint_services::memory::LoopbackNetwork;

    use super::*;

    async fn running_host() -> Arc<LoopbackNetwork> {
        let network = Arc::new(LoopbackNetwork::new(0));
        network
            .start_host(&RelayBinding {
                join_code: JoinCode::from("ABC123"),
                allocation_id: AllocationId::from("alloc"),
            })
            .await
            .unwrap();
        network
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_scene_requests_chosen_character() {
        let network = running_host().await;
        let (_tx, rx) = watch::channel(Character::Robert);
        let _observer = SceneObserver::spawn(Arc::clone(&network), "Lobby", rx);

        network.load_scene("Game").await.unwrap();
        settle().await;
        assert_eq!(network.visuals_requests(), vec![(0, Character::Robert)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lobby_scene_and_remote_loads_are_ignored() {
        let network = running_host().await;
        let (_tx, rx) = watch::channel(Character::default());
        let _observer = SceneObserver::spawn(Arc::clone(&network), "Lobby", rx);

        network.announce_scene(0, "Lobby");
        network.announce_scene(7, "Game");
        settle().await;
        assert!(network.visuals_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_character_change_is_picked_up() {
        let network = running_host().await;
        let (tx, rx) = watch::channel(Character::Catriona);
        let _observer = SceneObserver::spawn(Arc::clone(&network), "Lobby", rx);

        tx.send_replace(Character::Robert);
        network.load_scene("Game").await.unwrap();
        settle().await;
        assert_eq!(network.visuals_requests(), vec![(0, Character::Robert)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_observer_stops_listening() {
        let network = running_host().await;
        let (_tx, rx) = watch::channel(Character::default());
        let observer = SceneObserver::spawn(Arc::clone(&network), "Lobby", rx);

        drop(observer);
        settle().await;
        network.load_scene("Game").await.unwrap();
        settle().await;
        assert!(network.visuals_requests().is_empty());
    }
}
