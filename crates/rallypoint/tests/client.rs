//! End-to-end tests through the facade: clients built with the builder,
//! sharing one set of in-memory services.

use std::time::Duration;

use rallypoint::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

async fn client(services: &LocalServices, player: &str, client_id: u64) -> LocalFlow {
    services
        .connect(RallypointClient::builder(), player, client_id)
        .await
        .unwrap()
}

// =========================================================================
// Full session lifecycle
// =========================================================================

#[tokio::test]
async fn test_host_and_guest_meet_through_relay() {
    let services = LocalServices::new();
    let mut host = client(&services, "host", 0).await;
    let mut guest = client(&services, "guest", 1).await;

    let binding = host
        .host_lobby(LobbySettings::new("Test", 4))
        .await
        .unwrap();
    assert!(guest.join_random_lobby().await.unwrap());

    host.coordinator_mut().refresh().await.unwrap();
    let lobby = host.coordinator().current_session().unwrap();
    assert_eq!(lobby.players.len(), 2);
    assert_eq!(lobby.available_slots(), 2);

    let guest_binding = guest.network().binding().unwrap();
    assert_eq!(guest_binding.join_code, binding.join_code);
    assert_eq!(host.network().role(), NetworkRole::Host);
    assert_eq!(guest.network().role(), NetworkRole::Client);
}

#[tokio::test]
async fn test_lobby_closes_cleanly_after_guest_leaves() {
    let services = LocalServices::new();
    let mut host = client(&services, "host", 0).await;
    let mut guest = client(&services, "guest", 1).await;

    host.host_lobby(LobbySettings::new("Test", 4)).await.unwrap();
    assert!(guest.join_random_lobby().await.unwrap());

    guest.leave_lobby().await.unwrap();
    host.close_lobby().await.unwrap();

    assert_eq!(services.lobby.lobby_count().await, 0);
    assert_eq!(host.ui().state(), UiState::Menu);
    assert_eq!(guest.ui().state(), UiState::Menu);
}

#[tokio::test]
async fn test_version_mismatch_keeps_players_apart() {
    let services = LocalServices::new();
    let mut host = services
        .connect(RallypointClient::builder().game_version("0.2"), "host", 0)
        .await
        .unwrap();
    let mut guest = client(&services, "guest", 1).await;

    host.host_lobby(LobbySettings::new("Test", 4)).await.unwrap();
    assert!(!guest.join_random_lobby().await.unwrap());
}

#[tokio::test]
async fn test_full_lobby_is_not_offered() {
    let services = LocalServices::new();
    let mut host = client(&services, "host", 0).await;
    let mut first = client(&services, "first", 1).await;
    let mut second = client(&services, "second", 2).await;

    host.host_lobby(LobbySettings::new("Duo", 2)).await.unwrap();
    assert!(first.join_random_lobby().await.unwrap());
    assert!(!second.join_random_lobby().await.unwrap());
}

#[tokio::test]
async fn test_errors_convert_into_facade_error() {
    async fn join_missing(flow: &mut LocalFlow) -> Result<RelayBinding, RallypointError> {
        Ok(flow.join_lobby_by_id(&LobbyId::from("missing")).await?)
    }

    let services = LocalServices::new();
    let mut guest = client(&services, "guest", 1).await;
    let err = join_missing(&mut guest).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_hosted_lobby_stays_alive() {
    let services = LocalServices::new();
    let mut host = client(&services, "host", 0).await;
    host.host_lobby(LobbySettings::new("Test", 4)).await.unwrap();
    let id = host.coordinator().current_session().unwrap().id.clone();

    tokio::time::sleep(Duration::from_secs(46)).await;
    // One nudged beat after the join-code write, then the regular cadence.
    assert!(services.lobby.heartbeat_count(&id).await >= 3);

    host.close_lobby().await.unwrap();
    assert!(!host.coordinator().heartbeat_running());
}

#[tokio::test]
async fn test_ui_subscribers_see_final_state() {
    let services = LocalServices::new();
    let mut host = client(&services, "host", 0).await;
    let mut ui = host.ui().subscribe();

    host.host_lobby(LobbySettings::new("Test", 4)).await.unwrap();
    assert!(ui.has_changed().unwrap());
    let snapshot = ui.borrow_and_update().clone();
    assert_eq!(snapshot.state, UiState::HostingLobby);
    assert!(snapshot.layout().close_button);
}
