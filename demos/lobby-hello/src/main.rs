//! Lobby hello world: a host and a guest meet through the in-memory lobby
//! and relay services, pick characters, start a game, and clean up.
//!
//! Run with `RUST_LOG=debug` to see every lobby call.

use std::time::Duration;

use rallypoint::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn show(who: &str, flow: &LocalFlow) {
    let ui = flow.ui().current();
    let lobby = flow
        .coordinator()
        .current_session()
        .map(|l| format!("{} ({}/{})", l.name, l.players.len(), l.max_players))
        .unwrap_or_else(|| "-".into());
    println!(
        "{who:>6}: screen={:?} lobby={lobby} network={} message={}",
        ui.state,
        flow.network().role(),
        ui.message.as_deref().unwrap_or("-"),
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), RallypointError> {
    init_tracing(DEFAULT_FILTER);

    let services = LocalServices::new();
    let mut host = services.connect(RallypointClient::builder(), "host", 0).await?;
    let mut guest = services.connect(RallypointClient::builder(), "guest", 1).await?;

    // Nobody is hosting yet.
    guest.join_random_lobby().await?;
    show("guest", &guest);

    host.set_character(Character::Robert).await?;
    let binding = host
        .host_lobby(LobbySettings::new("LobbyHelloWorld", 8))
        .await?;
    tracing::info!(join_code = %binding.join_code, "host is up");
    show("host", &host);

    let lobbies = guest.browse().await?;
    println!(" guest: browsing {} lobby(ies)", lobbies.len());

    guest.join_random_lobby().await?;
    guest.set_character(Character::Catriona).await?;
    show("guest", &guest);

    host.coordinator_mut().refresh().await?;
    show("host", &host);

    host.start_game().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "  host: scene={} visuals={:?}",
        host.network().current_scene().unwrap_or_default(),
        host.network().visuals_requests()
    );

    guest.leave_lobby().await?;
    host.close_lobby().await?;
    show("guest", &guest);
    show("host", &host);

    Ok(())
}
