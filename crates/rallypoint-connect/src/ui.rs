//! UI state projection.
//!
//! The presentation layer is somebody else's problem. What this module
//! owns is the mapping from "where are we in the lobby lifecycle" to
//! "which panels and buttons are visible", published through a
//! `watch` channel so a renderer can just draw the latest value.
//!
//! ```text
//!             ┌────────────┐
//!   ┌────────→│    Menu    │←─────────────────┐
//!   │         └─────┬──────┘                  │
//!   │   host / join │        browse           │ failure, leave, close
//!   │               ▼                         │
//!   │         ┌────────────┐   ┌──────────┐   │
//!   │         │  Loading   │   │ Browsing │   │
//!   │         └─────┬──────┘   └──────────┘   │
//!   │               ▼                         │
//!   │   HostingLobby / JoinedLobby ───────────┘
//! ```
//!
//! `Loading` is only ever shown while a flow is running. Every flow ends
//! by publishing a settled state, success or not.

use rallypoint_protocol::Lobby;
use rallypoint_session::CoordinatorState;
use tokio::sync::watch;

/// The screens the lobby UI can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UiState {
    #[default]
    Menu,
    Browsing,
    HostingLobby,
    JoinedLobby,
    Loading,
}

impl UiState {
    /// The screen matching a coordinator state. `Browsing` has no
    /// coordinator counterpart; flows set it explicitly.
    pub fn for_coordinator(state: CoordinatorState) -> Self {
        match state {
            CoordinatorState::NoSession => Self::Menu,
            CoordinatorState::Hosting => Self::HostingLobby,
            CoordinatorState::Joined => Self::JoinedLobby,
            CoordinatorState::Creating
            | CoordinatorState::Searching
            | CoordinatorState::Joining
            | CoordinatorState::Closing
            | CoordinatorState::Leaving => Self::Loading,
        }
    }

    /// Which elements are visible on this screen.
    pub fn layout(self) -> ScreenLayout {
        let hidden = ScreenLayout::default();
        match self {
            Self::Menu => ScreenLayout {
                menu: true,
                ..hidden
            },
            Self::Browsing => ScreenLayout {
                browser: true,
                ..hidden
            },
            Self::HostingLobby => ScreenLayout {
                lobby_menu: true,
                close_button: true,
                start_button: true,
                ..hidden
            },
            Self::JoinedLobby => ScreenLayout {
                lobby_menu: true,
                leave_button: true,
                ..hidden
            },
            Self::Loading => ScreenLayout {
                loading_screen: true,
                ..hidden
            },
        }
    }
}

/// Visibility of every panel and button. Exactly one panel is visible at
/// a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenLayout {
    pub menu: bool,
    pub lobby_menu: bool,
    pub browser: bool,
    pub loading_screen: bool,
    pub close_button: bool,
    pub leave_button: bool,
    pub start_button: bool,
}

/// What a renderer needs to draw one frame of the lobby UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiSnapshot {
    pub state: UiState,
    /// One-line status for the user ("no lobby found", ...).
    pub message: Option<String>,
    /// Search results, filled while browsing.
    pub lobbies: Vec<Lobby>,
}

impl UiSnapshot {
    pub fn layout(&self) -> ScreenLayout {
        self.state.layout()
    }
}

/// Publishes [`UiSnapshot`]s to any number of renderers.
#[derive(Debug)]
pub struct UiProjector {
    tx: watch::Sender<UiSnapshot>,
}

impl UiProjector {
    /// Starts on the menu.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(UiSnapshot::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> UiSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> UiState {
        self.tx.borrow().state
    }

    /// Switches screens and clears any message.
    pub fn show(&self, state: UiState) {
        self.publish(UiSnapshot {
            state,
            ..UiSnapshot::default()
        });
    }

    /// Switches screens with a status message.
    pub fn show_message(&self, state: UiState, message: impl Into<String>) {
        self.publish(UiSnapshot {
            state,
            message: Some(message.into()),
            lobbies: Vec::new(),
        });
    }

    /// Shows the lobby browser with `lobbies`.
    pub fn show_browser(&self, lobbies: Vec<Lobby>) {
        let message = lobbies.is_empty().then(|| "no lobby found".to_owned());
        self.publish(UiSnapshot {
            state: UiState::Browsing,
            message,
            lobbies,
        });
    }

    fn publish(&self, snapshot: UiSnapshot) {
        tracing::debug!(state = ?snapshot.state, message = ?snapshot.message, "ui updated");
        // Works without receivers.
        self.tx.send_replace(snapshot);
    }
}

impl Default for UiProjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panels(layout: ScreenLayout) -> usize {
        [
            layout.menu,
            layout.lobby_menu,
            layout.browser,
            layout.loading_screen,
        ]
        .into_iter()
        .filter(|v| *v)
        .count()
    }

    #[test]
    fn test_every_state_shows_exactly_one_panel() {
        for state in [
            UiState::Menu,
            UiState::Browsing,
            UiState::HostingLobby,
            UiState::JoinedLobby,
            UiState::Loading,
        ] {
            assert_eq!(panels(state.layout()), 1, "{state:?}");
        }
    }

    #[test]
    fn test_host_and_member_buttons() {
        let host = UiState::HostingLobby.layout();
        assert!(host.close_button && host.start_button && !host.leave_button);

        let member = UiState::JoinedLobby.layout();
        assert!(member.leave_button && !member.close_button && !member.start_button);

        let loading = UiState::Loading.layout();
        assert!(!loading.close_button && !loading.leave_button && !loading.start_button);
    }

    #[test]
    fn test_coordinator_states_map_to_screens() {
        assert_eq!(UiState::for_coordinator(CoordinatorState::NoSession), UiState::Menu);
        assert_eq!(UiState::for_coordinator(CoordinatorState::Hosting), UiState::HostingLobby);
        assert_eq!(UiState::for_coordinator(CoordinatorState::Joined), UiState::JoinedLobby);
        assert_eq!(UiState::for_coordinator(CoordinatorState::Joining), UiState::Loading);
    }

    #[test]
    fn test_projector_publishes_to_subscribers() {
        let ui = UiProjector::new();
        let rx = ui.subscribe();
        assert_eq!(rx.borrow().state, UiState::Menu);

        ui.show_message(UiState::Menu, "no lobby found");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().message.as_deref(), Some("no lobby found"));

        ui.show(UiState::Loading);
        assert_eq!(ui.current().message, None);
    }

    #[test]
    fn test_empty_browser_carries_message() {
        let ui = UiProjector::new();
        ui.show_browser(Vec::new());
        assert_eq!(ui.state(), UiState::Browsing);
        assert_eq!(ui.current().message.as_deref(), Some("no lobby found"));
    }
}
