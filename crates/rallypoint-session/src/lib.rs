//! Lobby session coordination for Rallypoint.
//!
//! This crate owns the single authoritative local view of "the lobby I'm
//! in" and performs every state-changing call against the lobby service:
//!
//! 1. **Identity**: signing in and carrying the local player's
//!    annotations ([`LocalPlayer`])
//! 2. **Coordination**: create/search/join/leave/close and shared-data
//!    updates ([`SessionCoordinator`])
//! 3. **Liveness**: a recurring heartbeat while hosting
//!    (via `rallypoint-heartbeat`)
//!
//! # How it fits in the stack
//!
//! ```text
//! Connect Layer (above)  ← relay binding, network start, UI projection
//!     ↕
//! Session Layer (this crate)  ← one lobby at a time, state machine
//!     ↕
//! Services (below)  ← LobbyService, IdentityService
//! ```

mod coordinator;
mod error;
mod player;
mod state;

pub use coordinator::{LobbySettings, SessionCoordinator};
pub use error::SessionError;
pub use player::LocalPlayer;
pub use state::{CoordinatorConfig, CoordinatorEvent, CoordinatorState};
