//! Connect layer for Rallypoint: from "I pressed a button" to a running
//! network session.
//!
//! # Key types
//!
//! - [`LobbyFlow`]: host/join/leave/close/start flows with compensating
//!   cleanup
//! - [`RelayBinder`]: relay allocations and join codes
//! - [`UiProjector`]: publishes [`UiState`] and [`ScreenLayout`] for a
//!   renderer
//! - [`SceneObserver`]: applies character visuals after scene loads
//! - [`FlowConfig`]: scene names and relay sizing

mod config;
mod error;
mod flow;
mod relay;
mod scene;
mod ui;

pub use config::FlowConfig;
pub use error::ConnectError;
pub use flow::LobbyFlow;
pub use relay::RelayBinder;
pub use scene::SceneObserver;
pub use ui::{ScreenLayout, UiProjector, UiSnapshot, UiState};
