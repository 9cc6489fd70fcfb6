//! Loopback network session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rallypoint_protocol::{Character, RelayBinding};
use tokio::sync::broadcast;

use crate::{NetworkRole, NetworkSession, SceneLoaded, ServiceError};

/// Capacity of the scene-event channel. Slow observers lag rather than
/// block the session.
const SCENE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Default)]
struct NetState {
    role: NetworkRole,
    binding: Option<RelayBinding>,
    scene: Option<String>,
    visuals: Vec<(u64, Character)>,
}

/// A network session that never opens a socket.
///
/// Starting as host or client just records the role and binding.
/// Loading a scene completes immediately and is announced to scene
/// observers as loaded by the local client.
#[derive(Debug)]
pub struct LoopbackNetwork {
    client_id: u64,
    state: Mutex<NetState>,
    scenes: broadcast::Sender<SceneLoaded>,
    refuse_start: AtomicBool,
}

impl LoopbackNetwork {
    /// A session whose local client will be numbered `client_id`
    /// (hosts are conventionally 0).
    pub fn new(client_id: u64) -> Self {
        let (scenes, _) = broadcast::channel(SCENE_CHANNEL_CAPACITY);
        Self {
            client_id,
            state: Mutex::new(NetState::default()),
            scenes,
            refuse_start: AtomicBool::new(false),
        }
    }

    /// While set, `start_host` and `start_client` fail.
    pub fn set_refuse_start(&self, refuse: bool) {
        self.refuse_start.store(refuse, Ordering::SeqCst);
    }

    /// The relay binding the session was started with.
    pub fn binding(&self) -> Option<RelayBinding> {
        self.lock().binding.clone()
    }

    /// The most recently loaded scene.
    pub fn current_scene(&self) -> Option<String> {
        self.lock().scene.clone()
    }

    /// Every visuals request received so far.
    pub fn visuals_requests(&self) -> Vec<(u64, Character)> {
        self.lock().visuals.clone()
    }

    /// Announces that `client_id` finished loading `scene`, as the
    /// engine would after a scene switch.
    pub fn announce_scene(&self, client_id: u64, scene: &str) {
        // No subscribers is fine.
        let _ = self.scenes.send(SceneLoaded {
            client_id,
            scene: scene.to_owned(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, NetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self, role: NetworkRole, binding: &RelayBinding) -> Result<(), ServiceError> {
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(format!("unable to start {role}")));
        }
        let mut state = self.lock();
        if state.role != NetworkRole::Offline {
            return Err(ServiceError::Conflict(format!(
                "network session already running as {}",
                state.role
            )));
        }
        state.role = role;
        state.binding = Some(binding.clone());
        tracing::debug!(%role, allocation_id = %binding.allocation_id, "loopback network started");
        Ok(())
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NetworkSession for LoopbackNetwork {
    async fn start_host(&self, binding: &RelayBinding) -> Result<(), ServiceError> {
        self.start(NetworkRole::Host, binding)
    }

    async fn start_client(&self, binding: &RelayBinding) -> Result<(), ServiceError> {
        self.start(NetworkRole::Client, binding)
    }

    async fn shutdown(&self) {
        let mut state = self.lock();
        state.role = NetworkRole::Offline;
        state.binding = None;
        state.scene = None;
    }

    fn role(&self) -> NetworkRole {
        self.lock().role
    }

    fn local_client_id(&self) -> Option<u64> {
        (self.lock().role != NetworkRole::Offline).then_some(self.client_id)
    }

    async fn load_scene(&self, scene: &str) -> Result<(), ServiceError> {
        {
            let mut state = self.lock();
            if state.role != NetworkRole::Host {
                return Err(ServiceError::Forbidden("only the host can switch scenes".into()));
            }
            state.scene = Some(scene.to_owned());
        }
        self.announce_scene(self.client_id, scene);
        Ok(())
    }

    fn subscribe_scenes(&self) -> broadcast::Receiver<SceneLoaded> {
        self.scenes.subscribe()
    }

    async fn set_player_visuals(&self, client_id: u64, character: Character) -> Result<(), ServiceError> {
        let mut state = self.lock();
        if state.role == NetworkRole::Offline {
            return Err(ServiceError::Unavailable("network session is not running".into()));
        }
        state.visuals.push((client_id, character));
        Ok(())
    }
}
