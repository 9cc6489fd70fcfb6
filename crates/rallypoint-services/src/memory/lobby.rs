//! Loopback lobby service.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rallypoint_protocol::{
    CreateLobbyRequest, DataIndex, FilterOp, Lobby, LobbyId, Player, PlayerId,
    QueryField, QueryFilter, QueryOrder, QuerySpec, UpdateLobbyRequest,
    UpdatePlayerRequest,
};
use tokio::sync::Mutex;

use super::{Outage, random_hex};
use crate::{LobbyService, ServiceError};

#[derive(Debug)]
struct Entry {
    lobby: Lobby,
    heartbeats: u64,
}

/// Lobby provider that keeps everything in a `HashMap`.
///
/// Shared between several coordinators through an `Arc`, it plays the
/// role of the hosted service for a whole test or demo.
#[derive(Debug, Default)]
pub struct MemoryLobbyService {
    lobbies: Mutex<HashMap<LobbyId, Entry>>,
    /// Source of `created_at` stamps.
    clock: AtomicU64,
    requests: AtomicU64,
    outage: Outage,
    refuse_removals: AtomicBool,
}

impl MemoryLobbyService {
    /// Longest accepted lobby name, in characters.
    pub const MAX_NAME_LEN: usize = 64;

    /// Largest accepted `max_players`.
    pub const MAX_PLAYERS: u32 = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.outage.set(offline);
    }

    /// While set, `delete_lobby` and `remove_player` fail with
    /// `Unavailable` while every other call keeps working.
    pub fn set_refuse_removals(&self, refuse: bool) {
        self.refuse_removals.store(refuse, Ordering::SeqCst);
    }

    /// Number of calls received so far, failed ones included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Heartbeats received for a lobby (0 if it doesn't exist).
    pub async fn heartbeat_count(&self, lobby_id: &LobbyId) -> u64 {
        self.lobbies
            .lock()
            .await
            .get(lobby_id)
            .map_or(0, |e| e.heartbeats)
    }

    /// Number of lobbies currently stored.
    pub async fn lobby_count(&self) -> usize {
        self.lobbies.lock().await.len()
    }

    /// Ids of every lobby the service holds, private ones included.
    pub async fn lobby_ids(&self) -> Vec<LobbyId> {
        self.lobbies.lock().await.keys().cloned().collect()
    }

    /// Reads a lobby without counting as a request.
    pub async fn peek(&self, lobby_id: &LobbyId) -> Option<Lobby> {
        self.lobbies
            .lock()
            .await
            .get(lobby_id)
            .map(|e| e.lobby.clone())
    }

    fn begin(&self) -> Result<(), ServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.outage.check("lobby service")
    }

    fn begin_removal(&self) -> Result<(), ServiceError> {
        self.begin()?;
        if self.refuse_removals.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("lobby service refused the removal".into()));
        }
        Ok(())
    }
}

fn not_found(lobby_id: &LobbyId) -> ServiceError {
    ServiceError::NotFound(format!("lobby {lobby_id}"))
}

impl LobbyService for MemoryLobbyService {
    async fn create_lobby(&self, request: CreateLobbyRequest) -> Result<Lobby, ServiceError> {
        self.begin()?;

        if request.name.trim().is_empty() {
            return Err(ServiceError::Validation("lobby name must not be empty".into()));
        }
        if request.name.chars().count() > Self::MAX_NAME_LEN {
            return Err(ServiceError::Validation(format!(
                "lobby name is longer than {} characters",
                Self::MAX_NAME_LEN
            )));
        }
        if request.max_players == 0 || request.max_players > Self::MAX_PLAYERS {
            return Err(ServiceError::Validation(format!(
                "max players must be between 1 and {}",
                Self::MAX_PLAYERS
            )));
        }

        let lobby = Lobby {
            id: LobbyId(random_hex(8)),
            name: request.name,
            host_id: request.player.id.clone(),
            max_players: request.max_players,
            is_private: request.is_private,
            data: request.data,
            players: vec![request.player],
            created_at: self.clock.fetch_add(1, Ordering::SeqCst) + 1,
            revision: 0,
        };

        self.lobbies.lock().await.insert(
            lobby.id.clone(),
            Entry {
                lobby: lobby.clone(),
                heartbeats: 0,
            },
        );
        tracing::debug!(lobby_id = %lobby.id, "loopback lobby created");
        Ok(lobby)
    }

    async fn query_lobbies(&self, query: &QuerySpec) -> Result<Vec<Lobby>, ServiceError> {
        self.begin()?;

        let lobbies = self.lobbies.lock().await;
        let mut found = Vec::new();
        for entry in lobbies.values() {
            if entry.lobby.is_private {
                continue;
            }
            if matches_all(&entry.lobby, &query.filters)? {
                found.push(entry.lobby.clone());
            }
        }

        found.sort_by(|a, b| compare_by(a, b, &query.order));
        found.truncate(query.count());
        Ok(found)
    }

    async fn quick_join(
        &self,
        filters: &[QueryFilter],
        player: &Player,
    ) -> Result<Lobby, ServiceError> {
        self.begin()?;

        let mut lobbies = self.lobbies.lock().await;
        let mut candidates = Vec::new();
        for entry in lobbies.values() {
            let lobby = &entry.lobby;
            if lobby.is_private || lobby.available_slots() == 0 || lobby.contains(&player.id) {
                continue;
            }
            if matches_all(lobby, filters)? {
                candidates.push(lobby);
            }
        }

        // Fill the fullest lobby first, oldest on ties.
        candidates.sort_by(|a, b| {
            compare_by(a, b, &[QueryOrder::asc(QueryField::AvailableSlots)])
        });
        let lobby_id = candidates
            .first()
            .map(|l| l.id.clone())
            .ok_or_else(|| ServiceError::NotFound("no lobby matches the quick join filters".into()))?;

        let entry = lobbies.get_mut(&lobby_id).ok_or_else(|| not_found(&lobby_id))?;
        entry.lobby.players.push(player.clone());
        Ok(entry.lobby.clone())
    }

    async fn join_by_id(&self, lobby_id: &LobbyId, player: &Player) -> Result<Lobby, ServiceError> {
        self.begin()?;

        let mut lobbies = self.lobbies.lock().await;
        let entry = lobbies.get_mut(lobby_id).ok_or_else(|| not_found(lobby_id))?;
        if entry.lobby.contains(&player.id) {
            return Err(ServiceError::Conflict(format!(
                "player {} is already a member of lobby {lobby_id}",
                player.id
            )));
        }
        if entry.lobby.available_slots() == 0 {
            return Err(ServiceError::Conflict(format!("lobby {lobby_id} is full")));
        }
        entry.lobby.players.push(player.clone());
        Ok(entry.lobby.clone())
    }

    async fn get_lobby(&self, lobby_id: &LobbyId) -> Result<Lobby, ServiceError> {
        self.begin()?;

        self.lobbies
            .lock()
            .await
            .get(lobby_id)
            .map(|e| e.lobby.clone())
            .ok_or_else(|| not_found(lobby_id))
    }

    async fn update_lobby(
        &self,
        lobby_id: &LobbyId,
        request: UpdateLobbyRequest,
    ) -> Result<Lobby, ServiceError> {
        self.begin()?;

        let mut lobbies = self.lobbies.lock().await;
        let entry = lobbies.get_mut(lobby_id).ok_or_else(|| not_found(lobby_id))?;
        if let Some(expected) = request.expected_revision {
            if expected != entry.lobby.revision {
                return Err(ServiceError::Conflict(format!(
                    "lobby {lobby_id} is at revision {}, write was based on {expected}",
                    entry.lobby.revision
                )));
            }
        }
        entry.lobby.data = request.data;
        entry.lobby.revision += 1;
        Ok(entry.lobby.clone())
    }

    async fn update_player(
        &self,
        lobby_id: &LobbyId,
        player_id: &PlayerId,
        request: UpdatePlayerRequest,
    ) -> Result<Lobby, ServiceError> {
        self.begin()?;

        let mut lobbies = self.lobbies.lock().await;
        let entry = lobbies.get_mut(lobby_id).ok_or_else(|| not_found(lobby_id))?;
        let player = entry
            .lobby
            .players
            .iter_mut()
            .find(|p| p.id == *player_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("player {player_id} in lobby {lobby_id}"))
            })?;
        if let Some(allocation_id) = request.allocation_id {
            player.allocation_id = Some(allocation_id);
        }
        if let Some(data) = request.data {
            player.data = data;
        }
        Ok(entry.lobby.clone())
    }

    async fn remove_player(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> Result<(), ServiceError> {
        self.begin_removal()?;

        let mut lobbies = self.lobbies.lock().await;
        let entry = lobbies.get_mut(lobby_id).ok_or_else(|| not_found(lobby_id))?;
        let position = entry
            .lobby
            .players
            .iter()
            .position(|p| p.id == *player_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("player {player_id} in lobby {lobby_id}"))
            })?;
        entry.lobby.players.remove(position);

        if entry.lobby.players.is_empty() {
            lobbies.remove(lobby_id);
        } else if entry.lobby.host_id == *player_id {
            // Host migrates to the longest-standing member.
            entry.lobby.host_id = entry.lobby.players[0].id.clone();
        }
        Ok(())
    }

    async fn delete_lobby(&self, lobby_id: &LobbyId) -> Result<(), ServiceError> {
        self.begin_removal()?;

        self.lobbies
            .lock()
            .await
            .remove(lobby_id)
            .map(|_| ())
            .ok_or_else(|| not_found(lobby_id))
    }

    async fn send_heartbeat(&self, lobby_id: &LobbyId) -> Result<(), ServiceError> {
        self.begin()?;

        let mut lobbies = self.lobbies.lock().await;
        let entry = lobbies.get_mut(lobby_id).ok_or_else(|| not_found(lobby_id))?;
        entry.heartbeats += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------------

fn matches_all(lobby: &Lobby, filters: &[QueryFilter]) -> Result<bool, ServiceError> {
    for filter in filters {
        if !matches(lobby, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches(lobby: &Lobby, filter: &QueryFilter) -> Result<bool, ServiceError> {
    match filter.field {
        QueryField::AvailableSlots => compare_number(f64::from(lobby.available_slots()), filter),
        QueryField::MaxPlayers => compare_number(f64::from(lobby.max_players), filter),
        QueryField::Created => compare_number(lobby.created_at as f64, filter),
        QueryField::Name => Ok(compare_text(&lobby.name, filter)),
        QueryField::Custom(index) => match indexed_value(lobby, index) {
            None => Ok(false),
            Some(value) if index.is_numeric() => match value.parse::<f64>() {
                Ok(number) => compare_number(number, filter),
                Err(_) => Ok(false),
            },
            Some(value) => Ok(compare_text(value, filter)),
        },
    }
}

fn compare_number(actual: f64, filter: &QueryFilter) -> Result<bool, ServiceError> {
    let expected: f64 = filter.value.parse().map_err(|_| {
        ServiceError::Validation(format!(
            "filter on {} expects a number, got {:?}",
            filter.field, filter.value
        ))
    })?;
    Ok(match filter.op {
        FilterOp::Eq => actual == expected,
        FilterOp::Ne => actual != expected,
        FilterOp::Lt => actual < expected,
        FilterOp::Le => actual <= expected,
        FilterOp::Gt => actual > expected,
        FilterOp::Ge => actual >= expected,
        FilterOp::Contains => {
            return Err(ServiceError::Validation(format!(
                "contains is not supported on numeric field {}",
                filter.field
            )));
        }
    })
}

fn compare_text(actual: &str, filter: &QueryFilter) -> bool {
    let expected = filter.value.as_str();
    match filter.op {
        FilterOp::Eq => actual == expected,
        FilterOp::Ne => actual != expected,
        FilterOp::Lt => actual < expected,
        FilterOp::Le => actual <= expected,
        FilterOp::Gt => actual > expected,
        FilterOp::Ge => actual >= expected,
        FilterOp::Contains => actual.contains(expected),
    }
}

fn indexed_value(lobby: &Lobby, index: DataIndex) -> Option<&str> {
    lobby
        .data
        .values()
        .find(|d| d.index == Some(index))
        .map(|d| d.value.as_str())
}

/// Applies the sort keys in sequence, then falls back to creation order
/// so that results are deterministic.
fn compare_by(a: &Lobby, b: &Lobby, order: &[QueryOrder]) -> CmpOrdering {
    for key in order {
        let ordering = compare_field(a, b, key.field);
        let ordering = if key.ascending { ordering } else { ordering.reverse() };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    a.created_at.cmp(&b.created_at)
}

fn compare_field(a: &Lobby, b: &Lobby, field: QueryField) -> CmpOrdering {
    match field {
        QueryField::AvailableSlots => a.available_slots().cmp(&b.available_slots()),
        QueryField::MaxPlayers => a.max_players.cmp(&b.max_players),
        QueryField::Created => a.created_at.cmp(&b.created_at),
        QueryField::Name => a.name.cmp(&b.name),
        QueryField::Custom(index) => {
            match (indexed_value(a, index), indexed_value(b, index)) {
                (Some(x), Some(y)) if index.is_numeric() => {
                    match (x.parse::<f64>(), y.parse::<f64>()) {
                        (Ok(xn), Ok(yn)) => xn.partial_cmp(&yn).unwrap_or(CmpOrdering::Equal),
                        _ => x.cmp(y),
                    }
                }
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => CmpOrdering::Less,
                (None, Some(_)) => CmpOrdering::Greater,
                (None, None) => CmpOrdering::Equal,
            }
        }
    }
}
