//! Loopback relay service.

use std::collections::HashMap;

use rallypoint_protocol::{AllocationId, JoinCode};
use tokio::sync::Mutex;

use super::{Outage, random_code, random_hex};
use crate::{RelayService, ServiceError};

/// Join codes are this many characters long.
const JOIN_CODE_LEN: usize = 6;

#[derive(Debug, Default)]
struct Allocations {
    /// Host allocations and their capacity.
    hosts: HashMap<AllocationId, u32>,
    /// Clients attached to each host allocation.
    clients: HashMap<AllocationId, Vec<AllocationId>>,
    codes: HashMap<JoinCode, AllocationId>,
}

/// Relay provider that only hands out identifiers.
#[derive(Debug, Default)]
pub struct MemoryRelayService {
    allocations: Mutex<Allocations>,
    outage: Outage,
}

impl MemoryRelayService {
    /// Largest accepted `max_connections`.
    pub const MAX_CONNECTIONS: u32 = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.outage.set(offline);
    }

    /// Number of clients that joined through `join_code`.
    pub async fn client_count(&self, join_code: &JoinCode) -> usize {
        let allocations = self.allocations.lock().await;
        allocations
            .codes
            .get(join_code)
            .and_then(|host| allocations.clients.get(host))
            .map_or(0, Vec::len)
    }
}

impl RelayService for MemoryRelayService {
    async fn create_allocation(&self, max_connections: u32) -> Result<AllocationId, ServiceError> {
        self.outage.check("relay service")?;
        if max_connections == 0 || max_connections > Self::MAX_CONNECTIONS {
            return Err(ServiceError::Validation(format!(
                "max connections must be between 1 and {}",
                Self::MAX_CONNECTIONS
            )));
        }

        let allocation_id = AllocationId(random_hex(16));
        self.allocations
            .lock()
            .await
            .hosts
            .insert(allocation_id.clone(), max_connections);
        Ok(allocation_id)
    }

    async fn get_join_code(&self, allocation_id: &AllocationId) -> Result<JoinCode, ServiceError> {
        self.outage.check("relay service")?;

        let mut allocations = self.allocations.lock().await;
        if !allocations.hosts.contains_key(allocation_id) {
            return Err(ServiceError::NotFound(format!("allocation {allocation_id}")));
        }
        // One code per allocation; asking twice returns the same code.
        if let Some((code, _)) = allocations.codes.iter().find(|(_, a)| *a == allocation_id) {
            return Ok(code.clone());
        }
        let code = JoinCode(random_code(JOIN_CODE_LEN));
        allocations.codes.insert(code.clone(), allocation_id.clone());
        Ok(code)
    }

    async fn join_allocation(&self, join_code: &JoinCode) -> Result<AllocationId, ServiceError> {
        self.outage.check("relay service")?;

        let mut allocations = self.allocations.lock().await;
        let host = allocations
            .codes
            .get(join_code)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("join code {join_code}")))?;
        let capacity = allocations.hosts.get(&host).copied().unwrap_or(0);
        let clients = allocations.clients.entry(host).or_default();
        if clients.len() as u32 >= capacity {
            return Err(ServiceError::Conflict(format!("relay for {join_code} is full")));
        }
        let allocation_id = AllocationId(random_hex(16));
        clients.push(allocation_id.clone());
        Ok(allocation_id)
    }
}
