//! Relay binder: turns relay allocations into something peers can use.
//!
//! Hosts reserve an allocation and get a short join code for it. The
//! code is what goes into the lobby's shared data. Clients read the code
//! from the lobby and resolve it into their own allocation. Either way
//! the result is a [`RelayBinding`] the network layer can start from.

use std::sync::Arc;

use rallypoint_protocol::{JoinCode, RelayBinding};
use rallypoint_services::RelayService;

use crate::ConnectError;

pub struct RelayBinder<R: RelayService> {
    relay: Arc<R>,
}

impl<R: RelayService> RelayBinder<R> {
    pub fn new(relay: Arc<R>) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> &Arc<R> {
        &self.relay
    }

    /// Host path: reserve an allocation for `max_connections` peers and
    /// fetch its join code.
    pub async fn bind_host(&self, max_connections: u32) -> Result<RelayBinding, ConnectError> {
        let allocation_id = self
            .relay
            .create_allocation(max_connections)
            .await
            .map_err(ConnectError::Relay)?;
        let join_code = self
            .relay
            .get_join_code(&allocation_id)
            .await
            .map_err(ConnectError::Relay)?;

        tracing::info!(%join_code, %allocation_id, max_connections, "relay allocated");
        Ok(RelayBinding {
            join_code,
            allocation_id,
        })
    }

    /// Client path: resolve a host's join code into our own allocation.
    pub async fn bind_client(&self, join_code: &JoinCode) -> Result<RelayBinding, ConnectError> {
        let allocation_id = self
            .relay
            .join_allocation(join_code)
            .await
            .map_err(ConnectError::Relay)?;

        tracing::info!(%join_code, %allocation_id, "relay joined");
        Ok(RelayBinding {
            join_code: join_code.clone(),
            allocation_id,
        })
    }
}
