// src/core/node.rs

//! Wraps one per-endpoint connection and its address label.

use crate::error::CobwebError;
use crate::wire::{ConnectionOptions, FredWireClient, WireClient};
use std::sync::Arc;

/// Credentials shared by every endpoint in a deployment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// One endpoint's connection plus its address label. The connection is
/// opened "standalone with replica-address = self" — it also registers
/// itself as its own read target, so the introspection probe succeeds even
/// against a replica-only node. This shape is probe-only: routing decisions
/// never dispatch through an `EndpointHandle`, only through the router's own
/// group pools (see `core::cluster`).
pub struct EndpointHandle {
    address: String,
    client: Arc<dyn WireClient>,
}

impl EndpointHandle {
    pub async fn connect(address: &str, credentials: &Credentials) -> Result<Self, CobwebError> {
        let opts = ConnectionOptions {
            address: address.to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            replica_only: false,
            standalone_probe: true,
        };
        let client = FredWireClient::connect(&opts).await?;
        Ok(Self {
            address: address.to_string(),
            client: Arc::new(client),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn client(&self) -> &Arc<dyn WireClient> {
        &self.client
    }

    /// Builds a handle around an already-constructed client, bypassing the
    /// network. Used by the monitor's own unit tests to script endpoint
    /// behavior deterministically.
    #[cfg(test)]
    pub(crate) fn for_test(address: &str, client: Arc<dyn WireClient>) -> Self {
        Self {
            address: address.to_string(),
            client,
        }
    }
}
