// src/core/cluster.rs

//! Lazily-described, eagerly-constructed per-group connection pools.
//!
//! A group is a flat set of endpoints sharing a role (masters or replicas) —
//! there is no sharding, no consistent hashing, no key-aware routing. The
//! pool just needs to be "capable of dispatching one or many commands to the
//! group"; since the group is flat, round-robin across its member
//! connections is all that is required.

use crate::error::CobwebError;
use crate::wire::{ConnectionOptions, FredWireClient, WireClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Credentials and topology for one group (masters or replicas).
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_threshold: f64,
    pub replica_only: bool,
}

/// One group's connection pool: a flat set of per-endpoint connections,
/// dispatched round-robin. The masters pool is built with
/// `replica_only: false` (read-preferring, may also serve as write target
/// outside this crate's scope); the replicas pool is built
/// `replica_only: true`.
pub struct GroupPool {
    clients: Vec<Arc<dyn WireClient>>,
    next: AtomicUsize,
}

impl GroupPool {
    async fn connect(config: &GroupConfig) -> Result<Self, CobwebError> {
        if config.addresses.is_empty() {
            return Err(CobwebError::Configuration(
                "group must have at least one address".to_string(),
            ));
        }

        let mut clients: Vec<Arc<dyn WireClient>> = Vec::with_capacity(config.addresses.len());
        for address in &config.addresses {
            let opts = ConnectionOptions {
                address: address.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
                replica_only: config.replica_only,
                standalone_probe: false,
            };
            match FredWireClient::connect(&opts).await {
                Ok(client) => clients.push(Arc::new(client)),
                Err(e) => {
                    for client in &clients {
                        client.close().await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
        })
    }

    /// Picks the next connection in round-robin order.
    pub fn client(&self) -> &Arc<dyn WireClient> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[idx]
    }

    pub async fn close(&self) {
        for client in &self.clients {
            client.close().await;
        }
    }
}

/// A group's addresses, saturation threshold, and connection pool, owned by
/// the router.
pub struct GroupDescriptor {
    pub addresses: Vec<String>,
    pub threshold: f64,
    pub pool: GroupPool,
}

impl GroupDescriptor {
    pub async fn connect(config: &GroupConfig) -> Result<Self, CobwebError> {
        let pool = GroupPool::connect(config).await?;
        Ok(Self {
            addresses: config.addresses.clone(),
            threshold: config.max_threshold,
            pool,
        })
    }
}
