// src/wire/fred_client.rs

//! The production [`WireClient`] implementation, backed by `fred`.
//!
//! Each instance wraps exactly one `fred::clients::Client` pointed at a
//! single address — one connection per endpoint, for both per-node monitor
//! probes and group pools. Group-level fan-out across several addresses is
//! composed one layer up, in `core::cluster::GroupPool`; this module only
//! knows how to talk to one endpoint.

use super::{CacheableCommand, Command, WireClient, WireResult, WireValue};
use crate::error::CobwebError;
use async_trait::async_trait;
use fred::interfaces::ClientLike;
use fred::prelude::{Builder, Config as FredConfig};
use fred::types::RedisValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached reply plus the instant it stops being servable from the cache.
struct CacheEntry {
    value: WireValue,
    expires_at: Instant,
}

/// Keys a cached reply by command name and arguments. Good enough for a
/// small client-side cache: the `Cached`/`MultiCached` strategies only ever
/// cache single, fully-bound commands, never command templates.
fn cache_key(cmd: &Command) -> String {
    let mut key = cmd.name.clone();
    for arg in &cmd.args {
        key.push(' ');
        key.push_str(arg);
    }
    key
}

/// Credentials and topology needed to open one connection. `replica_only`
/// marks a connection reserved for the replicas group pool; `standalone_probe`
/// marks a connection opened only for the monitor's CPU-introspection probe,
/// never used for routing.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub replica_only: bool,
    pub standalone_probe: bool,
}

pub struct FredWireClient {
    client: fred::clients::Client,
    address: String,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl FredWireClient {
    pub async fn connect(opts: &ConnectionOptions) -> Result<Self, CobwebError> {
        let mut config = FredConfig::from_url(&format!("redis://{}", opts.address))
            .map_err(|e| CobwebError::Connection(format!("invalid address {}: {e}", opts.address)))?;

        if let Some(username) = &opts.username {
            config.username = Some(username.clone());
        }
        if let Some(password) = &opts.password {
            config.password = Some(password.clone());
        }

        let client = Builder::from_config(config)
            .build()
            .map_err(|e| CobwebError::Connection(format!("failed to build client for {}: {e}", opts.address)))?;

        let _connection_task = client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| CobwebError::Connection(format!("failed to connect to {}: {e}", opts.address)))?;

        debug!(address = %opts.address, replica_only = opts.replica_only, "connected wire client");

        Ok(Self {
            client,
            address: opts.address.clone(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn to_wire_value(value: RedisValue) -> WireValue {
        match value {
            RedisValue::Null => WireValue::Nil,
            RedisValue::Integer(i) => WireValue::Integer(i),
            RedisValue::String(s) => WireValue::Simple(s.to_string()),
            RedisValue::Bytes(b) => WireValue::Bulk(b.to_vec()),
            other => WireValue::Simple(other.as_string_lossy().unwrap_or_default()),
        }
    }

    async fn dispatch(&self, cmd: &Command) -> WireResult {
        let args: Vec<RedisValue> = cmd.args.iter().cloned().map(RedisValue::from).collect();
        self.client
            .custom_raw(fred::cmd!(&cmd.name), args)
            .await
            .map(Self::to_wire_value)
            .map_err(|e| CobwebError::Wire(e.to_string()))
    }

    /// Serves `cmd` from the client-side cache if a still-live entry exists;
    /// otherwise dispatches it and caches the reply for `ttl`. `fred` has no
    /// per-call `DoCache(cmd, ttl)` of its own (its client-side caching is
    /// server-assisted invalidation tracking via `start_tracking`/
    /// `invalidation_rx`, which has no notion of a per-command TTL), so the
    /// TTL cache is kept here instead.
    async fn dispatch_cached(&self, cmd: &CacheableCommand) -> WireResult {
        let key = cache_key(&cmd.cmd);
        let now = Instant::now();

        if let Some(entry) = self.cache.read().get(&key) {
            if entry.expires_at > now {
                debug!(key, "client-side cache hit");
                return Ok(entry.value.clone());
            }
        }

        let value = self.dispatch(&cmd.cmd).await?;
        self.cache.write().insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: now + cmd.ttl,
            },
        );
        Ok(value)
    }
}

#[async_trait]
impl WireClient for FredWireClient {
    async fn do_cmd(&self, cmd: &Command) -> WireResult {
        if !cmd.is_read_only() {
            return Err(CobwebError::WriteCommandRejected);
        }
        self.dispatch(cmd).await
    }

    async fn do_multi(&self, cmds: &[Command]) -> Vec<WireResult> {
        if cmds.iter().any(|c| !c.is_read_only()) {
            return vec![Err(CobwebError::WriteCommandRejected); cmds.len()];
        }
        let mut results = Vec::with_capacity(cmds.len());
        for cmd in cmds {
            results.push(self.dispatch(cmd).await);
        }
        results
    }

    async fn do_cache(&self, cmd: &CacheableCommand) -> WireResult {
        // Cached commands are assumed read-only by construction; not
        // re-checked here.
        self.dispatch_cached(cmd).await
    }

    async fn do_multi_cache(&self, cmds: &[CacheableCommand]) -> Vec<WireResult> {
        let mut results = Vec::with_capacity(cmds.len());
        for cmd in cmds {
            results.push(self.dispatch_cached(cmd).await);
        }
        results
    }

    async fn info(&self, deadline: Duration) -> Result<String, CobwebError> {
        let fut = self.client.custom_raw(fred::cmd!("INFO"), Vec::<RedisValue>::new());
        let value = tokio::time::timeout(deadline, fut)
            .await
            .map_err(|_| CobwebError::Connection(format!("INFO timed out against {}", self.address)))?
            .map_err(|e| CobwebError::Wire(e.to_string()))?;
        Ok(Self::to_wire_value(value).to_string_lossy())
    }

    async fn close(&self) {
        let _ = self.client.quit().await;
    }
}
