// src/core/monitor.rs

//! Owns endpoint handles, runs a periodic fan-out sampling loop, maintains
//! the utilization map under a reader-writer lock, and hands out snapshots.

use crate::core::cpu::parse_cpu_stats;
use crate::core::node::{Credentials, EndpointHandle};
use crate::error::CobwebError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const BASELINE_DEADLINE: Duration = Duration::from_secs(3);
const SAMPLE_DEADLINE: Duration = Duration::from_secs(2);
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-endpoint configuration for the monitor's connections and sampling
/// cadence.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub addresses: Vec<String>,
    pub delay: Duration,
}

/// Per-endpoint state, monitor-owned. `cpu_pct` below zero is the sentinel
/// meaning "not yet computable".
#[derive(Debug, Clone, Copy)]
struct EndpointState {
    user_cum: f64,
    sys_cum: f64,
    cpu_pct: f64,
    last_ts: Instant,
}

/// A point-in-time, immutable copy of the monitor's currently-published
/// utilizations, keyed by address.
pub type MonitorSnapshot = HashMap<String, f64>;

pub struct Monitor {
    nodes: Vec<EndpointHandle>,
    stats: RwLock<HashMap<String, EndpointState>>,
    delay: Duration,
}

impl Monitor {
    /// Opens one connection per configured address, takes a baseline
    /// `INFO` reading for each, and records the sentinel `cpu_pct` until the
    /// first successful delta. If any step fails for any endpoint, every
    /// already-opened connection is closed and construction fails.
    pub async fn new(config: MonitorConfig) -> Result<Self, CobwebError> {
        if config.delay.is_zero() {
            return Err(CobwebError::InvalidPeriod);
        }

        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };

        let mut nodes: Vec<EndpointHandle> = Vec::with_capacity(config.addresses.len());
        let mut stats = HashMap::with_capacity(config.addresses.len());

        for address in &config.addresses {
            let baseline = Self::baseline_one(address, &credentials).await;
            match baseline {
                Ok((handle, current)) => {
                    stats.insert(
                        address.clone(),
                        EndpointState {
                            user_cum: current.user,
                            sys_cum: current.sys,
                            cpu_pct: -1.0,
                            last_ts: Instant::now(),
                        },
                    );
                    nodes.push(handle);
                }
                Err(e) => {
                    for node in &nodes {
                        node.client().close().await;
                    }
                    return Err(e);
                }
            }
        }

        info!(endpoints = nodes.len(), "monitor constructed");

        Ok(Self {
            nodes,
            stats: RwLock::new(stats),
            delay: config.delay,
        })
    }

    async fn baseline_one(
        address: &str,
        credentials: &Credentials,
    ) -> Result<(EndpointHandle, crate::core::cpu::CpuStats), CobwebError> {
        let handle = EndpointHandle::connect(address, credentials).await?;
        let blob = handle.client().info(BASELINE_DEADLINE).await.map_err(|e| {
            CobwebError::Connection(format!("failed to get INFO from {address}: {e}"))
        })?;
        let current = parse_cpu_stats(&blob).map_err(|e| {
            CobwebError::Connection(format!("failed to extract CPU from INFO of {address}: {e}"))
        })?;
        Ok((handle, current))
    }

    /// Runs the periodic sampling loop until `cancel` fires. Per-round and
    /// per-endpoint errors are tolerated and logged; the loop only returns
    /// on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_round().await;
                }
                _ = cancel.cancelled() => {
                    info!("monitor stopped");
                    return;
                }
            }
        }
    }

    async fn run_round(&self) {
        let updates = self
            .nodes
            .iter()
            .map(|node| self.update_node(node));
        let results: Vec<Result<(), String>> = futures::future::join_all(updates).await;

        let any_success = results.iter().any(|r| r.is_ok());
        let errors: Vec<&String> = results.iter().filter_map(|r| r.as_ref().err()).collect();

        if !any_success && !errors.is_empty() {
            let joined = errors
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!("all nodes failed this sampling round: {joined}");
        }
    }

    /// Performs one node's sampling step: issue `INFO`, parse it, and fold
    /// the result into `self.stats`. The write lock is only ever held for
    /// the in-memory update, never across the network call.
    async fn update_node(&self, node: &EndpointHandle) -> Result<(), String> {
        let address = node.address();

        let blob = node
            .client()
            .info(SAMPLE_DEADLINE)
            .await
            .map_err(|e| format!("node {address}: INFO command failed: {e}"))?;

        let current = parse_cpu_stats(&blob)
            .map_err(|e| format!("node {address}: parse error: {e}"))?;

        let now = Instant::now();
        let mut stats = self.stats.write();

        let Some(prev) = stats.get(address).copied() else {
            return Err(format!("node {address}: unknown address"));
        };

        if current.user < prev.user_cum || current.sys < prev.sys_cum {
            stats.insert(
                address.to_string(),
                EndpointState {
                    user_cum: current.user,
                    sys_cum: current.sys,
                    cpu_pct: -1.0,
                    last_ts: now,
                },
            );
            debug!(address, "counters regressed, resetting to sentinel");
            return Ok(());
        }

        let delta_time = now.saturating_duration_since(prev.last_ts).as_secs_f64();
        if delta_time <= 0.0 {
            return Ok(());
        }

        let delta_user = current.user - prev.user_cum;
        let delta_sys = current.sys - prev.sys_cum;
        let cpu_pct = ((delta_user + delta_sys) / delta_time) * 100.0;

        stats.insert(
            address.to_string(),
            EndpointState {
                user_cum: current.user,
                sys_cum: current.sys,
                cpu_pct,
                last_ts: now,
            },
        );
        debug!(address, cpu_pct, "published cpu sample");
        Ok(())
    }

    /// A consistent, owned copy of every entry whose `cpu_pct` is published
    /// (non-negative). Mutating the returned map never affects subsequent
    /// snapshots.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let stats = self.stats.read();
        stats
            .iter()
            .filter(|(_, state)| state.cpu_pct >= 0.0)
            .map(|(addr, state)| (addr.clone(), state.cpu_pct))
            .collect()
    }

    /// Blocks until every endpoint has published at least one sample, or
    /// until `timeout` elapses or `max_retries` polls have passed, whichever
    /// comes first.
    pub async fn wait_ready(
        &self,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<(), CobwebError> {
        let deadline = Instant::now() + timeout;
        let mut attempts = 0;
        loop {
            if self.snapshot().len() == self.nodes.len() {
                return Ok(());
            }
            if Instant::now() >= deadline || attempts >= max_retries {
                return Err(CobwebError::NotReady { attempts });
            }
            attempts += 1;
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Releases every endpoint connection. Idempotent: the underlying wire
    /// client's `close` is itself idempotent, so calling this more than once
    /// is harmless.
    pub async fn close(&self) {
        for node in &self.nodes {
            node.client().close().await;
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{CacheableCommand, Command, WireClient, WireResult, WireValue};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A scripted fake endpoint: returns one `INFO` blob per call, in order,
    /// then repeats the last one.
    struct ScriptedWireClient {
        responses: Vec<Result<String, CobwebError>>,
        next: AtomicUsize,
    }

    impl ScriptedWireClient {
        fn new(responses: Vec<Result<String, CobwebError>>) -> Self {
            Self {
                responses,
                next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WireClient for ScriptedWireClient {
        async fn do_cmd(&self, _cmd: &Command) -> WireResult {
            Ok(WireValue::Nil)
        }
        async fn do_multi(&self, cmds: &[Command]) -> Vec<WireResult> {
            vec![Ok(WireValue::Nil); cmds.len()]
        }
        async fn do_cache(&self, _cmd: &CacheableCommand) -> WireResult {
            Ok(WireValue::Nil)
        }
        async fn do_multi_cache(&self, cmds: &[CacheableCommand]) -> Vec<WireResult> {
            vec![Ok(WireValue::Nil); cmds.len()]
        }
        async fn info(&self, _deadline: Duration) -> Result<String, CobwebError> {
            let idx = self.next.fetch_add(1, Ordering::SeqCst);
            let bound = idx.min(self.responses.len() - 1);
            self.responses[bound].clone()
        }
        async fn close(&self) {}
    }

    fn blob(user: f64, sys: f64) -> String {
        format!("used_cpu_user:{user}\nused_cpu_sys:{sys}\n")
    }

    /// Builds a monitor directly against fake in-memory endpoint state,
    /// bypassing `Monitor::new`'s network baseline so tests can script exact
    /// counter sequences and control time via `tokio::time::pause`.
    fn monitor_with_stats(stats: HashMap<String, EndpointState>) -> Monitor {
        Monitor {
            nodes: Vec::new(),
            stats: RwLock::new(stats),
            delay: Duration::from_secs(1),
        }
    }

    fn sentinel_state(user: f64, sys: f64, ts: Instant) -> EndpointState {
        EndpointState {
            user_cum: user,
            sys_cum: sys,
            cpu_pct: -1.0,
            last_ts: ts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_excludes_sentinel_entries() {
        let now = Instant::now();
        let mut stats = HashMap::new();
        stats.insert("a".to_string(), sentinel_state(1.0, 1.0, now));
        stats.insert(
            "b".to_string(),
            EndpointState {
                user_cum: 1.0,
                sys_cum: 1.0,
                cpu_pct: 12.5,
                last_ts: now,
            },
        );
        let monitor = monitor_with_stats(stats);
        let snap = monitor.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("b"), Some(&12.5));
        assert!(snap.get("a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sample_delta_matches_formula() {
        // (u=100,s=50)@t=0, (u=130,s=60)@t=1s => (30+10)/1*100 = 4000
        let now = Instant::now();
        let mut stats = HashMap::new();
        stats.insert("n1".to_string(), sentinel_state(100.0, 50.0, now));
        let monitor = monitor_with_stats(stats);

        tokio::time::advance(Duration::from_secs(1)).await;

        let client: Arc<dyn WireClient> =
            Arc::new(ScriptedWireClient::new(vec![Ok(blob(130.0, 60.0))]));
        let node = EndpointHandle::for_test("n1", client);

        monitor.update_node(&node).await.unwrap();
        let snap = monitor.snapshot();
        assert_eq!(snap.get("n1"), Some(&4000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn counter_regression_resets_then_recovers() {
        // (100,50)@0, (90,50)@1s -> counter regression, reset, snapshot omits it;
        // then (110,60)@2s -> (20+10)/1*100 = 3000
        let now = Instant::now();
        let mut stats = HashMap::new();
        stats.insert("n1".to_string(), sentinel_state(100.0, 50.0, now));
        let monitor = monitor_with_stats(stats);

        tokio::time::advance(Duration::from_secs(1)).await;
        let client: Arc<dyn WireClient> =
            Arc::new(ScriptedWireClient::new(vec![Ok(blob(90.0, 50.0))]));
        let node = EndpointHandle::for_test("n1", client);
        monitor.update_node(&node).await.unwrap();
        assert!(monitor.snapshot().get("n1").is_none());

        tokio::time::advance(Duration::from_secs(1)).await;
        let client: Arc<dyn WireClient> =
            Arc::new(ScriptedWireClient::new(vec![Ok(blob(110.0, 60.0))]));
        let node = EndpointHandle::for_test("n1", client);
        monitor.update_node(&node).await.unwrap();
        assert_eq!(monitor.snapshot().get("n1"), Some(&3000.0));
    }

    #[tokio::test(start_paused = true)]
    async fn non_monotonic_clock_is_a_no_op() {
        let now = Instant::now();
        let mut stats = HashMap::new();
        stats.insert("n1".to_string(), sentinel_state(100.0, 50.0, now));
        let monitor = monitor_with_stats(stats);
        // No time advance: delta_time == 0, update must not publish.
        let client: Arc<dyn WireClient> =
            Arc::new(ScriptedWireClient::new(vec![Ok(blob(130.0, 60.0))]));
        let node = EndpointHandle::for_test("n1", client);
        monitor.update_node(&node).await.unwrap();
        assert!(monitor.snapshot().get("n1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_address_is_an_error() {
        let monitor = monitor_with_stats(HashMap::new());
        let client: Arc<dyn WireClient> =
            Arc::new(ScriptedWireClient::new(vec![Ok(blob(1.0, 1.0))]));
        let node = EndpointHandle::for_test("ghost", client);
        let err = monitor.update_node(&node).await.unwrap_err();
        assert!(err.contains("unknown address"));
    }

    #[tokio::test(start_paused = true)]
    async fn all_nodes_failing_is_tolerated_not_fatal() {
        let now = Instant::now();
        let mut stats = HashMap::new();
        stats.insert("n1".to_string(), sentinel_state(1.0, 1.0, now));
        let monitor = monitor_with_stats(stats);
        let client: Arc<dyn WireClient> = Arc::new(ScriptedWireClient::new(vec![Err(
            CobwebError::Wire("boom".to_string()),
        )]));
        let node = EndpointHandle::for_test("n1", client);
        // The per-node helper surfaces the error...
        assert!(monitor.update_node(&node).await.is_err());
        // ...but a full round built from only failing nodes must not panic
        // or otherwise abort the loop; `run_round` swallows it.
    }
}
