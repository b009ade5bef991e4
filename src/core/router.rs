// src/core/router.rs

//! The request-time decision engine ("Cobweb"): reads the monitor's latest
//! snapshot, computes per-group medians, and picks a pool according to a
//! fixed decision table.

use crate::core::cluster::{GroupConfig, GroupDescriptor};
use crate::core::median::median;
use crate::core::monitor::Monitor;
use crate::core::strategy::Strategy;
use crate::error::CobwebError;
use crate::wire::WireResult;
use std::sync::Arc;
use tracing::info;

/// Which group's pool a routing decision selected. Exposed separately from
/// [`Router::execute`] so the decision table itself can be tested as a pure
/// function, without standing up real connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedGroup {
    Masters,
    Replicas,
}

/// The decision table, applied literally:
/// - replicas hot, masters cold -> masters
/// - replicas hot, masters hot  -> replicas (protect write capacity)
/// - replicas cold              -> replicas
pub fn decide(
    masters_median: f64,
    replicas_median: f64,
    masters_threshold: f64,
    replicas_threshold: f64,
) -> SelectedGroup {
    if replicas_median > replicas_threshold {
        if masters_median <= masters_threshold {
            SelectedGroup::Masters
        } else {
            SelectedGroup::Replicas
        }
    } else {
        SelectedGroup::Replicas
    }
}

/// Construction parameters for a [`Router`]. `monitor` is a shared,
/// non-owning handle: the router reads snapshots from it but never starts,
/// stops, or closes it — that is the application's job.
pub struct RouterConfig {
    pub masters: GroupConfig,
    pub replicas: GroupConfig,
    pub monitor: Arc<Monitor>,
}

/// Holds the two group descriptors and the monitor handle. Stateless across
/// calls — the only thing that evolves is the monitor's map.
pub struct Router {
    masters: GroupDescriptor,
    replicas: GroupDescriptor,
    monitor: Arc<Monitor>,
}

impl Router {
    /// Rejects a configuration where both group address lists are empty.
    /// (The monitor reference cannot be absent: it is a required, non-`Option`
    /// constructor parameter, so that failure mode is a compile-time
    /// impossibility here rather than a runtime check — see `DESIGN.md`.)
    pub async fn new(config: RouterConfig) -> Result<Self, CobwebError> {
        if config.masters.addresses.is_empty() && config.replicas.addresses.is_empty() {
            return Err(CobwebError::Configuration(
                "incorrect system's configuration with empty nodes".to_string(),
            ));
        }

        let masters = GroupDescriptor::connect(&config.masters)
            .await
            .map_err(|e| CobwebError::Configuration(format!("failed to create masters pool: {e}")))?;
        let replicas = GroupDescriptor::connect(&config.replicas)
            .await
            .map_err(|e| CobwebError::Configuration(format!("failed to create replicas pool: {e}")))?;

        info!(
            masters = masters.addresses.len(),
            replicas = replicas.addresses.len(),
            "router constructed"
        );

        Ok(Self {
            masters,
            replicas,
            monitor: config.monitor,
        })
    }

    /// Picks a pool per the decision table and delegates to `strategy`.
    ///
    /// - replicas hot, masters cold  -> masters
    /// - replicas hot, masters hot   -> replicas (protect write capacity)
    /// - replicas cold (either way)  -> replicas
    ///
    /// An empty group snapshot medians to `0.0`, which reads as "cold" for
    /// any non-negative threshold — this is the intentional bootstrap
    /// behavior: before the monitor has a first delta, every group looks
    /// cold.
    pub async fn execute(&self, strategy: Strategy) -> Result<Vec<WireResult>, CobwebError> {
        let snapshot = self.monitor.snapshot();

        let masters_median = median(&group_utilizations(&snapshot, &self.masters.addresses));
        let replicas_median = median(&group_utilizations(&snapshot, &self.replicas.addresses));

        let pool = match decide(
            masters_median,
            replicas_median,
            self.masters.threshold,
            self.replicas.threshold,
        ) {
            SelectedGroup::Masters => &self.masters.pool,
            SelectedGroup::Replicas => &self.replicas.pool,
        };

        strategy.execute(pool.client().as_ref()).await
    }
}

fn group_utilizations(
    snapshot: &crate::core::monitor::MonitorSnapshot,
    addresses: &[String],
) -> Vec<f64> {
    addresses
        .iter()
        .filter_map(|addr| snapshot.get(addr).copied())
        .collect()
}
