// src/bin/cobweb-probe.rs

//! A thin smoke-test harness for the `cobweb` library: loads a config,
//! starts the monitor, waits for it to become ready, builds a router, and
//! executes one read — logging the routing decision it made. Not a served
//! product surface.

use anyhow::{Context, Result};
use cobweb::core::{GroupConfig, Monitor, MonitorConfig, Router, RouterConfig, Strategy};
use cobweb::wire::Command;
use cobweb::Config;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        )
        .init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::from_file(&config_path)
        .with_context(|| format!("failed to load configuration from '{config_path}'"))?;

    let monitor = Arc::new(
        Monitor::new(MonitorConfig {
            username: Some(config.redis.username.clone()),
            password: Some(config.redis.password.clone()),
            addresses: config.monitored_addresses(),
            delay: config.sampling_delay(),
        })
        .await
        .context("failed to create monitor")?,
    );

    let cancel = CancellationToken::new();
    let monitor_task = {
        let monitor = Arc::clone(&monitor);
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    if let Err(e) = monitor.wait_ready(Duration::from_secs(10), 5).await {
        error!("monitor did not become ready in time: {e}");
    } else {
        info!("monitor ready");
    }

    let router = Router::new(RouterConfig {
        masters: GroupConfig {
            addresses: config.redis.masters.addresses.clone(),
            username: Some(config.redis.username.clone()),
            password: Some(config.redis.password.clone()),
            max_threshold: config.redis.masters.max_threshold,
            replica_only: false,
        },
        replicas: GroupConfig {
            addresses: config.redis.replicas.addresses.clone(),
            username: Some(config.redis.username.clone()),
            password: Some(config.redis.password.clone()),
            max_threshold: config.redis.replicas.max_threshold,
            replica_only: true,
        },
        monitor: Arc::clone(&monitor),
    })
    .await
    .context("failed to create router")?;

    let cmd = Command::new("GET", vec!["change:points:5505".to_string()], true);
    match router.execute(Strategy::Single(cmd)).await {
        Ok(results) => info!("got a value from redis: {:?}", results),
        Err(e) => error!("failed to get value from redis: {e}"),
    }

    cancel.cancel();
    let _ = monitor_task.await;
    monitor.close().await;

    Ok(())
}
