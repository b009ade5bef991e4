// src/lib.rs

//! Cobweb: a CPU-load-aware read router for master/replica key-value
//! deployments. Samples each endpoint's CPU utilization in the background,
//! compares per-group medians against configured saturation thresholds, and
//! picks a read target accordingly — falling back to masters when replicas
//! are hot, and back to replicas when both groups are hot, to protect write
//! capacity.

pub mod config;
pub mod core;
pub mod error;
pub mod wire;

pub use config::Config;
pub use core::{GroupConfig, Monitor, MonitorConfig, Router, RouterConfig, Strategy};
pub use error::CobwebError;
