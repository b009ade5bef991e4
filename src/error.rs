// src/error.rs

//! Defines the primary error type for the crate.

use thiserror::Error;

/// The error enum covering every failure the router and monitor can surface
/// to an application. Using `thiserror` keeps the variants self-describing
/// and gives us `From` conversions for free where we need them.
#[derive(Error, Debug, Clone)]
pub enum CobwebError {
    /// A read-only-only command bundle (`Single`/`Multi`) contained a write
    /// command.
    #[error("non-read command routed through cobweb")]
    WriteCommandRejected,

    /// The INFO-style introspection blob carried neither `used_cpu_user` nor
    /// `used_cpu_sys`.
    #[error("no valid CPU stats found in introspection response")]
    NoValidCpuStats,

    /// The monitor was configured with a zero sampling delay.
    #[error("sampling period must be greater than zero")]
    InvalidPeriod,

    /// A configuration value was missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Baseline or group-pool connection setup failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// An error bubbled up verbatim from the underlying wire client.
    #[error("wire client error: {0}")]
    Wire(String),

    /// `Monitor::wait_ready` exceeded its deadline or retry budget.
    #[error("monitor not ready after {attempts} attempts")]
    NotReady { attempts: usize },
}

impl From<std::io::Error> for CobwebError {
    fn from(e: std::io::Error) -> Self {
        CobwebError::Connection(e.to_string())
    }
}
