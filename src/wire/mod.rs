// src/wire/mod.rs

//! The contract this crate expects from a concrete wire-protocol client.
//!
//! Command construction, connection pooling internals, and the RESP wire
//! format itself are explicitly out of scope for cobweb (see the crate's
//! design notes) — this module only pins down the shape the router and
//! monitor need: something that can tag a command read-only/not, dispatch
//! single/batched/cached calls, and answer a server-introspection probe.
//! [`fred_client`] is the one production implementation, backed by the
//! `fred` Redis/Valkey client. Tests implement their own in-memory fakes
//! against this same trait (see `tests/support`).

mod fred_client;

pub use fred_client::{ConnectionOptions, FredWireClient};

use crate::error::CobwebError;
use async_trait::async_trait;
use std::time::Duration;

/// One wire-level command plus whether the underlying client considers it
/// read-only. Read-only-ness is a property of the *built* command, decided by
/// the command-construction layer this crate does not own.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    read_only: bool,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            args,
            read_only,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// A command paired with a client-side-cache TTL, for the `Cached` /
/// `MultiCached` strategies.
#[derive(Debug, Clone)]
pub struct CacheableCommand {
    pub cmd: Command,
    pub ttl: Duration,
}

/// A single reply value. Kept intentionally shallow — the router never
/// interprets replies, it only forwards them.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Nil,
    Simple(String),
    Bulk(Vec<u8>),
    Integer(i64),
}

impl WireValue {
    /// Best-effort conversion to a string, used by the monitor to read back
    /// `INFO`.
    pub fn to_string_lossy(&self) -> String {
        match self {
            WireValue::Nil => String::new(),
            WireValue::Simple(s) => s.clone(),
            WireValue::Bulk(b) => String::from_utf8_lossy(b).into_owned(),
            WireValue::Integer(i) => i.to_string(),
        }
    }
}

pub type WireResult = Result<WireValue, CobwebError>;

/// The handle the router hands to an execution strategy, and the monitor
/// uses for its introspection probe. One instance per connection pool
/// (group pool or single endpoint).
#[async_trait]
pub trait WireClient: Send + Sync {
    async fn do_cmd(&self, cmd: &Command) -> WireResult;
    async fn do_multi(&self, cmds: &[Command]) -> Vec<WireResult>;
    async fn do_cache(&self, cmd: &CacheableCommand) -> WireResult;
    async fn do_multi_cache(&self, cmds: &[CacheableCommand]) -> Vec<WireResult>;

    /// Issues the server-introspection command (`INFO`) and returns its raw
    /// text blob, bounded by `deadline`.
    async fn info(&self, deadline: Duration) -> Result<String, CobwebError>;

    /// Releases the underlying connection. Idempotent.
    async fn close(&self);
}
