// src/core/strategy.rs

//! The closed set of four ways a caller can submit a command bundle.
//! Strategies are pure routing-of-call: each only knows how to turn itself
//! into a call on whatever pool the router hands it; the router alone
//! decides which pool that is.

use crate::error::CobwebError;
use crate::wire::{CacheableCommand, Command, WireClient, WireResult};

/// A caller-supplied command or batch plus its dispatch mode.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// One command.
    Single(Command),
    /// An ordered sequence of commands, dispatched as one pipelined call.
    Multi(Vec<Command>),
    /// One command plus a client-side-cache TTL.
    Cached(CacheableCommand),
    /// An ordered sequence of (command, ttl) pairs.
    MultiCached(Vec<CacheableCommand>),
}

impl Strategy {
    /// Dispatches `self` against `pool`. `Single`/`Multi` reject any
    /// non-read-only command with `WriteCommandRejected` before touching the
    /// network; `Cached`/`MultiCached` are assumed read-only by construction
    /// (the caching protocol requires it) and are not re-checked here.
    pub async fn execute(&self, pool: &dyn WireClient) -> Result<Vec<WireResult>, CobwebError> {
        match self {
            Strategy::Single(cmd) => {
                if !cmd.is_read_only() {
                    return Err(CobwebError::WriteCommandRejected);
                }
                Ok(vec![pool.do_cmd(cmd).await])
            }
            Strategy::Multi(cmds) => {
                if cmds.iter().any(|c| !c.is_read_only()) {
                    return Err(CobwebError::WriteCommandRejected);
                }
                Ok(pool.do_multi(cmds).await)
            }
            Strategy::Cached(cmd) => Ok(vec![pool.do_cache(cmd).await]),
            Strategy::MultiCached(cmds) => Ok(pool.do_multi_cache(cmds).await),
        }
    }
}
