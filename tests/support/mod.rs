// tests/support/mod.rs
//! Shared test-only fakes, built against cobweb's public `WireClient`
//! contract — no real connection required.

use async_trait::async_trait;
use cobweb::wire::{CacheableCommand, Command, WireClient, WireResult, WireValue};
use cobweb::CobwebError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A fake endpoint that counts dispatched calls and always succeeds.
pub struct RecordingClient {
    pub single_calls: AtomicUsize,
    pub multi_calls: AtomicUsize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            single_calls: AtomicUsize::new(0),
            multi_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WireClient for RecordingClient {
    async fn do_cmd(&self, _cmd: &Command) -> WireResult {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(WireValue::Simple("OK".to_string()))
    }

    async fn do_multi(&self, cmds: &[Command]) -> Vec<WireResult> {
        self.multi_calls.fetch_add(1, Ordering::SeqCst);
        cmds.iter()
            .map(|_| Ok(WireValue::Simple("OK".to_string())))
            .collect()
    }

    async fn do_cache(&self, _cmd: &CacheableCommand) -> WireResult {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(WireValue::Simple("OK".to_string()))
    }

    async fn do_multi_cache(&self, cmds: &[CacheableCommand]) -> Vec<WireResult> {
        self.multi_calls.fetch_add(1, Ordering::SeqCst);
        cmds.iter()
            .map(|_| Ok(WireValue::Simple("OK".to_string())))
            .collect()
    }

    async fn info(&self, _deadline: Duration) -> Result<String, CobwebError> {
        Ok("used_cpu_user:1.0\nused_cpu_sys:1.0\n".to_string())
    }

    async fn close(&self) {}
}

pub fn read_cmd(key: &str) -> Command {
    Command::new("GET", vec![key.to_string()], true)
}

pub fn write_cmd(key: &str) -> Command {
    Command::new("SET", vec![key.to_string(), "v".to_string()], false)
}
