// src/config.rs

//! Loads and validates the on-disk configuration: credentials plus the two
//! node groups (masters, replicas) and their saturation thresholds.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Top-level document. A `[redis]` table nests `masters`/`replicas` under
/// it, rather than placing the two groups at the top level.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub redis: RedisConfig,
}

/// Credentials, the two node groups, and the monitor's sampling cadence.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RedisConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub masters: NodeGroupConfig,
    pub replicas: NodeGroupConfig,
    #[serde(default = "default_sampling_delay_secs")]
    pub sampling_delay_secs: u64,
}

/// One node group: its endpoint addresses and saturation ceiling.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NodeGroupConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
    pub max_threshold: f64,
}

fn default_sampling_delay_secs() -> u64 {
    1
}

impl Config {
    /// Reads and parses a TOML file, then validates it: read the whole file,
    /// parse with `toml`, run a post-parse validation pass, surface failures
    /// with `anyhow::Context` so the caller sees which file and which check
    /// failed.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.redis.masters.addresses.is_empty() && self.redis.replicas.addresses.is_empty() {
            return Err(anyhow!(
                "redis.masters and redis.replicas cannot both be empty"
            ));
        }
        if self.redis.masters.max_threshold < 0.0 {
            return Err(anyhow!("redis.masters.max_threshold cannot be negative"));
        }
        if self.redis.replicas.max_threshold < 0.0 {
            return Err(anyhow!("redis.replicas.max_threshold cannot be negative"));
        }
        if self.redis.sampling_delay_secs == 0 {
            return Err(anyhow!("redis.sampling_delay_secs cannot be 0"));
        }
        Ok(())
    }

    pub fn sampling_delay(&self) -> Duration {
        Duration::from_secs(self.redis.sampling_delay_secs)
    }

    /// All addresses across both groups, deduplicated, in first-seen order —
    /// the set the monitor should sample.
    pub fn monitored_addresses(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.redis
            .masters
            .addresses
            .iter()
            .chain(self.redis.replicas.addresses.iter())
            .filter(|addr| seen.insert((*addr).clone()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_nested_redis_table() {
        let file = write_temp(
            r#"
            [redis]
            username = "user"
            password = "pass"

            [redis.masters]
            addresses = ["m1:6379", "m2:6379"]
            max_threshold = 80.0

            [redis.replicas]
            addresses = ["r1:6379"]
            max_threshold = 70.0
            "#,
        );
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.redis.masters.addresses.len(), 2);
        assert_eq!(config.redis.replicas.max_threshold, 70.0);
        assert_eq!(config.redis.sampling_delay_secs, 1);
    }

    #[test]
    fn rejects_both_groups_empty() {
        let file = write_temp(
            r#"
            [redis]
            [redis.masters]
            max_threshold = 80.0
            [redis.replicas]
            max_threshold = 70.0
            "#,
        );
        let err = Config::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("cannot both be empty"));
    }

    #[test]
    fn monitored_addresses_deduplicates() {
        let file = write_temp(
            r#"
            [redis]
            [redis.masters]
            addresses = ["a:1", "b:1"]
            max_threshold = 80.0
            [redis.replicas]
            addresses = ["b:1", "c:1"]
            max_threshold = 70.0
            "#,
        );
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.monitored_addresses(),
            vec!["a:1".to_string(), "b:1".to_string(), "c:1".to_string()]
        );
    }
}
