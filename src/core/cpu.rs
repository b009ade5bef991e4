// src/core/cpu.rs

//! Extracts cumulative user/system CPU counters from a server-introspection
//! text blob (one `key:value` pair per line, as `INFO` emits).

use crate::error::CobwebError;

/// Cumulative CPU seconds as last reported by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuStats {
    pub user: f64,
    pub sys: f64,
}

const VALUE_CEILING: f64 = 1e9;

/// Parses `used_cpu_user` / `used_cpu_sys` out of `blob`. A missing key
/// defaults its slot to zero; a value that fails to parse, or parses but is
/// non-finite, negative, or at/above `1e9`, is silently skipped rather than
/// treated as a hard error. Fails only when neither key was ever seen.
pub fn parse_cpu_stats(blob: &str) -> Result<CpuStats, CobwebError> {
    let mut user = 0.0;
    let mut sys = 0.0;
    let mut found = false;

    for line in blob.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key != "used_cpu_user" && key != "used_cpu_sys" {
            continue;
        }

        let Ok(parsed) = value.parse::<f64>() else {
            continue;
        };
        if !parsed.is_finite() || parsed < 0.0 || parsed >= VALUE_CEILING {
            continue;
        }

        if key == "used_cpu_user" {
            user = parsed;
        } else {
            sys = parsed;
        }
        found = true;
    }

    if !found {
        return Err(CobwebError::NoValidCpuStats);
    }

    Ok(CpuStats { user, sys })
}
