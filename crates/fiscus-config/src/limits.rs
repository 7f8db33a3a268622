//! Operational tuning: rate, retry, cache, batch, and concurrency limits.
//!
//! Every value here is a tuning knob, not an architectural constraint.
//! The shapes (min-interval gating, capped exponential backoff, TTL
//! caching, fixed-size batching) are part of the design; the numbers are
//! not.

use serde::{Deserialize, Serialize};

const fn default_requests_per_second() -> f64 {
    2.0
}
const fn default_max_in_flight() -> usize {
    2
}
const fn default_retry_max_attempts() -> u32 {
    5
}
const fn default_retry_base_delay_ms() -> u64 {
    500
}
const fn default_retry_max_delay_ms() -> u64 {
    30_000
}
const fn default_cache_ttl_secs() -> u64 {
    900
}
const fn default_cache_max_entries() -> usize {
    10_000
}
const fn default_batch_size() -> usize {
    50
}
const fn default_run_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Absolute outbound request ceiling, enforced globally.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Simultaneous in-flight requests, layered underneath the rate
    /// ceiling. Conservative by design: 1–3.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Maximum attempts per operation (first try included).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Backoff base delay in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Backoff cap in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Result cache TTL in seconds (run-scoped cache, not persisted).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// LRU safety valve for long-running processes.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Identifiers per batched request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Whole-run timeout in seconds; on expiry the run fails with a
    /// partial-results indicator instead of a silently truncated set.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            max_in_flight: default_max_in_flight(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            batch_size: default_batch_size(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = LimitsConfig::default();
        assert!((config.requests_per_second - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.max_in_flight, 2);
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.retry_base_delay_ms, 500);
        assert_eq!(config.retry_max_delay_ms, 30_000);
        assert_eq!(config.cache_ttl_secs, 900);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.run_timeout_secs, 600);
    }
}
