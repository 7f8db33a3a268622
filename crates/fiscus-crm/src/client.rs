//! The CRM integration client.
//!
//! Owns the rate limiter, retry policy, and result caches as injected,
//! run-scoped services (never ambient globals); every outbound call is
//! gated by the limiter and driven through the retry state machine. The
//! endpoint operations live in sibling modules (`invoices`, `products`,
//! `companies`) as `impl` extensions on [`CrmClient`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fiscus_config::LimitsConfig;
use fiscus_core::entities::{CompanyInfo, ProductLine};
use serde_json::Value;

use crate::cache::ResultCache;
use crate::error::CrmError;
use crate::http::Envelope;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryPolicy, run_with_retry};
use crate::transport::Transport;

/// Rate-limited, cached, retrying client for the remote CRM.
pub struct CrmClient<T: Transport> {
    transport: T,
    limiter: RateLimiter,
    retry: RetryPolicy,
    pub(crate) companies: ResultCache<String, Option<CompanyInfo>>,
    pub(crate) products: ResultCache<String, Vec<ProductLine>>,
    batch_size: usize,
    retries_observed: AtomicU64,
}

impl<T: Transport> CrmClient<T> {
    /// Build a client over `transport` with tuning from `limits`.
    #[must_use]
    pub fn new(transport: T, limits: &LimitsConfig) -> Self {
        let ttl = Duration::from_secs(limits.cache_ttl_secs);
        Self {
            transport,
            limiter: RateLimiter::new(limits.requests_per_second),
            retry: RetryPolicy::from_limits(limits),
            companies: ResultCache::new(ttl, limits.cache_max_entries),
            products: ResultCache::new(ttl, limits.cache_max_entries),
            batch_size: limits.batch_size,
            retries_observed: AtomicU64::new(0),
        }
    }

    /// Identifiers per batched request.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total retries spent across all calls so far.
    pub fn retries_observed(&self) -> u64 {
        self.retries_observed.load(Ordering::Relaxed)
    }

    /// One rate-gated, retried CRM call.
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Envelope, CrmError> {
        let outcome = run_with_retry(&self.retry, || {
            let params = params.clone();
            async move {
                self.limiter.acquire().await;
                self.transport.call(method, params).await
            }
        })
        .await?;
        if outcome.retries > 0 {
            self.retries_observed
                .fetch_add(u64::from(outcome.retries), Ordering::Relaxed);
            tracing::debug!(method, retries = outcome.retries, "call succeeded after retries");
        }
        Ok(outcome.value)
    }
}

/// Render a wire identifier (the CRM sends both numbers and strings) as a
/// plain string key.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn id_string_accepts_numbers_and_strings() {
        assert_eq!(id_string(&json!(42)), Some("42".to_string()));
        assert_eq!(id_string(&json!("inv-42")), Some("inv-42".to_string()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
    }
}
