//! CRM endpoint configuration.

use serde::{Deserialize, Serialize};

/// Default per-request timeout.
const fn default_request_timeout_secs() -> u64 {
    30
}

/// Remote CRM endpoint descriptor.
///
/// The credential is an opaque webhook token that becomes a path segment
/// of every request URL; it is supplied by the (external) configuration
/// collaborator, typically via `FISCUS_CRM__CREDENTIAL`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrmConfig {
    /// Base URL of the CRM REST endpoint, without trailing slash.
    #[serde(default)]
    pub base_url: String,

    /// Opaque credential path segment.
    #[serde(default)]
    pub credential: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl CrmConfig {
    /// Whether both required fields are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.credential.is_empty()
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credential: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
