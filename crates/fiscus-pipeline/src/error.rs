//! Pipeline error types.
//!
//! Only fatal conditions surface here; recoverable and data-quality
//! issues go into the run's `ValidationReport` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Fatal CRM failure: rejected credential, or an unreachable endpoint
    /// after exhausting retries on a listing page.
    #[error("fatal CRM failure: {0}")]
    Crm(#[from] fiscus_crm::CrmError),

    /// The run configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] fiscus_config::ConfigError),

    /// The whole-run timeout elapsed; in-flight work was abandoned. The
    /// counts make the partial state explicit; no silently truncated
    /// result set is ever returned.
    #[error("run timed out after {timeout_secs}s ({completed}/{total} invoices processed)")]
    TimedOut {
        timeout_secs: u64,
        completed: usize,
        total: usize,
    },
}
