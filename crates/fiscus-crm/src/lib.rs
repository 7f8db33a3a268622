//! # fiscus-crm
//!
//! Rate-limited, cached, retrying integration client for the remote CRM.
//!
//! Retrieves large, paginated, cross-referenced datasets (invoices,
//! companies, product rows) while respecting a strict server-side request
//! budget:
//! - every outbound call funnels through one global [`RateLimiter`];
//! - failures are classified and driven through an explicit
//!   [`retry::RetryState`] machine with capped, jittered backoff;
//! - company and product lookups are memoized in a TTL
//!   [`cache::ResultCache`] that caches negative results and collapses
//!   duplicate in-flight fetches;
//! - multi-key endpoints are called in fixed-size batches, never one
//!   request per record.
//!
//! The client is generic over [`Transport`], so tests drive it with
//! scripted fakes and production uses [`HttpTransport`].

pub mod cache;
pub mod client;
pub mod companies;
pub mod invoices;
pub mod products;
pub mod rate_limit;
pub mod retry;
pub mod transport;

mod error;
mod http;

pub use client::CrmClient;
pub use error::{CrmError, ErrorClass};
pub use http::Envelope;
pub use invoices::Listing;
pub use products::ProductsResult;
pub use rate_limit::RateLimiter;
pub use retry::{Attempted, RetryPolicy, RetryState, run_with_retry};
pub use transport::{HttpTransport, Transport};
