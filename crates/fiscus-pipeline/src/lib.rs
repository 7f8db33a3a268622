//! # fiscus-pipeline
//!
//! Enrichment and validation on top of the CRM integration client.
//!
//! - [`resolver`]: counterparty identity resolution as an ordered strategy
//!   list with a strict priority (embedded batch data, then cached/remote
//!   lookup, then raw-payload fallback) so no redundant network call is
//!   made once a value is known.
//! - [`validate`]: final typed coercion. Absence defaults to zero and is
//!   recorded, VAT classification is computed (zero and absent are both
//!   `no_vat`), tax identifiers get a checksum verdict, fractional
//!   quantities stay fractional.
//! - [`run`]: orchestration. List, batch prefetch, bounded-concurrency
//!   enrich-then-validate preserving input order, run-level timeout with a
//!   partial-results indicator.

pub mod resolver;
pub mod run;
pub mod validate;

mod error;

pub use error::RunError;
pub use run::{RunOutput, Runner};
