//! Run orchestration: one date range in, ordered records plus a report out.
//!
//! Stages, in order: list invoices (paginated) → batch company prefetch →
//! batch product fetch → per-invoice enrich-then-validate. Per-invoice
//! work runs with bounded concurrency underneath the client's global rate
//! limiter, and the output always preserves the server-provided input
//! order. The whole run sits under a single timeout; on expiry, in-flight
//! requests are abandoned and the error carries completed/total counts
//! instead of a silently truncated result set.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fiscus_config::{FiscusConfig, LimitsConfig};
use fiscus_core::entities::{InvoiceRecord, ValidationReport};
use fiscus_crm::{CrmClient, HttpTransport, Transport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::RunError;
use crate::{resolver, validate};

/// The handoff to the external report renderer.
#[derive(Debug)]
pub struct RunOutput {
    /// Enriched, validated invoices in server-provided order.
    pub invoices: Vec<InvoiceRecord>,
    pub report: ValidationReport,
}

/// Orchestrates one export run over an injected client.
pub struct Runner<T: Transport> {
    client: Arc<CrmClient<T>>,
    limits: LimitsConfig,
}

impl Runner<HttpTransport> {
    /// Build a production runner from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] when the CRM section is missing or a
    /// tuning value is out of range.
    pub fn from_config(config: &FiscusConfig) -> Result<Self, RunError> {
        config.validate()?;
        let crm = config.require_crm()?;
        let client = CrmClient::new(HttpTransport::new(crm), &config.limits);
        Ok(Self::new(client, config.limits.clone()))
    }
}

impl<T: Transport + 'static> Runner<T> {
    #[must_use]
    pub fn new(client: CrmClient<T>, limits: LimitsConfig) -> Self {
        Self {
            client: Arc::new(client),
            limits,
        }
    }

    /// The client, for observing cache/retry state in tests.
    #[must_use]
    pub fn client(&self) -> &Arc<CrmClient<T>> {
        &self.client
    }

    /// Export all invoices in `[start, end]`.
    ///
    /// # Errors
    ///
    /// Fatal CRM failures and the run timeout surface as [`RunError`];
    /// everything recoverable lands in the output's report instead.
    pub async fn export(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RunOutput, RunError> {
        let completed = Arc::new(AtomicUsize::new(0));
        let total = Arc::new(AtomicUsize::new(0));
        let timeout = Duration::from_secs(self.limits.run_timeout_secs);

        match tokio::time::timeout(timeout, self.run_inner(start, end, &completed, &total)).await {
            Ok(result) => result,
            Err(_) => Err(RunError::TimedOut {
                timeout_secs: self.limits.run_timeout_secs,
                completed: completed.load(Ordering::Relaxed),
                total: total.load(Ordering::Relaxed),
            }),
        }
    }

    async fn run_inner(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        completed: &Arc<AtomicUsize>,
        total: &Arc<AtomicUsize>,
    ) -> Result<RunOutput, RunError> {
        // Any listing failure is fatal: no partial output without a
        // complete invoice set.
        let listing = self.client.list_invoices(start, end).await?;
        let mut invoices = listing.invoices;
        let mut report = listing.report;
        total.store(invoices.len(), Ordering::Relaxed);
        tracing::info!(count = invoices.len(), "listing complete, enriching");

        // Batch company prefetch; results arrive embedded on the records
        // so the resolver's top-priority strategy settles them for free.
        let mut company_ids = Vec::new();
        for record in &invoices {
            if let Some(id) = &record.company_id {
                if !company_ids.contains(id) {
                    company_ids.push(id.clone());
                }
            }
        }
        let companies = self.client.companies_batch(&company_ids).await?;
        for record in &mut invoices {
            if let Some(info) = record.company_id.as_ref().and_then(|id| companies.get(id)) {
                record.company_name = Some(info.name.clone());
                if record.tax_id.is_none() {
                    record.tax_id = info.tax_id.clone();
                }
            }
        }

        // Batch product fetch; empty results are cached as confirmed
        // empty, failures are per-invoice issues.
        let invoice_ids: Vec<String> = invoices.iter().map(|r| r.id.clone()).collect();
        let products = self.client.products_for_invoices(&invoice_ids).await?;
        report.merge(products.report);
        for record in &mut invoices {
            if let Some(lines) = products.by_invoice.get(&record.id) {
                record.lines = lines.clone();
            }
        }

        // Enrich then validate, per invoice in that order, bounded
        // concurrency, output in input order.
        let count = invoices.len();
        let semaphore = Arc::new(Semaphore::new(self.limits.max_in_flight));
        let mut tasks: JoinSet<Result<(usize, InvoiceRecord, ValidationReport), fiscus_crm::CrmError>> =
            JoinSet::new();
        for (idx, mut record) in invoices.into_iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(completed);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let mut item_report = ValidationReport::new();
                resolver::resolve(&client, &mut record, &mut item_report).await?;
                validate::validate(&mut record, &mut item_report);
                completed.fetch_add(1, Ordering::Relaxed);
                Ok((idx, record, item_report))
            });
        }

        let mut slots: Vec<Option<(InvoiceRecord, ValidationReport)>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((idx, record, item_report))) => {
                    slots[idx] = Some((record, item_report));
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => unreachable!("enrichment task cancelled: {e}"),
            }
        }

        let mut out = Vec::with_capacity(count);
        for slot in slots {
            let (record, item_report) = slot.expect("every index is filled exactly once");
            report.merge(item_report);
            out.push(record);
        }

        tracing::info!(
            invoices = out.len(),
            issues = report.issues.len(),
            retries = self.client.retries_observed(),
            "run complete"
        );
        Ok(RunOutput {
            invoices: out,
            report,
        })
    }
}
