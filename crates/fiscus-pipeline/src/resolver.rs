//! Counterparty identity resolution.
//!
//! Several sources can supply the company name and tax id of an invoice;
//! resolution walks a fixed, declarative priority list and stops at the
//! first strategy that delivers. The ordering is the single most
//! important invariant of the pipeline: the cheap sources come first, so
//! a record whose identity already arrived with the listing never touches
//! the network again.
//!
//! Resolution is idempotent: a settled record is a no-op.

use fiscus_core::entities::{InvoiceRecord, IssueKind, ValidationReport};
use fiscus_core::enums::{CompanySourceKind, Enrichment};
use fiscus_crm::{CrmClient, CrmError, ErrorClass, Transport};

/// How expensive a strategy is to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceCost {
    /// Already on the record; no I/O.
    Free,
    /// Run-scoped cache, possibly one network call on a cold key.
    CachedOrRemote,
}

/// One source of counterparty identity, in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Identity attached during the listing's batch enrichment step.
    Embedded,
    /// The company endpoint, through the result cache.
    Lookup,
    /// Alternate field on the raw invoice payload; last resort.
    Fallback,
}

impl Strategy {
    /// The resolution order, highest priority first.
    pub const PRIORITY: [Self; 3] = [Self::Embedded, Self::Lookup, Self::Fallback];

    #[must_use]
    pub const fn cost(self) -> SourceCost {
        match self {
            Self::Embedded | Self::Fallback => SourceCost::Free,
            Self::Lookup => SourceCost::CachedOrRemote,
        }
    }

    /// Whether this strategy could supply identity for `record`.
    #[must_use]
    pub fn can_supply(self, record: &InvoiceRecord) -> bool {
        match self {
            Self::Embedded => record.has_company_identity(),
            Self::Lookup => record.company_id.is_some(),
            Self::Fallback => {
                record.fallback_company_name.is_some() || record.fallback_tax_id.is_some()
            }
        }
    }

    const fn kind(self) -> CompanySourceKind {
        match self {
            Self::Embedded => CompanySourceKind::Embedded,
            Self::Lookup => CompanySourceKind::Lookup,
            Self::Fallback => CompanySourceKind::Fallback,
        }
    }
}

/// Resolve the counterparty identity of one record in place.
///
/// Walks [`Strategy::PRIORITY`]; the first strategy that both can supply
/// and does supply settles the record. A lookup failure after retries is
/// recorded as recoverable and resolution falls through to the next
/// strategy; if nothing delivers, the record is marked incomplete and
/// retained.
///
/// # Errors
///
/// Returns [`CrmError`] only for fatal failures (rejected credential).
pub async fn resolve<T: Transport>(
    client: &CrmClient<T>,
    record: &mut InvoiceRecord,
    report: &mut ValidationReport,
) -> Result<(), CrmError> {
    if record.enrichment.is_settled() {
        return Ok(());
    }

    for strategy in Strategy::PRIORITY {
        if !strategy.can_supply(record) {
            continue;
        }
        match strategy {
            Strategy::Embedded => {
                record.enrichment = Enrichment::Resolved(strategy.kind());
                return Ok(());
            }
            Strategy::Lookup => {
                let company_id = record
                    .company_id
                    .clone()
                    .unwrap_or_default();
                match client.company_info(&company_id).await {
                    Ok(Some(info)) => {
                        record.company_name = Some(info.name);
                        if record.tax_id.is_none() {
                            record.tax_id = info.tax_id;
                        }
                        record.enrichment = Enrichment::Resolved(strategy.kind());
                        return Ok(());
                    }
                    Ok(None) => {
                        tracing::debug!(invoice_id = %record.id, company_id, "company unknown to CRM");
                    }
                    Err(e) if e.classify() == ErrorClass::Fatal => return Err(e),
                    Err(e) => {
                        tracing::warn!(invoice_id = %record.id, %e, "company lookup failed");
                        report.record(
                            record.id.clone(),
                            IssueKind::CompanyLookupFailed,
                            format!("company {company_id}: {e}"),
                        );
                    }
                }
            }
            Strategy::Fallback => {
                record.company_name = record.fallback_company_name.clone();
                if record.tax_id.is_none() {
                    record.tax_id = record.fallback_tax_id.clone();
                }
                record.enrichment = Enrichment::Resolved(strategy.kind());
                return Ok(());
            }
        }
    }

    record.enrichment = Enrichment::Incomplete;
    report.record(
        record.id.clone(),
        IssueKind::CompanyUnresolved,
        "no source could supply the counterparty identity",
    );
    Ok(())
}
