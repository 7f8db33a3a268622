use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::ProductLine;
use crate::enums::{Enrichment, VatClass};

/// One business invoice, from raw CRM payload to final typed record.
///
/// Lifecycle: created by the integration client, mutated once by the
/// enrichment resolver (counterparty fields), mutated once by the
/// validation pipeline (VAT class, tax-id verdict), then handed off
/// immutable.
///
/// `amount_was_absent` keeps the absence-vs-zero distinction after the
/// amount has been defaulted: a source zero and a defaulted zero are both
/// `Decimal::ZERO` in `amount`, but only the latter sets the flag (and is
/// recorded as a data-quality issue).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceRecord {
    pub id: String,
    pub account_number: String,
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    /// Raw tax identifier as delivered; validated, never normalized.
    pub tax_id: Option<String>,
    /// Set by the validation pipeline; `None` until validated or when no
    /// identifier was supplied at all.
    pub tax_id_valid: Option<bool>,
    pub amount: Decimal,
    pub amount_was_absent: bool,
    /// `None` is the "not applicable" sentinel.
    pub vat_amount: Option<Decimal>,
    /// Computed by the validation pipeline, never copied verbatim.
    pub vat: VatClass,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub currency: String,
    pub lines: Vec<ProductLine>,
    pub enrichment: Enrichment,
    /// Alternate-key counterparty name on the raw payload; used by the
    /// resolver's last-resort fallback strategy only.
    pub fallback_company_name: Option<String>,
    /// Alternate-key tax identifier on the raw payload.
    pub fallback_tax_id: Option<String>,
}

impl InvoiceRecord {
    /// Whether the counterparty identity fields are already populated.
    #[must_use]
    pub fn has_company_identity(&self) -> bool {
        self.company_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}
