//! Invoice listing: date-range filtering and offset pagination.

use chrono::{DateTime, Utc};
use fiscus_core::decimal::{self, Coerced};
use fiscus_core::entities::{InvoiceRecord, IssueKind, ValidationReport};
use fiscus_core::enums::{Enrichment, VatClass};
use serde_json::{Value, json};

use crate::client::{CrmClient, id_string};
use crate::error::CrmError;
use crate::transport::Transport;

#[derive(serde::Deserialize)]
struct RawInvoice {
    #[serde(rename = "ID")]
    id: Value,
    #[serde(rename = "ACCOUNT_NUMBER", default)]
    account_number: Option<String>,
    #[serde(rename = "UF_COMPANY_ID", default)]
    company_id: Option<Value>,
    #[serde(rename = "PRICE", default)]
    price: Option<Value>,
    #[serde(rename = "TAX_VALUE", default)]
    tax_value: Option<Value>,
    #[serde(rename = "CURRENCY_ID", default)]
    currency: Option<String>,
    #[serde(rename = "DATE_INSERT")]
    created_at: DateTime<Utc>,
    #[serde(rename = "DATE_PAYED", default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(rename = "UF_CONTRAGENT_NAME", default)]
    fallback_company_name: Option<String>,
    #[serde(rename = "UF_CONTRAGENT_INN", default)]
    fallback_tax_id: Option<Value>,
}

/// A complete, de-paginated listing plus the ingestion anomalies it
/// produced (malformed numeric fields and the like).
#[derive(Debug)]
pub struct Listing {
    /// Invoices in server-provided order.
    pub invoices: Vec<InvoiceRecord>,
    pub report: ValidationReport,
}

impl<T: Transport> CrmClient<T> {
    /// Fetch every invoice in `[start, end]`, following `next`/`total`
    /// pagination until the server signals no further pages.
    ///
    /// The rate limiter and retry policy apply to every page request.
    ///
    /// # Errors
    ///
    /// Fails the whole call on a non-retryable error (or exhausted
    /// retries) on any page; the caller decides fatality.
    pub async fn list_invoices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Listing, CrmError> {
        let mut invoices = Vec::new();
        let mut report = ValidationReport::new();
        let mut offset = 0u64;

        loop {
            let params = json!({
                "order": {"DATE_INSERT": "ASC"},
                "filter": {
                    ">=DATE_INSERT": start.to_rfc3339(),
                    "<=DATE_INSERT": end.to_rfc3339(),
                },
                "start": offset,
            });
            let envelope = self.call("crm.invoice.list", params).await?;
            let rows: Vec<RawInvoice> = serde_json::from_value(envelope.result)
                .map_err(|e| CrmError::Malformed(format!("invoice page at {offset}: {e}")))?;

            for raw in rows {
                if let Some(record) = ingest(raw, &mut report) {
                    invoices.push(record);
                }
            }

            match envelope.next {
                Some(next) => offset = next,
                None => break,
            }
        }

        tracing::info!(
            count = invoices.len(),
            issues = report.issues.len(),
            "invoice listing complete"
        );
        Ok(Listing { invoices, report })
    }
}

/// Map one raw payload row to a working record, recording numeric
/// anomalies. Rows without a usable identifier are skipped (nothing to
/// attribute issues to).
fn ingest(raw: RawInvoice, report: &mut ValidationReport) -> Option<InvoiceRecord> {
    let id = id_string(&raw.id)?;

    let amount = coerce_field(&id, "PRICE", raw.price.as_ref(), report);
    let vat = coerce_field(&id, "TAX_VALUE", raw.tax_value.as_ref(), report);

    Some(InvoiceRecord {
        account_number: raw.account_number.unwrap_or_default(),
        company_id: raw.company_id.as_ref().and_then(id_string),
        company_name: None,
        tax_id: None,
        tax_id_valid: None,
        amount: amount.or_zero(),
        amount_was_absent: amount.is_absent(),
        vat_amount: match vat {
            Coerced::Value(d) => Some(d),
            Coerced::Absent | Coerced::Malformed(_) => None,
        },
        // Provisional; the validation pipeline recomputes it.
        vat: VatClass::NoVat,
        created_at: raw.created_at,
        closed_at: raw.closed_at,
        currency: raw.currency.unwrap_or_default(),
        lines: Vec::new(),
        enrichment: Enrichment::Pending,
        fallback_company_name: raw
            .fallback_company_name
            .filter(|n| !n.trim().is_empty()),
        fallback_tax_id: raw.fallback_tax_id.as_ref().and_then(id_string),
        id,
    })
}

/// Coerce one numeric wire field, recording malformed input. Malformed is
/// not absent: it carries its own issue here, so downstream validation
/// must not report the same field again as a defaulted amount.
fn coerce_field(
    invoice_id: &str,
    field: &str,
    raw: Option<&Value>,
    report: &mut ValidationReport,
) -> Coerced {
    let coerced = decimal::coerce(raw);
    if let Coerced::Malformed(text) = &coerced {
        report.record(
            invoice_id,
            IssueKind::MalformedNumeric,
            format!("{field}: unparseable value '{text}'"),
        );
    }
    coerced
}
