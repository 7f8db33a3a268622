//! Final typed validation and formatting.
//!
//! Runs strictly after enrichment for each invoice. Converts the working
//! record into its final shape: the VAT class is computed from the VAT
//! amount (never copied from the payload), tax identifiers get a checksum
//! verdict, defaulted numerics and quantity anomalies are recorded. No
//! check ever drops a record.

use fiscus_core::entities::{InvoiceRecord, IssueKind, ValidationReport};
use fiscus_core::enums::VatClass;
use fiscus_core::tax_id;
use rust_decimal::Decimal;

/// Validate and format one enriched record in place.
pub fn validate(record: &mut InvoiceRecord, report: &mut ValidationReport) {
    if record.amount_was_absent {
        report.record(
            record.id.clone(),
            IssueKind::AmountDefaulted,
            "amount absent at source, defaulted to zero",
        );
    }

    // Zero VAT and absent VAT are the same class: no VAT. A record must
    // never be reported as with-VAT on the strength of a sentinel.
    record.vat = match record.vat_amount {
        Some(v) if v > Decimal::ZERO => VatClass::WithVat,
        _ => VatClass::NoVat,
    };

    record.tax_id_valid = record.tax_id.as_deref().map(|raw| {
        let verdict = tax_id::validate(raw);
        if !verdict.is_valid() {
            report.record(
                record.id.clone(),
                IssueKind::InvalidTaxId,
                format!("'{raw}': {verdict:?}"),
            );
        }
        verdict.is_valid()
    });

    for line in &record.lines {
        if line.quantity < Decimal::ZERO {
            report.record(
                record.id.clone(),
                IssueKind::QuantityAnomaly,
                format!("line {}: negative quantity {}", line.id, line.quantity),
            );
        }
    }
}
