//! Status enums for invoice records.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// VatClass
// ---------------------------------------------------------------------------

/// VAT classification of an invoice.
///
/// Always computed from the VAT amount, never copied from the payload:
/// a zero VAT and an absent ("not applicable") VAT both classify as
/// `NoVat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatClass {
    WithVat,
    NoVat,
}

impl VatClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithVat => "with_vat",
            Self::NoVat => "no_vat",
        }
    }
}

impl fmt::Display for VatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CompanySourceKind
// ---------------------------------------------------------------------------

/// Which source supplied the counterparty identity fields, in priority
/// order (highest first).
///
/// ```text
/// embedded → lookup → fallback
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySourceKind {
    /// Attached during the listing's batch enrichment step.
    Embedded,
    /// Cached or fetched via the company endpoint.
    Lookup,
    /// Alternate field on the raw invoice payload, last resort.
    Fallback,
}

impl CompanySourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Lookup => "lookup",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for CompanySourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Enrichment lifecycle of an invoice record.
///
/// ```text
/// pending → resolved(source)
///         → incomplete
/// ```
///
/// `Incomplete` means every strategy was tried and none could supply the
/// counterparty identity; the record is retained and the gap is recorded
/// in the run's validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enrichment {
    Pending,
    Resolved(CompanySourceKind),
    Incomplete,
}

impl Enrichment {
    /// Whether the record has already been through the resolver.
    ///
    /// Re-resolving a settled record is a no-op, so this is what the
    /// resolver's idempotence check keys on.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn vat_class_snake_case_serialization() {
        assert_eq!(serde_json::to_string(&VatClass::NoVat).unwrap(), "\"no_vat\"");
        assert_eq!(
            serde_json::to_string(&VatClass::WithVat).unwrap(),
            "\"with_vat\""
        );
    }

    #[test]
    fn enrichment_settlement() {
        assert!(!Enrichment::Pending.is_settled());
        assert!(Enrichment::Resolved(CompanySourceKind::Embedded).is_settled());
        assert!(Enrichment::Incomplete.is_settled());
    }
}
