use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad one recorded issue is.
///
/// Neither severity aborts the run; fatal conditions are errors, not
/// report entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A per-item operation failed after retries; the record is retained
    /// with its enrichment marked incomplete.
    Recoverable,
    /// The record is complete but a field needed correction or flagging.
    DataQuality,
}

/// What went wrong for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ProductFetchFailed,
    CompanyLookupFailed,
    CompanyUnresolved,
    InvalidTaxId,
    AmountDefaulted,
    MalformedNumeric,
    QuantityAnomaly,
}

impl IssueKind {
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ProductFetchFailed | Self::CompanyLookupFailed => Severity::Recoverable,
            Self::CompanyUnresolved
            | Self::InvalidTaxId
            | Self::AmountDefaulted
            | Self::MalformedNumeric
            | Self::QuantityAnomaly => Severity::DataQuality,
        }
    }
}

/// One recorded issue, attributed to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub invoice_id: String,
    pub severity: Severity,
    pub kind: IssueKind,
    pub detail: String,
}

/// Run-level accumulation of recoverable and data-quality issues.
///
/// The pipeline's job is the most complete report possible, not
/// zero-defect input: issues accumulate here and are never thrown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    #[must_use]
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn record(&mut self, invoice_id: impl Into<String>, kind: IssueKind, detail: impl Into<String>) {
        self.issues.push(Issue {
            invoice_id: invoice_id.into(),
            severity: kind.severity(),
            kind,
            detail: detail.into(),
        });
    }

    /// Fold another report's issues into this one.
    pub fn merge(&mut self, other: Self) {
        self.issues.extend(other.issues);
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn count_of(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Issues attributed to one invoice, in recording order.
    pub fn for_invoice<'a>(&'a self, invoice_id: &'a str) -> impl Iterator<Item = &'a Issue> {
        self.issues.iter().filter(move |i| i.invoice_id == invoice_id)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issue(s): {} recoverable, {} data-quality",
            self.issues.len(),
            self.count_of(Severity::Recoverable),
            self.count_of(Severity::DataQuality),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_map_to_expected_severity() {
        assert_eq!(IssueKind::ProductFetchFailed.severity(), Severity::Recoverable);
        assert_eq!(IssueKind::CompanyLookupFailed.severity(), Severity::Recoverable);
        assert_eq!(IssueKind::InvalidTaxId.severity(), Severity::DataQuality);
        assert_eq!(IssueKind::AmountDefaulted.severity(), Severity::DataQuality);
    }

    #[test]
    fn record_and_filter_by_invoice() {
        let mut report = ValidationReport::new();
        report.record("inv-1", IssueKind::AmountDefaulted, "amount absent at source");
        report.record("inv-2", IssueKind::InvalidTaxId, "checksum mismatch");
        report.record("inv-1", IssueKind::ProductFetchFailed, "batch failed after retries");

        assert!(!report.is_clean());
        assert_eq!(report.for_invoice("inv-1").count(), 2);
        assert_eq!(report.count_of(Severity::Recoverable), 1);
        assert_eq!(report.count_of(Severity::DataQuality), 2);
    }

    #[test]
    fn merge_appends_in_order() {
        let mut left = ValidationReport::new();
        left.record("inv-1", IssueKind::AmountDefaulted, "");
        let mut right = ValidationReport::new();
        right.record("inv-2", IssueKind::InvalidTaxId, "");

        left.merge(right);
        assert_eq!(left.issues.len(), 2);
        assert_eq!(left.issues[1].invoice_id, "inv-2");
        assert_eq!(left.to_string(), "2 issue(s): 0 recoverable, 2 data-quality");
    }
}
