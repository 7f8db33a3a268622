//! Entity structs for the Fiscus domain objects.
//!
//! All structs derive `Serialize`/`Deserialize` for JSON roundtrip; the
//! ordered invoice sequence plus the validation report is the handoff
//! surface to the external report renderer.

mod company;
mod invoice;
mod product;
mod report;

pub use company::CompanyInfo;
pub use invoice::InvoiceRecord;
pub use product::ProductLine;
pub use report::{Issue, IssueKind, Severity, ValidationReport};
