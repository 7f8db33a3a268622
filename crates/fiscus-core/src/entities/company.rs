use serde::{Deserialize, Serialize};

/// Resolved counterparty identity.
///
/// Produced once per unique company per run and shared read-only across
/// every invoice referencing it (via the result cache).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyInfo {
    pub id: String,
    pub name: String,
    pub tax_id: Option<String>,
}
