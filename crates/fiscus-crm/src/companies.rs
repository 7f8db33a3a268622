//! Company lookups: batched prefetch and cached single fetch.
//!
//! Both paths populate the same result cache, so a company resolved
//! during the listing's batch enrichment step is never fetched again by
//! the resolver's per-invoice fallback path. A lookup that finds nothing
//! caches `None`: "confirmed unknown" is a result, not a miss.

use std::collections::HashMap;

use fiscus_core::entities::CompanyInfo;
use serde_json::{Value, json};

use crate::client::{CrmClient, id_string};
use crate::error::{CrmError, ErrorClass};
use crate::transport::Transport;

#[derive(serde::Deserialize)]
struct RawCompany {
    #[serde(rename = "ID")]
    id: Value,
    #[serde(rename = "TITLE", default)]
    title: Option<String>,
    #[serde(rename = "UF_INN", default)]
    tax_id: Option<Value>,
}

impl<T: Transport> CrmClient<T> {
    /// Resolve one company, cache-first.
    ///
    /// `Ok(None)` means the CRM confirmed there is no such company; that
    /// answer is cached like any other.
    ///
    /// # Errors
    ///
    /// Returns [`CrmError`] when the lookup fails after retries.
    pub async fn company_info(&self, company_id: &str) -> Result<Option<CompanyInfo>, CrmError> {
        self.companies
            .get_or_fetch(company_id.to_string(), || async {
                let envelope = self
                    .call("crm.company.get", json!({"id": company_id}))
                    .await?;
                if envelope.result.is_null() {
                    return Ok(None);
                }
                let raw: RawCompany = serde_json::from_value(envelope.result)
                    .map_err(|e| CrmError::Malformed(format!("company {company_id}: {e}")))?;
                Ok(map_company(raw))
            })
            .await
    }

    /// Batched lookup for the unique company ids of a listing.
    ///
    /// Cache misses are requested in fixed-size batches; every id in a
    /// successful batch gets a cache entry (`None` when the server's map
    /// omits it). A failed batch is logged and skipped; its ids stay
    /// uncached so the per-invoice lookup path can still try them.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal failures (rejected credential).
    pub async fn companies_batch(
        &self,
        company_ids: &[String],
    ) -> Result<HashMap<String, CompanyInfo>, CrmError> {
        let mut found = HashMap::new();
        let mut misses = Vec::new();
        for id in company_ids {
            if misses.contains(id) {
                continue;
            }
            match self.companies.get(id).await {
                Some(Some(info)) => {
                    found.insert(id.clone(), info);
                }
                Some(None) => {} // confirmed unknown
                None => misses.push(id.clone()),
            }
        }

        for chunk in misses.chunks(self.batch_size()) {
            match self.call("crm.company.list", json!({"ids": chunk})).await {
                Ok(envelope) => {
                    let map = envelope.result.as_object().cloned().unwrap_or_default();
                    for id in chunk {
                        let info = map
                            .get(id)
                            .and_then(|v| serde_json::from_value::<RawCompany>(v.clone()).ok())
                            .and_then(map_company);
                        self.companies.insert(id.clone(), info.clone()).await;
                        if let Some(info) = info {
                            found.insert(id.clone(), info);
                        }
                    }
                }
                Err(e) if e.classify() == ErrorClass::Fatal => return Err(e),
                Err(e) => {
                    tracing::warn!(batch_len = chunk.len(), %e, "company batch failed");
                }
            }
        }

        Ok(found)
    }
}

fn map_company(raw: RawCompany) -> Option<CompanyInfo> {
    let id = id_string(&raw.id)?;
    Some(CompanyInfo {
        id,
        name: raw.title.unwrap_or_default(),
        tax_id: raw.tax_id.as_ref().and_then(id_string),
    })
}
