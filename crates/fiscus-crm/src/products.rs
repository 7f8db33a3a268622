//! Batched product-row retrieval.
//!
//! The product endpoint accepts an array of invoice identifiers and
//! returns a map keyed by identifier, so N invoices cost
//! `ceil(N / batch_size)` requests instead of N. Per-invoice empty results
//! are cached as confirmed-empty; a failed batch is recorded against each
//! of its invoices and does not abort the other batches.

use std::collections::HashMap;

use fiscus_core::decimal;
use fiscus_core::entities::{IssueKind, ProductLine, ValidationReport};
use serde_json::{Value, json};

use crate::client::{CrmClient, id_string};
use crate::error::{CrmError, ErrorClass};
use crate::transport::Transport;

#[derive(serde::Deserialize)]
struct RawProductRow {
    #[serde(rename = "ID")]
    id: Value,
    #[serde(rename = "PRODUCT_NAME", default)]
    name: Option<String>,
    #[serde(rename = "MEASURE_NAME", default)]
    unit: Option<String>,
    #[serde(rename = "QUANTITY", default)]
    quantity: Option<Value>,
    #[serde(rename = "PRICE", default)]
    price: Option<Value>,
    #[serde(rename = "TAX_VALUE", default)]
    tax_value: Option<Value>,
}

/// Product lines per invoice plus per-item fetch failures.
#[derive(Debug, Default)]
pub struct ProductsResult {
    /// Invoice id → its lines; an empty vector is a confirmed-empty
    /// result, not a gap.
    pub by_invoice: HashMap<String, Vec<ProductLine>>,
    pub report: ValidationReport,
}

impl<T: Transport> CrmClient<T> {
    /// Fetch product rows for `ids`, batching the cache misses.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal failures (rejected credential); any
    /// other batch failure is recorded per invoice in the result's report
    /// and the remaining batches proceed.
    pub async fn products_for_invoices(&self, ids: &[String]) -> Result<ProductsResult, CrmError> {
        let mut out = ProductsResult::default();

        let mut misses = Vec::new();
        for id in ids {
            if let Some(lines) = self.products.get(id).await {
                out.by_invoice.insert(id.clone(), lines);
            } else if !misses.contains(id) {
                misses.push(id.clone());
            }
        }

        for chunk in misses.chunks(self.batch_size()) {
            match self.call("crm.invoice.productrows.batch", json!({"ids": chunk})).await {
                Ok(envelope) => {
                    let mut rows_by_id: HashMap<String, Value> = envelope
                        .result
                        .as_object()
                        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default();

                    for id in chunk {
                        // Absent key means the server confirmed zero rows.
                        let raw_rows = rows_by_id.remove(id).unwrap_or(Value::Array(Vec::new()));
                        match parse_rows(id, &raw_rows) {
                            Ok(lines) => {
                                self.products.insert(id.clone(), lines.clone()).await;
                                out.by_invoice.insert(id.clone(), lines);
                            }
                            Err(e) => {
                                tracing::warn!(invoice_id = %id, %e, "product rows unusable");
                                out.report.record(
                                    id.clone(),
                                    IssueKind::ProductFetchFailed,
                                    e.to_string(),
                                );
                            }
                        }
                    }
                }
                Err(e) if e.classify() == ErrorClass::Fatal => return Err(e),
                Err(e) => {
                    tracing::warn!(batch_len = chunk.len(), %e, "product batch failed");
                    for id in chunk {
                        out.report.record(
                            id.clone(),
                            IssueKind::ProductFetchFailed,
                            format!("batch request failed: {e}"),
                        );
                    }
                }
            }
        }

        Ok(out)
    }
}

fn parse_rows(invoice_id: &str, raw: &Value) -> Result<Vec<ProductLine>, CrmError> {
    let rows: Vec<RawProductRow> = serde_json::from_value(raw.clone())
        .map_err(|e| CrmError::Malformed(format!("product rows for {invoice_id}: {e}")))?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = id_string(&row.id)?;
            Some(ProductLine {
                id,
                invoice_id: invoice_id.to_string(),
                name: row.name.unwrap_or_default(),
                unit: row.unit,
                quantity: decimal::coerce(row.quantity.as_ref()).or_zero(),
                unit_price: decimal::coerce(row.price.as_ref()).or_zero(),
                line_vat: decimal::coerce(row.tax_value.as_ref()).or_zero(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn fractional_quantity_is_preserved() {
        let raw = json!([{
            "ID": 9001,
            "PRODUCT_NAME": "Consulting hours",
            "MEASURE_NAME": "h",
            "QUANTITY": 2.5,
            "PRICE": "1500.00",
            "TAX_VALUE": "750.00"
        }]);
        let lines = parse_rows("inv-401", &raw).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, Decimal::from_str("2.5").unwrap());
        assert_eq!(lines[0].quantity.to_string(), "2.5");
        assert_eq!(lines[0].invoice_id, "inv-401");
    }

    #[test]
    fn non_array_rows_are_malformed() {
        let err = parse_rows("inv-401", &json!({"unexpected": true})).unwrap_err();
        assert!(matches!(err, CrmError::Malformed(_)));
    }

    #[test]
    fn rows_without_ids_are_skipped() {
        let raw = json!([{"ID": null, "QUANTITY": 1}, {"ID": 2, "QUANTITY": 1}]);
        let lines = parse_rows("inv-401", &raw).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, "2");
    }
}
