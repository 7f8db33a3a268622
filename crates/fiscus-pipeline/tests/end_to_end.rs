//! Whole-run behavior over a scripted transport: enrichment priority,
//! absence-versus-zero semantics, VAT classification, fractional
//! quantities, ordering, caching across runs, and the run timeout.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use fiscus_config::LimitsConfig;
use fiscus_core::entities::{IssueKind, Severity};
use fiscus_core::enums::{CompanySourceKind, Enrichment, VatClass};
use fiscus_crm::{CrmClient, CrmError, Envelope, Transport};
use fiscus_pipeline::{RunError, Runner};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn limits() -> LimitsConfig {
    LimitsConfig {
        requests_per_second: 10_000.0,
        retry_base_delay_ms: 1,
        ..LimitsConfig::default()
    }
}

fn range() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap(),
    )
}

/// Three invoices exercising each enrichment source:
/// 1: company 7, known to the CRM (embedded after batch prefetch),
///    with VAT and a fractional-quantity product line;
/// 2: no company reference at all, falls back to the payload fields,
///    amount absent at source;
/// 3: company 99, unknown to the CRM, no fallback: stays incomplete.
struct ScriptedCrm {
    log: Arc<Mutex<Vec<String>>>,
}

impl Transport for ScriptedCrm {
    async fn call(&self, method: &str, params: Value) -> Result<Envelope, CrmError> {
        self.log.lock().unwrap().push(method.to_string());
        match method {
            "crm.invoice.list" => Ok(Envelope {
                result: json!([
                    {
                        "ID": 1,
                        "ACCOUNT_NUMBER": "A-1",
                        "UF_COMPANY_ID": 7,
                        "PRICE": "100.00",
                        "TAX_VALUE": "20.00",
                        "CURRENCY_ID": "RUB",
                        "DATE_INSERT": "2024-05-01T10:00:00+03:00"
                    },
                    {
                        "ID": 2,
                        "ACCOUNT_NUMBER": "A-2",
                        "PRICE": null,
                        "TAX_VALUE": 0,
                        "CURRENCY_ID": "RUB",
                        "DATE_INSERT": "2024-05-02T10:00:00+03:00",
                        "UF_CONTRAGENT_NAME": "ИП Иванов",
                        "UF_CONTRAGENT_INN": "500100732259"
                    },
                    {
                        "ID": 3,
                        "ACCOUNT_NUMBER": "A-3",
                        "UF_COMPANY_ID": 99,
                        "PRICE": "50.00",
                        "CURRENCY_ID": "RUB",
                        "DATE_INSERT": "2024-05-03T10:00:00+03:00"
                    }
                ]),
                next: None,
                total: Some(3),
            }),
            "crm.company.list" => {
                let ids = params["ids"].as_array().unwrap().clone();
                let mut map = serde_json::Map::new();
                for id in &ids {
                    if id.as_str() == Some("7") {
                        map.insert(
                            "7".into(),
                            json!({"ID": 7, "TITLE": "ООО Ромашка", "UF_INN": "7707083893"}),
                        );
                    }
                    // 99 omitted: confirmed unknown.
                }
                Ok(Envelope {
                    result: Value::Object(map),
                    next: None,
                    total: None,
                })
            }
            "crm.invoice.productrows.batch" => Ok(Envelope {
                result: json!({
                    "1": [{
                        "ID": 11,
                        "PRODUCT_NAME": "Consulting hours",
                        "MEASURE_NAME": "h",
                        "QUANTITY": 2.5,
                        "PRICE": "40.00",
                        "TAX_VALUE": "20.00"
                    }]
                }),
                next: None,
                total: None,
            }),
            other => panic!("unexpected CRM method: {other}"),
        }
    }
}

fn scripted_runner() -> (Runner<ScriptedCrm>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = CrmClient::new(
        ScriptedCrm {
            log: Arc::clone(&log),
        },
        &limits(),
    );
    (Runner::new(client, limits()), log)
}

#[tokio::test]
async fn full_run_enriches_validates_and_preserves_order() {
    let (runner, log) = scripted_runner();
    let (start, end) = range();

    let out = runner.export(start, end).await.unwrap();

    let ids: Vec<&str> = out.invoices.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);

    let first = &out.invoices[0];
    assert_eq!(first.company_name.as_deref(), Some("ООО Ромашка"));
    assert_eq!(first.tax_id.as_deref(), Some("7707083893"));
    assert_eq!(first.tax_id_valid, Some(true));
    assert_eq!(first.enrichment, Enrichment::Resolved(CompanySourceKind::Embedded));
    assert_eq!(first.vat, VatClass::WithVat);
    assert_eq!(first.lines.len(), 1);
    assert_eq!(first.lines[0].quantity, Decimal::from_str("2.5").unwrap());
    assert_eq!(first.lines[0].quantity.to_string(), "2.5");

    let second = &out.invoices[1];
    assert_eq!(second.amount, Decimal::ZERO);
    assert!(second.amount_was_absent);
    assert_eq!(second.vat, VatClass::NoVat);
    assert_eq!(second.company_name.as_deref(), Some("ИП Иванов"));
    assert_eq!(second.tax_id_valid, Some(true));
    assert_eq!(second.enrichment, Enrichment::Resolved(CompanySourceKind::Fallback));
    assert!(second.lines.is_empty());

    let third = &out.invoices[2];
    assert_eq!(third.enrichment, Enrichment::Incomplete);
    assert_eq!(third.company_name, None);
    assert_eq!(third.vat, VatClass::NoVat);

    // Every record survived; problems are issues, not omissions.
    assert_eq!(out.report.issues.len(), 2);
    assert_eq!(out.report.count_of(Severity::DataQuality), 2);
    assert!(
        out.report
            .for_invoice("2")
            .any(|i| i.kind == IssueKind::AmountDefaulted)
    );
    assert!(
        out.report
            .for_invoice("3")
            .any(|i| i.kind == IssueKind::CompanyUnresolved)
    );

    // Company 99's confirmed-unknown came from the batch prefetch, so the
    // per-invoice lookup never went to the wire.
    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        [
            "crm.invoice.list",
            "crm.company.list",
            "crm.invoice.productrows.batch"
        ]
    );
    assert_eq!(runner.client().retries_observed(), 0);
}

#[tokio::test]
async fn second_run_reuses_cached_companies_and_products() {
    let (runner, log) = scripted_runner();
    let (start, end) = range();

    runner.export(start, end).await.unwrap();
    let after_first = log.lock().unwrap().len();
    assert_eq!(after_first, 3);

    let out = runner.export(start, end).await.unwrap();
    assert_eq!(out.invoices.len(), 3);

    // Only the listing itself goes out again.
    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3], "crm.invoice.list");
}

/// One invoice whose amount is textual garbage; the defect must surface
/// as exactly one recorded issue, not once per pipeline stage.
struct GarbledAmount;

impl Transport for GarbledAmount {
    async fn call(&self, method: &str, _params: Value) -> Result<Envelope, CrmError> {
        match method {
            "crm.invoice.list" => Ok(Envelope {
                result: json!([{
                    "ID": 9,
                    "ACCOUNT_NUMBER": "A-9",
                    "PRICE": "n/a",
                    "TAX_VALUE": 0,
                    "CURRENCY_ID": "RUB",
                    "DATE_INSERT": "2024-05-04T10:00:00+03:00",
                    "UF_CONTRAGENT_NAME": "ИП Иванов"
                }]),
                next: None,
                total: Some(1),
            }),
            "crm.invoice.productrows.batch" => Ok(Envelope {
                result: json!({}),
                next: None,
                total: None,
            }),
            other => panic!("unexpected CRM method: {other}"),
        }
    }
}

#[tokio::test]
async fn malformed_amount_is_one_issue_not_two() {
    let runner = Runner::new(CrmClient::new(GarbledAmount, &limits()), limits());
    let (start, end) = range();

    let out = runner.export(start, end).await.unwrap();

    let rec = &out.invoices[0];
    assert_eq!(rec.amount, Decimal::ZERO);
    assert!(!rec.amount_was_absent);
    assert_eq!(out.report.issues.len(), 1);
    assert_eq!(out.report.issues[0].kind, IssueKind::MalformedNumeric);
}

struct NeverResponds;

impl Transport for NeverResponds {
    async fn call(&self, _method: &str, _params: Value) -> Result<Envelope, CrmError> {
        tokio::time::sleep(std::time::Duration::from_secs(86_400)).await;
        unreachable!("the run timeout must fire first")
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_run_times_out_with_progress_counts() {
    let mut limits = limits();
    limits.run_timeout_secs = 1;
    let runner = Runner::new(CrmClient::new(NeverResponds, &limits), limits);
    let (start, end) = range();

    let err = runner.export(start, end).await.unwrap_err();
    match err {
        RunError::TimedOut {
            timeout_secs,
            completed,
            total,
        } => {
            assert_eq!(timeout_secs, 1);
            assert_eq!(completed, 0);
            assert_eq!(total, 0);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

struct RejectedCredential;

impl Transport for RejectedCredential {
    async fn call(&self, _method: &str, _params: Value) -> Result<Envelope, CrmError> {
        Err(CrmError::Auth("invalid_token".into()))
    }
}

#[tokio::test]
async fn rejected_credential_fails_the_run() {
    let runner = Runner::new(CrmClient::new(RejectedCredential, &limits()), limits());
    let (start, end) = range();

    let err = runner.export(start, end).await.unwrap_err();
    assert!(matches!(err, RunError::Crm(CrmError::Auth(_))));
}
