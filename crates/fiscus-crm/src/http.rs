//! Shared HTTP and envelope handling for the CRM transport.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, 401/403 → auth, 5xx → transient server error) and decoding of
//! the CRM's response envelope, so the endpoint modules stay focused on
//! request construction and response mapping.

use serde_json::Value;

use crate::error::CrmError;

/// CRM error codes that mean the request budget was exceeded.
const LIMIT_CODES: [&str; 2] = ["QUERY_LIMIT_EXCEEDED", "OPERATION_TIME_LIMIT"];

/// CRM error codes that mean the credential is unusable.
const AUTH_CODES: [&str; 4] = [
    "expired_token",
    "invalid_token",
    "INVALID_CREDENTIALS",
    "ACCESS_DENIED",
];

/// Decoded CRM response envelope: the payload plus pagination markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub result: Value,
    /// Offset of the next page; absent on the last page.
    pub next: Option<u64>,
    /// Total matching records, when the endpoint reports it.
    pub total: Option<u64>,
}

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`CrmError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **401/403** → [`CrmError::Auth`].
/// - **5xx** → [`CrmError::Server`] (transient).
/// - **Other non-success status** → [`CrmError::Api`] with status code and
///   response body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CrmError> {
    let status = resp.status();
    if status == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(CrmError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if status == 401 || status == 403 {
        return Err(CrmError::Auth(resp.text().await.unwrap_or_default()));
    }
    if status.is_server_error() {
        return Err(CrmError::Server {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(CrmError::Api {
            code: status.as_u16().to_string(),
            description: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

/// Decode a CRM response body into an [`Envelope`].
///
/// The CRM reports application-level failures as
/// `{"error": CODE, "error_description": TEXT}` with HTTP 200; those are
/// mapped onto the error taxonomy here (limit codes → rate limited, auth
/// codes → fatal, anything else → per-operation API error). A body with
/// neither `error` nor `result` is malformed.
pub fn decode_envelope(body: &Value) -> Result<Envelope, CrmError> {
    if let Some(code) = body.get("error").and_then(Value::as_str) {
        let description = body
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if LIMIT_CODES.contains(&code) {
            return Err(CrmError::RateLimited { retry_after_secs: 1 });
        }
        if AUTH_CODES.contains(&code) {
            return Err(CrmError::Auth(format!("{code}: {description}")));
        }
        return Err(CrmError::Api {
            code: code.to_string(),
            description,
        });
    }
    let Some(result) = body.get("result") else {
        return Err(CrmError::Malformed("missing 'result' field".into()));
    };
    Ok(Envelope {
        result: result.clone(),
        next: body.get("next").and_then(Value::as_u64),
        total: body.get("total").and_then(Value::as_u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body("")
                .unwrap(),
        )
    }

    fn mock_response_with_retry_after(status: u16, value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .header("Retry-After", value)
                .body("")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn check_response_rate_limited_with_header() {
        let resp = mock_response_with_retry_after(429, "30");
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(
            err,
            CrmError::RateLimited {
                retry_after_secs: 30
            }
        ));
    }

    #[tokio::test]
    async fn check_response_rate_limited_default() {
        let resp = mock_response(429);
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(
            err,
            CrmError::RateLimited {
                retry_after_secs: 60
            }
        ));
    }

    #[tokio::test]
    async fn check_response_auth() {
        for status in [401, 403] {
            let err = check_response(mock_response(status)).await.unwrap_err();
            assert!(matches!(err, CrmError::Auth(_)), "status {status}");
        }
    }

    #[tokio::test]
    async fn check_response_server_error() {
        let err = check_response(mock_response(502)).await.unwrap_err();
        assert!(matches!(err, CrmError::Server { status: 502 }));
    }

    #[tokio::test]
    async fn check_response_success() {
        assert!(check_response(mock_response(200)).await.is_ok());
    }

    #[test]
    fn decode_result_with_pagination() {
        let body = json!({"result": [1, 2, 3], "next": 50, "total": 120});
        let envelope = decode_envelope(&body).unwrap();
        assert_eq!(envelope.result, json!([1, 2, 3]));
        assert_eq!(envelope.next, Some(50));
        assert_eq!(envelope.total, Some(120));
    }

    #[test]
    fn decode_last_page_has_no_next() {
        let body = json!({"result": [], "total": 120});
        let envelope = decode_envelope(&body).unwrap();
        assert_eq!(envelope.next, None);
    }

    #[test]
    fn decode_limit_code_is_rate_limited() {
        let body = json!({"error": "QUERY_LIMIT_EXCEEDED", "error_description": "slow down"});
        let err = decode_envelope(&body).unwrap_err();
        assert!(matches!(err, CrmError::RateLimited { .. }));
    }

    #[test]
    fn decode_auth_code_is_fatal() {
        let body = json!({"error": "expired_token", "error_description": "renew"});
        let err = decode_envelope(&body).unwrap_err();
        assert!(matches!(err, CrmError::Auth(_)));
    }

    #[test]
    fn decode_unknown_code_is_api_error() {
        let body = json!({"error": "NOT_FOUND", "error_description": "no such method"});
        let err = decode_envelope(&body).unwrap_err();
        assert!(matches!(err, CrmError::Api { .. }));
    }

    #[test]
    fn decode_missing_result_is_malformed() {
        let err = decode_envelope(&json!({"time": {}})).unwrap_err();
        assert!(matches!(err, CrmError::Malformed(_)));
    }
}
