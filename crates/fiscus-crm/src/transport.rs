//! Transport abstraction over the CRM wire protocol.
//!
//! The client is generic over [`Transport`] so tests can substitute fakes
//! (call-count spies, scripted failures) without any HTTP in the loop; the
//! production implementation is [`HttpTransport`].

use fiscus_config::CrmConfig;
use serde_json::Value;

use crate::error::CrmError;
use crate::http::{Envelope, check_response, decode_envelope};

/// One method-name-plus-parameter-object call to the CRM.
pub trait Transport: Send + Sync {
    /// Issue `method` with `params` and decode the response envelope.
    fn call(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Envelope, CrmError>> + Send;
}

/// Production transport: HTTPS POST to
/// `{base_url}/{credential}/{method}.json` with a JSON parameter object.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    credential: String,
}

impl HttpTransport {
    /// Build a transport from the CRM endpoint configuration.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(config: &CrmConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("fiscus/0.1")
                .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
                .build()
                .expect("reqwest client should build"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential: config.credential.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/{}/{method}.json",
            self.base_url,
            urlencoding::encode(&self.credential)
        )
    }
}

impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Envelope, CrmError> {
        let resp = self.http.post(self.url(method)).json(&params).send().await?;
        let resp = check_response(resp).await?;
        let body: Value = resp.json().await?;
        decode_envelope(&body)
    }
}
