#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::http::{self, encode_segment, join_url, HttpError};
use crate::core::types::ErrorCategory;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const SERVICE: &str = "cloudflare";

/// One entry of the `errors` array in a Cloudflare response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Cloudflare rejected the request, either with a non-2xx status or `success: false`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Cloudflare API returned HTTP {status}: {}", summarize(.errors))]
pub struct CloudflareApiError {
    pub status: u16,
    pub errors: Vec<ErrorDetail>,
}

fn summarize(errors: &[ErrorDetail]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|err| format!("{} ({})", err.message, err.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum CloudflareError {
    #[error(transparent)]
    Api(#[from] CloudflareApiError),
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl CloudflareError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudflareError::Api(err) => Some(err.status),
            CloudflareError::Http(err) => err.status().map(|status| status.as_u16()),
        }
    }

    pub fn is_validation_failure(&self) -> bool {
        self.status()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .is_some_and(http::is_validation_failure)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// `{status, errors[{code, message}]}` as emitted on the `failed` channel.
    pub fn failure_payload(&self) -> Value {
        match self {
            CloudflareError::Api(err) => json!({
                "status": err.status,
                "errors": err.errors,
            }),
            CloudflareError::Http(err) => json!({
                "status": self.status(),
                "errors": [{ "code": 0, "message": err.to_string() }],
            }),
        }
    }
}

impl From<CloudflareError> for AppError {
    fn from(err: CloudflareError) -> Self {
        match err {
            CloudflareError::Http(http_err) => http_err.into(),
            CloudflareError::Api(api) => {
                let category = match api.status {
                    401 | 403 => ErrorCategory::AuthenticationError,
                    _ => ErrorCategory::ApiError,
                };
                let code = api
                    .errors
                    .first()
                    .map(|detail| format!("CLOUDFLARE-{}", detail.code))
                    .unwrap_or_else(|| format!("CLOUDFLARE-HTTP-{}", api.status));
                AppError::new(category, api.to_string())
                    .with_code(code)
                    .with_context("status", api.status.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DnsRecord {
    #[serde(default)]
    pub id: String,
    pub zone_id: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
    pub proxied: Option<bool>,
    pub priority: Option<u16>,
    pub comment: Option<String>,
    pub created_on: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Ruleset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub rules: Vec<Value>,
}

pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl CloudflareClient {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Self {
        Self {
            http: http::build_client(timeout),
            base_url: base_url.to_string(),
            api_token: api_token.to_string(),
        }
    }

    pub async fn verify_token(&self) -> Result<Value, CloudflareError> {
        let result: Option<Value> = self
            .request(Method::GET, &["user", "tokens", "verify"], None)
            .await?;
        Ok(result.unwrap_or(Value::Null))
    }

    pub async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &Value,
    ) -> Result<DnsRecord, CloudflareError> {
        let zone = encode_segment(zone_id);
        let result: Option<DnsRecord> = self
            .request(Method::POST, &["zones", &zone, "dns_records"], Some(record))
            .await?;
        Ok(result.unwrap_or_default())
    }

    pub async fn delete_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
    ) -> Result<Option<Value>, CloudflareError> {
        let zone = encode_segment(zone_id);
        let record = encode_segment(record_id);
        self.request(
            Method::DELETE,
            &["zones", &zone, "dns_records", &record],
            None,
        )
        .await
    }

    /// Entry point ruleset of a zone phase, e.g. `http_request_dynamic_redirect`.
    pub async fn get_phase_entrypoint(
        &self,
        zone_id: &str,
        phase: &str,
    ) -> Result<Ruleset, CloudflareError> {
        let zone = encode_segment(zone_id);
        let result: Option<Ruleset> = self
            .request(
                Method::GET,
                &["zones", &zone, "rulesets", "phases", phase, "entrypoint"],
                None,
            )
            .await?;
        Ok(result.unwrap_or_default())
    }

    pub async fn put_phase_entrypoint(
        &self,
        zone_id: &str,
        phase: &str,
        ruleset: &Value,
    ) -> Result<Ruleset, CloudflareError> {
        let zone = encode_segment(zone_id);
        let result: Option<Ruleset> = self
            .request(
                Method::PUT,
                &["zones", &zone, "rulesets", "phases", phase, "entrypoint"],
                Some(ruleset),
            )
            .await?;
        Ok(result.unwrap_or_default())
    }

    pub async fn add_ruleset_rule(
        &self,
        zone_id: &str,
        ruleset_id: &str,
        rule: &Value,
    ) -> Result<Ruleset, CloudflareError> {
        let zone = encode_segment(zone_id);
        let ruleset = encode_segment(ruleset_id);
        let result: Option<Ruleset> = self
            .request(
                Method::POST,
                &["zones", &zone, "rulesets", &ruleset, "rules"],
                Some(rule),
            )
            .await?;
        Ok(result.unwrap_or_default())
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Option<T>, CloudflareError> {
        let url = join_url(&self.base_url, segments);
        tracing::debug!(method = %method, url = %url, "calling Cloudflare");
        let mut request = self
            .http
            .request(method, url.as_str())
            .bearer_auth(&self.api_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let (status, text) = match http::send(SERVICE, request).await {
            Ok(response) => response,
            Err(HttpError::Status { status, body, .. }) => {
                let errors = serde_json::from_str::<Envelope<Value>>(&body)
                    .map(|envelope| envelope.errors)
                    .unwrap_or_default();
                return Err(CloudflareApiError {
                    status: status.as_u16(),
                    errors,
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };

        let envelope: Envelope<T> = http::decode(SERVICE, &text)?;
        if !envelope.success {
            return Err(CloudflareApiError {
                status: status.as_u16(),
                errors: envelope.errors,
            }
            .into());
        }
        Ok(envelope.result)
    }
}
