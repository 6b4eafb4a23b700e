//! Shared HTTP plumbing for integration clients.
//!
//! Every client sends exactly one request per call and maps the outcome into [`HttpError`].
//! Components decide whether a failure becomes an [`AppError`] or a payload on the
//! `failed` channel (see [`HttpError::is_validation_failure`]).

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// ASCII set for encoding path segments (slashes included).
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'"');

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {service} request: {source}")]
    Encode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    pub fn service(&self) -> &'static str {
        match self {
            HttpError::Transport { service, .. }
            | HttpError::Status { service, .. }
            | HttpError::Decode { service, .. }
            | HttpError::Encode { service, .. } => service,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport { source, .. } => source.status(),
            HttpError::Decode { .. } | HttpError::Encode { .. } => None,
        }
    }

    /// Raw response body for status errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            HttpError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Response body parsed as JSON when possible, otherwise the raw text.
    pub fn body_json(&self) -> Value {
        self.body().map(parse_body).unwrap_or(Value::Null)
    }

    /// 400, 404, 409 and 422 are routed to the `failed` channel by components that declare it.
    pub fn is_validation_failure(&self) -> bool {
        self.status().is_some_and(is_validation_failure)
    }
}

pub fn is_validation_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::NOT_FOUND
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}

impl From<HttpError> for AppError {
    fn from(err: HttpError) -> Self {
        let service = err.service().to_ascii_uppercase().replace(['.', ' '], "-");
        match &err {
            HttpError::Status { status, body, .. } => {
                let category = match *status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        ErrorCategory::AuthenticationError
                    }
                    _ => ErrorCategory::ApiError,
                };
                AppError::new(category, err.to_string())
                    .with_code(format!("{}-HTTP-{}", service, status.as_u16()))
                    .with_context("status", status.as_u16().to_string())
                    .with_context("body", body.clone())
            }
            HttpError::Transport { .. } => AppError::new(ErrorCategory::HttpError, err.to_string())
                .with_code(format!("{}-TRANSPORT", service)),
            HttpError::Decode { .. } => {
                AppError::new(ErrorCategory::SerializationError, err.to_string())
                    .with_code(format!("{}-DECODE", service))
            }
            HttpError::Encode { .. } => {
                AppError::new(ErrorCategory::SerializationError, err.to_string())
                    .with_code(format!("{}-ENCODE", service))
            }
        }
    }
}

/// Build the reqwest client shared by an integration's components.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("superplane-integrations/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("falling back to default HTTP client: {}", err);
            reqwest::Client::new()
        })
}

/// Send the request and return status + body for 2xx responses.
pub async fn send(
    service: &'static str,
    request: RequestBuilder,
) -> Result<(StatusCode, String), HttpError> {
    let response = request
        .send()
        .await
        .map_err(|source| HttpError::Transport { service, source })?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| HttpError::Transport { service, source })?;
    if !status.is_success() {
        tracing::debug!(service, status = status.as_u16(), "request rejected");
        return Err(HttpError::Status {
            service,
            status,
            body,
        });
    }
    Ok((status, body))
}

/// Send the request and decode a 2xx JSON body. An empty body decodes as JSON `null`.
pub async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: RequestBuilder,
) -> Result<T, HttpError> {
    let (_, body) = send(service, request).await?;
    decode(service, &body)
}

pub fn decode<T: DeserializeOwned>(service: &'static str, body: &str) -> Result<T, HttpError> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|source| HttpError::Decode { service, source })
}

fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string()
}

/// Join a base URL and already-encoded path segments.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let trimmed = segment.trim_matches('/');
        if !trimmed.is_empty() {
            url.push('/');
            url.push_str(trimmed);
        }
    }
    url
}
