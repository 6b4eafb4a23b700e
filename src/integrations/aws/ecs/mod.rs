#![allow(clippy::result_large_err)]

mod describe_task;
mod model;
mod run_task;
mod stop_task;

pub use describe_task::DescribeTask;
pub use model::*;
pub use run_task::RunTask;
pub use stop_task::StopTask;

use super::signer::{Credentials, SigV4Signer, SignerError};
use super::AwsSettings;
use crate::core::error::AppError;
use crate::core::http::{self, HttpError};
use crate::core::types::ErrorCategory;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const SERVICE: &str = "aws.ecs";
const SIGNING_SERVICE: &str = "ecs";
const TARGET_PREFIX: &str = "AmazonEC2ContainerServiceV20141113";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, thiserror::Error)]
pub enum AwsApiError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("failed to sign ECS request: {0}")]
    Signing(#[from] SignerError),
}

impl AwsApiError {
    /// ECS reports client exceptions (bad cluster, bad parameters) as HTTP 400.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AwsApiError::Http(err) if err.status() == Some(StatusCode::BAD_REQUEST))
    }

    /// Error type and message from a `{"__type": ..., "message": ...}` body.
    pub fn details(&self) -> (String, String) {
        match self {
            AwsApiError::Http(err) => parse_error_body(err.body().unwrap_or_default())
                .unwrap_or_else(|| ("Unknown".to_string(), err.to_string())),
            AwsApiError::Signing(err) => ("SigningError".to_string(), err.to_string()),
        }
    }

    /// Payload emitted on the `failed` channel for client exceptions.
    pub fn failure_payload(&self) -> Value {
        let (error_type, message) = self.details();
        json!({
            "status": match self {
                AwsApiError::Http(err) => err.status().map(|status| status.as_u16()),
                AwsApiError::Signing(_) => None,
            },
            "errorType": error_type,
            "message": message,
        })
    }
}

impl From<AwsApiError> for AppError {
    fn from(err: AwsApiError) -> Self {
        match err {
            AwsApiError::Http(http_err) => {
                let details = http_err.body().and_then(parse_error_body);
                let mut app: AppError = http_err.into();
                if let Some((error_type, message)) = details {
                    app.code = format!("AWS-ECS-{}", error_type);
                    app.add_context("message", &message);
                }
                app
            }
            AwsApiError::Signing(signing) => {
                AppError::new(ErrorCategory::InternalError, signing.to_string())
                    .with_code("AWS-SIGNING")
            }
        }
    }
}

/// Client for the ECS JSON 1.1 API.
pub struct EcsClient {
    http: reqwest::Client,
    signer: SigV4Signer,
    endpoint: Url,
    region: String,
}

impl EcsClient {
    pub fn new(settings: &AwsSettings, timeout: Duration) -> Result<Self, AppError> {
        let endpoint = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://ecs.{}.amazonaws.com/", settings.region));
        let endpoint = Url::parse(&endpoint).map_err(|err| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("invalid ECS endpoint {}: {}", endpoint, err),
            )
        })?;
        if endpoint.host_str().is_none() {
            return Err(AppError::new(
                ErrorCategory::ConfigurationError,
                format!("ECS endpoint {} has no host", endpoint),
            ));
        }
        let signer = SigV4Signer::new(
            Credentials {
                access_key_id: settings.access_key_id.clone(),
                secret_access_key: settings.secret_access_key.clone(),
                session_token: settings.session_token.clone(),
            },
            &settings.region,
            SIGNING_SERVICE,
        );
        Ok(Self {
            http: http::build_client(timeout),
            signer,
            endpoint,
            region: settings.region.clone(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub async fn run_task(&self, request: &RunTaskRequest) -> Result<RunTaskResponse, AwsApiError> {
        self.call("RunTask", request).await
    }

    pub async fn stop_task(
        &self,
        request: &StopTaskRequest,
    ) -> Result<StopTaskResponse, AwsApiError> {
        self.call("StopTask", request).await
    }

    pub async fn describe_tasks(
        &self,
        request: &DescribeTasksRequest,
    ) -> Result<DescribeTasksResponse, AwsApiError> {
        self.call("DescribeTasks", request).await
    }

    pub async fn list_clusters(&self, max_results: u32) -> Result<ListClustersResponse, AwsApiError> {
        self.call("ListClusters", &json!({ "maxResults": max_results }))
            .await
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<T, AwsApiError> {
        let payload = serde_json::to_vec(body).map_err(|source| HttpError::Encode {
            service: SERVICE,
            source,
        })?;
        let target = format!("{}.{}", TARGET_PREFIX, action);
        let signed = self.signer.sign(
            "POST",
            &self.endpoint,
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
            &payload,
            Utc::now(),
        )?;

        tracing::debug!(action, endpoint = %self.endpoint, "calling ECS");
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", target.as_str());
        for (name, value) in &signed {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = http::send_json(SERVICE, request.body(payload)).await?;
        Ok(response)
    }
}

fn parse_error_body(body: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let raw_type = value
        .get("__type")
        .or_else(|| value.get("code"))
        .and_then(Value::as_str)?;
    let error_type = raw_type.rsplit('#').next().unwrap_or(raw_type).to_string();
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((error_type, message))
}
