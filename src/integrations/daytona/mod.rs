//! Daytona sandboxes: create, run commands, delete.

mod create_sandbox;
mod delete_sandbox;
mod execute_command;

pub use create_sandbox::CreateSandbox;
pub use delete_sandbox::DeleteSandbox;
pub use execute_command::ExecuteCommand;

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::http::{self, encode_segment, join_url, HttpError};
use crate::core::integration::Integration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "daytona";
pub const DEFAULT_BASE_URL: &str = "https://app.daytona.io/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaytonaSettings {
    pub api_key: String,
    pub base_url: String,
}

impl Default for DaytonaSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Sandbox as returned by the Daytona API.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sandbox {
    #[serde(default)]
    pub id: String,
    pub state: Option<String>,
    pub snapshot: Option<String>,
    pub target: Option<String>,
    pub created_at: Option<String>,
    pub labels: Option<serde_json::Map<String, Value>>,
}

impl Sandbox {
    pub fn to_payload(&self) -> Value {
        json!({
            "id": self.id,
            "state": self.state,
            "snapshot": self.snapshot,
            "target": self.target,
            "createdAt": self.created_at,
            "labels": self.labels.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    #[serde(default)]
    pub exit_code: i64,
    #[serde(default)]
    pub result: String,
}

pub struct DaytonaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DaytonaClient {
    pub fn new(settings: &DaytonaSettings, timeout: Duration) -> Self {
        Self {
            http: http::build_client(timeout),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    pub async fn create_sandbox(&self, body: &Value) -> Result<Sandbox, HttpError> {
        let url = join_url(&self.base_url, &["sandbox"]);
        tracing::debug!(url = %url, "creating Daytona sandbox");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_key)
            .json(body);
        http::send_json(SERVICE, request).await
    }

    pub async fn execute_command(
        &self,
        sandbox_id: &str,
        body: &Value,
    ) -> Result<ExecuteResponse, HttpError> {
        let id = encode_segment(sandbox_id);
        let url = join_url(
            &self.base_url,
            &["toolbox", &id, "toolbox", "process", "execute"],
        );
        tracing::debug!(url = %url, "executing command in Daytona sandbox");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_key)
            .json(body);
        http::send_json(SERVICE, request).await
    }

    pub async fn delete_sandbox(&self, sandbox_id: &str, force: bool) -> Result<(), HttpError> {
        let id = encode_segment(sandbox_id);
        let url = join_url(&self.base_url, &["sandbox", &id]);
        tracing::debug!(url = %url, force, "deleting Daytona sandbox");
        let mut request = self.http.delete(url.as_str()).bearer_auth(&self.api_key);
        if force {
            request = request.query(&[("force", "true")]);
        }
        http::send(SERVICE, request).await.map(|_| ())
    }

    pub async fn list_sandboxes(&self) -> Result<Value, HttpError> {
        let url = join_url(&self.base_url, &["sandbox"]);
        let request = self.http.get(url.as_str()).bearer_auth(&self.api_key);
        http::send_json(SERVICE, request).await
    }
}

pub struct DaytonaIntegration {
    client: Arc<DaytonaClient>,
}

impl DaytonaIntegration {
    pub fn new(settings: &DaytonaSettings, timeout: Duration) -> Self {
        Self {
            client: Arc::new(DaytonaClient::new(settings, timeout)),
        }
    }
}

#[async_trait]
impl Integration for DaytonaIntegration {
    fn name(&self) -> &'static str {
        "daytona"
    }

    fn label(&self) -> &'static str {
        "Daytona"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let sandboxes = self.client.list_sandboxes().await?;
        let count = sandboxes.as_array().map(Vec::len).unwrap_or(0);
        Ok(json!({ "sandboxes": count }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(CreateSandbox::new(self.client.clone())),
            Arc::new(ExecuteCommand::new(self.client.clone())),
            Arc::new(DeleteSandbox::new(self.client.clone())),
        ]
    }
}
