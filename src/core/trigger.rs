#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::payload::Payload;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Inbound webhook call routed to a trigger.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub configuration: Value,
}

impl WebhookRequest {
    pub fn new(body: impl Into<Vec<u8>>, configuration: Value) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
            configuration,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Trait implemented by webhook-driven triggers.
#[async_trait]
pub trait Trigger: Send + Sync + 'static {
    /// Trigger name, e.g. `dash0.onAlertEvent`.
    fn name(&self) -> &'static str;

    fn label(&self) -> &'static str;

    /// Validate trigger configuration.
    fn setup(&self, configuration: &Value) -> Result<(), AppError>;

    /// Normalize an inbound callback into zero or more workflow events.
    async fn handle_webhook(&self, request: WebhookRequest) -> Result<Vec<Payload>, AppError>;
}
