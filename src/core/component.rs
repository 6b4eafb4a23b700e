#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::payload::{Emission, DEFAULT_CHANNEL};
use async_trait::async_trait;
use serde_json::Value;

/// Execution context provided to each component run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub node_id: String,
    pub configuration: Value,
    pub input: Value,
}

impl ExecutionContext {
    pub fn new(configuration: Value) -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            node_id: String::new(),
            configuration,
            input: Value::Null,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_node_id<T: Into<String>>(mut self, node_id: T) -> Self {
        self.node_id = node_id.into();
        self
    }
}

/// Trait implemented by workflow components.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Component name used in workflow definitions, e.g. `aws.ecs.runTask`.
    fn name(&self) -> &'static str;

    /// Human readable label.
    fn label(&self) -> &'static str;

    /// Channels the component may emit on.
    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL]
    }

    /// Validate configuration ahead of execution. Never touches the network.
    fn setup(&self, configuration: &Value) -> Result<(), AppError>;

    /// Execute the component with resolved configuration.
    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError>;
}
