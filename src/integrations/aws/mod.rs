//! Amazon Web Services integration. Only ECS is exposed today.

pub mod ecs;
pub mod signer;

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::integration::Integration;
use async_trait::async_trait;
use ecs::{DescribeTask, EcsClient, RunTask, StopTask};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Credentials and region for the AWS integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    pub region: String,
    /// Overrides `https://ecs.<region>.amazonaws.com/`, e.g. for LocalStack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

pub struct AwsIntegration {
    ecs: Arc<EcsClient>,
}

impl AwsIntegration {
    pub fn new(settings: &AwsSettings, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            ecs: Arc::new(EcsClient::new(settings, timeout)?),
        })
    }

    pub fn ecs(&self) -> Arc<EcsClient> {
        self.ecs.clone()
    }
}

#[async_trait]
impl Integration for AwsIntegration {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn label(&self) -> &'static str {
        "AWS"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let clusters = self.ecs.list_clusters(1).await?;
        Ok(json!({
            "region": self.ecs.region(),
            "clusterArns": clusters.cluster_arns,
        }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(RunTask::new(self.ecs.clone())),
            Arc::new(StopTask::new(self.ecs.clone())),
            Arc::new(DescribeTask::new(self.ecs.clone())),
        ]
    }
}
