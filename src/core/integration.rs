#![allow(clippy::result_large_err)]

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::trigger::Trigger;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A configured connection to a third-party API exposing components and triggers.
#[async_trait]
pub trait Integration: Send + Sync + 'static {
    /// Integration name, e.g. `cloudflare`.
    fn name(&self) -> &'static str;

    fn label(&self) -> &'static str;

    /// Verify credentials with one cheap read call and return what was learned.
    async fn sync(&self) -> Result<Value, AppError>;

    fn components(&self) -> Vec<Arc<dyn Component>>;

    fn triggers(&self) -> Vec<Arc<dyn Trigger>> {
        Vec::new()
    }
}
