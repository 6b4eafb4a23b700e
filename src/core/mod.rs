pub mod catalog;
pub mod component;
pub mod config;
pub mod error;
pub mod helpers;
pub mod http;
pub mod integration;
pub mod payload;
pub mod trigger;
pub mod types;
pub mod webhook;

pub use catalog::{Catalog, CatalogBuilder};
pub use component::{Component, ExecutionContext};
pub use config::{ConfigLoader, ConfigValidator, IntegrationsConfig};
pub use error::AppError;
pub use integration::Integration;
pub use payload::{Emission, Payload, DEFAULT_CHANNEL, FAILED_CHANNEL};
pub use trigger::{Trigger, WebhookRequest};
pub use types::*;
pub use webhook::{serve_webhook, serve_webhook_with_ready_notifier, EventSink, TracingSink};
