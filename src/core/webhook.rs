#![allow(clippy::result_large_err)]

use crate::core::catalog::Catalog;
use crate::core::config::IntegrationsConfig;
use crate::core::error::AppError;
use crate::core::payload::Payload;
use crate::core::trigger::WebhookRequest;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::util::MapResponseLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

/// Receives the events produced by triggers.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn publish(&self, trigger: &str, payloads: &[Payload]) -> Result<(), AppError>;
}

/// Sink that only logs each event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn publish(&self, trigger: &str, payloads: &[Payload]) -> Result<(), AppError> {
        for payload in payloads {
            info!(
                trigger,
                payload_type = %payload.payload_type,
                data = %payload.data,
                "trigger event"
            );
        }
        Ok(())
    }
}

struct WebhookState {
    catalog: Catalog,
    config: IntegrationsConfig,
    sink: Arc<dyn EventSink>,
}

/// Start the trigger webhook listener and block until the service terminates.
pub async fn serve_webhook(
    catalog: Catalog,
    config: IntegrationsConfig,
    sink: Arc<dyn EventSink>,
) -> Result<(), AppError> {
    serve_webhook_internal(catalog, config, sink, None).await
}

/// Start the listener and notify once the bind address is known (test helper).
pub async fn serve_webhook_with_ready_notifier(
    catalog: Catalog,
    config: IntegrationsConfig,
    sink: Arc<dyn EventSink>,
    ready_notifier: oneshot::Sender<SocketAddr>,
) -> Result<(), AppError> {
    serve_webhook_internal(catalog, config, sink, Some(ready_notifier)).await
}

async fn serve_webhook_internal(
    catalog: Catalog,
    config: IntegrationsConfig,
    sink: Arc<dyn EventSink>,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let bind = config.server.bind.clone();
    let bind_addr: SocketAddr = bind.parse().map_err(|err| {
        AppError::new(
            ErrorCategory::ConfigurationError,
            format!("invalid webhook bind address {}: {}", bind, err),
        )
    })?;
    let max_body_bytes = config.server.max_body_bytes;
    let state = Arc::new(WebhookState {
        catalog,
        config,
        sink,
    });
    let router = Router::new()
        .route("/v1/webhooks/{trigger}", post(handle_webhook))
        .layer(Extension(state))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(MapResponseLayer::new(|mut response: Response<Body>| {
            if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
                let body = json!({
                    "error": {
                        "code": "WEBHOOK-413",
                        "message": "payload too large"
                    }
                })
                .to_string();
                *response.body_mut() = Body::from(body);
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            response
        }));
    let listener = TcpListener::bind(bind_addr).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to bind webhook listener {}: {}", bind_addr, err),
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to determine webhook listener address: {}", err),
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!("webhook server listening on {}", local_addr);
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("webhook server terminated: {}", err),
            )
        })
}

async fn handle_webhook(
    Extension(state): Extension<Arc<WebhookState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookRejection> {
    let trigger = state
        .catalog
        .trigger(&name)
        .ok_or_else(|| WebhookRejection::not_found(&name))?;

    let mut request = WebhookRequest::new(body.to_vec(), state.config.trigger_configuration(&name));
    for (header_name, value) in &headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(header_name.as_str(), value);
        }
    }

    let payloads = trigger
        .handle_webhook(request)
        .await
        .map_err(WebhookRejection::from_error)?;
    tracing::debug!(trigger = %name, events = payloads.len(), "webhook handled");
    state
        .sink
        .publish(&name, &payloads)
        .await
        .map_err(WebhookRejection::from_error)?;

    Ok(Json(json!({
        "trigger": name,
        "events": payloads.len(),
        "payloads": payloads,
    })))
}

struct WebhookRejection {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl WebhookRejection {
    fn not_found(trigger: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "WEBHOOK-404",
            message: format!("unknown trigger: {}", trigger),
        }
    }

    fn from_error(err: AppError) -> Self {
        match err.category {
            ErrorCategory::AuthenticationError => Self {
                status: StatusCode::UNAUTHORIZED,
                code: "WEBHOOK-401",
                message: err.message,
            },
            ErrorCategory::ValidationError | ErrorCategory::SerializationError => Self {
                status: StatusCode::BAD_REQUEST,
                code: "WEBHOOK-400",
                message: err.message,
            },
            _ => {
                tracing::error!("webhook handling error: {}", err);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "WEBHOOK-500",
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response<Body> {
        let mut resp = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message
            }
        }))
        .into_response();
        *resp.status_mut() = self.status;
        resp
    }
}
