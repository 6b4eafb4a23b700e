#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::trigger::WebhookRequest;
use crate::core::types::ErrorCategory;
use subtle::ConstantTimeEq;

/// Check `Authorization: Bearer <secret>` when the trigger is configured with a secret.
pub fn verify_bearer(request: &WebhookRequest, secret: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = secret.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    let presented = request
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    let authorized = presented
        .map(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false);
    if authorized {
        Ok(())
    } else {
        Err(
            AppError::new(ErrorCategory::AuthenticationError, "invalid webhook secret")
                .with_code("WEBHOOK-401"),
        )
    }
}
