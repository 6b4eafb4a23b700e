use serde_json::json;
use superplane_integrations::core::error::AppError;
use superplane_integrations::core::payload::{Emission, Payload};
use superplane_integrations::core::types::{ErrorCategory, ErrorSeverity};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_with_category() {
        let error = AppError::new(ErrorCategory::ValidationError, "zoneId is required");
        assert_eq!(error.category, ErrorCategory::ValidationError);
        assert_eq!(error.severity, ErrorSeverity::Error);
        assert_eq!(error.message, "zoneId is required");
        assert!(error.code.starts_with("ERR-"));
    }

    #[test]
    fn test_validation_shorthand() {
        let error = AppError::validation("ttl must be 1 or between 60 and 86400");
        assert_eq!(error.category, ErrorCategory::ValidationError);
    }

    #[test]
    fn test_error_with_context_and_code() {
        let mut error = AppError::new(ErrorCategory::ApiError, "request rejected")
            .with_code("CLOUDFLARE-HTTP-500")
            .with_context("status", "500");
        error.add_context("zone", "zone-1");

        assert_eq!(error.code, "CLOUDFLARE-HTTP-500");
        assert_eq!(error.context.get("zone"), Some(&"zone-1".to_string()));
        let rendered = error.to_string();
        assert!(rendered.starts_with("[CLOUDFLARE-HTTP-500] ApiError: request rejected"));
        assert!(rendered.contains("Context"));
    }

    #[test]
    fn test_conversions_keep_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: AppError = json_error.into();
        assert_eq!(error.category, ErrorCategory::SerializationError);
        assert_eq!(error.code, "JSON_ERROR");
        assert!(error.source.is_some());

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: AppError = io_error.into();
        assert_eq!(error.category, ErrorCategory::IoError);

        let error: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(error.category, ErrorCategory::InternalError);
        assert_eq!(error.code, "ANYHOW_ERROR");
    }

    #[test]
    fn test_emission_serializes_channel_and_typed_payloads() {
        let emission = Emission::failed("daytona.sandbox", json!({"status": 404}));
        let value = serde_json::to_value(&emission).unwrap();
        assert_eq!(value["channel"], "failed");
        assert_eq!(value["payloads"][0]["type"], "daytona.sandbox");
        assert_eq!(value["payloads"][0]["data"]["status"], 404);
        let timestamp = value["payloads"][0]["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert_eq!(timestamp.len(), "2024-03-01T10:00:00.000Z".len());
    }

    #[test]
    fn test_empty_emission_has_null_data() {
        let emission = Emission {
            channel: "default".to_string(),
            payloads: Vec::<Payload>::new(),
        };
        assert!(emission.data().is_null());
        assert!(emission.payload_type().is_none());
        assert!(!emission.is_failed());
    }
}
