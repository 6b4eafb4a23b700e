#![allow(clippy::result_large_err)]

use super::IntegrationsConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::net::SocketAddr;
use url::Url;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &IntegrationsConfig) -> Result<(), AppError> {
        if config.http.timeout_seconds == 0 {
            return Err(invalid("http.timeout_seconds must be greater than zero"));
        }
        config
            .server
            .bind
            .parse::<SocketAddr>()
            .map_err(|err| invalid(format!("server.bind is not a socket address: {}", err)))?;
        if config.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes must be greater than zero"));
        }

        if let Some(aws) = &config.aws {
            require("aws.access_key_id", &aws.access_key_id)?;
            require("aws.secret_access_key", &aws.secret_access_key)?;
            require("aws.region", &aws.region)?;
            if let Some(endpoint) = &aws.endpoint {
                require_url("aws.endpoint", endpoint)?;
            }
        }

        if let Some(cloudflare) = &config.cloudflare {
            require("cloudflare.api_token", &cloudflare.api_token)?;
            require_url("cloudflare.base_url", &cloudflare.base_url)?;
        }

        if let Some(dash0) = &config.dash0 {
            require("dash0.api_token", &dash0.api_token)?;
            require_url("dash0.api_url", &dash0.api_url)?;
            require_url("dash0.ingress_url", &dash0.ingress_url)?;
            require("dash0.dataset", &dash0.dataset)?;
        }

        if let Some(daytona) = &config.daytona {
            require("daytona.api_key", &daytona.api_key)?;
            require_url("daytona.base_url", &daytona.base_url)?;
        }

        if let Some(newrelic) = &config.newrelic {
            if newrelic.user_api_key.trim().is_empty() && newrelic.license_key.trim().is_empty() {
                return Err(invalid(
                    "newrelic requires user_api_key, license_key or both",
                ));
            }
            if let Some(url) = &newrelic.graphql_url {
                require_url("newrelic.graphql_url", url)?;
            }
            if let Some(url) = &newrelic.metric_url {
                require_url("newrelic.metric_url", url)?;
            }
        }

        if let Some(grafana) = &config.grafana {
            require("grafana.api_token", &grafana.api_token)?;
            require_url("grafana.base_url", &grafana.base_url)?;
        }

        if let Some(smtp) = &config.smtp {
            require("smtp.host", &smtp.host)?;
            require("smtp.from_address", &smtp.from_address)?;
            if smtp.port == 0 {
                return Err(invalid("smtp.port must be greater than zero"));
            }
            if smtp.username.is_some() != smtp.password.is_some() {
                return Err(invalid(
                    "smtp.username and smtp.password must be set together",
                ));
            }
        }

        Ok(())
    }
}

fn invalid<T: Into<String>>(message: T) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message)
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn require_url(field: &str, value: &str) -> Result<(), AppError> {
    let parsed =
        Url::parse(value).map_err(|err| invalid(format!("{} is not a valid URL: {}", field, err)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("{} must use http or https", field)));
    }
    Ok(())
}
