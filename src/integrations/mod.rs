#![allow(clippy::result_large_err)]

//! Built-in integrations. Each one is registered only when its settings section is present.

pub mod aws;
pub mod cloudflare;
pub mod dash0;
pub mod daytona;
pub mod grafana;
pub mod newrelic;
pub mod smtp;

use crate::core::catalog::{Catalog, CatalogBuilder};
use crate::core::config::IntegrationsConfig;
use crate::core::error::AppError;

/// Register every integration that has a settings section in `config`.
pub fn register_configured(
    builder: &mut CatalogBuilder,
    config: &IntegrationsConfig,
) -> Result<(), AppError> {
    let timeout = config.http.timeout();

    if let Some(settings) = &config.aws {
        builder.register(aws::AwsIntegration::new(settings, timeout)?);
    }
    if let Some(settings) = &config.cloudflare {
        builder.register(cloudflare::CloudflareIntegration::new(settings, timeout));
    }
    if let Some(settings) = &config.dash0 {
        builder.register(dash0::Dash0Integration::new(settings, timeout));
    }
    if let Some(settings) = &config.daytona {
        builder.register(daytona::DaytonaIntegration::new(settings, timeout));
    }
    if let Some(settings) = &config.newrelic {
        builder.register(newrelic::NewRelicIntegration::new(settings, timeout));
    }
    if let Some(settings) = &config.grafana {
        builder.register(grafana::GrafanaIntegration::new(settings, timeout));
    }
    if let Some(settings) = &config.smtp {
        builder.register(smtp::SmtpIntegration::new(settings, timeout)?);
    }

    Ok(())
}

/// Build the catalog for a loaded configuration.
pub fn load_catalog(config: &IntegrationsConfig) -> Result<Catalog, AppError> {
    let mut builder = Catalog::builder();
    register_configured(&mut builder, config)?;
    let catalog = builder.build();
    tracing::debug!(
        integrations = catalog.integrations().count(),
        components = catalog.components().count(),
        triggers = catalog.triggers().count(),
        "catalog loaded"
    );
    Ok(catalog)
}
