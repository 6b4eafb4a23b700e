use crate::{
    cli::args::{ListArgs, RunArgs, ServeArgs, SetupArgs, SyncArgs},
    core::{
        serve_webhook, Catalog, ConfigLoader, ConfigValidator, ExecutionContext,
        IntegrationsConfig, TracingSink,
    },
    integrations, Result,
};
use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

pub async fn list(args: ListArgs, workspace: Option<PathBuf>) -> Result<()> {
    let (_, catalog) = load(workspace.as_deref())?;

    if args.json {
        let value = json!({
            "integrations": catalog.integrations().map(|integration| json!({
                "name": integration.name(),
                "label": integration.label(),
            })).collect::<Vec<_>>(),
            "components": catalog.components().map(|component| json!({
                "name": component.name(),
                "label": component.label(),
                "channels": component.output_channels(),
            })).collect::<Vec<_>>(),
            "triggers": catalog.triggers().map(|trigger| json!({
                "name": trigger.name(),
                "label": trigger.label(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No integrations configured. Add credentials to superplane.toml or SUPERPLANE_* variables.");
        return Ok(());
    }
    println!("Integrations:");
    for integration in catalog.integrations() {
        println!("  {:<12} {}", integration.name(), integration.label());
    }
    println!("Components:");
    for component in catalog.components() {
        println!(
            "  {:<32} {:<28} [{}]",
            component.name(),
            component.label(),
            component.output_channels().join(", ")
        );
    }
    println!("Triggers:");
    for trigger in catalog.triggers() {
        println!("  {:<32} {}", trigger.name(), trigger.label());
    }
    Ok(())
}

pub async fn setup(args: SetupArgs, workspace: Option<PathBuf>) -> Result<()> {
    let (_, catalog) = load(workspace.as_deref())?;
    let component = catalog
        .component(&args.component)
        .ok_or_else(|| anyhow!("unknown component: {}", args.component))?;
    let configuration = parse_json_arg("--config", &args.config)?;
    component.setup(&configuration)?;
    println!("{}: configuration is valid", component.name());
    Ok(())
}

pub async fn run(args: RunArgs, workspace: Option<PathBuf>) -> Result<()> {
    let (_, catalog) = load(workspace.as_deref())?;
    let component = catalog
        .component(&args.component)
        .ok_or_else(|| anyhow!("unknown component: {}", args.component))?;
    let configuration = parse_json_arg("--config", &args.config)?;
    let input = match &args.input {
        Some(raw) => parse_json_arg("--input", raw)?,
        None => Value::Null,
    };

    component.setup(&configuration)?;
    let ctx = ExecutionContext::new(configuration)
        .with_input(input)
        .with_node_id(component.name());
    tracing::info!(component = component.name(), execution_id = %ctx.execution_id, "executing component");
    let emission = component.execute(ctx).await?;
    if emission.is_failed() {
        tracing::warn!(component = component.name(), "component emitted on the failed channel");
    }
    println!("{}", serde_json::to_string_pretty(&emission)?);
    Ok(())
}

pub async fn sync(args: SyncArgs, workspace: Option<PathBuf>) -> Result<()> {
    let (_, catalog) = load(workspace.as_deref())?;
    let integration = catalog
        .integration(&args.integration)
        .ok_or_else(|| anyhow!("integration {} is not configured", args.integration))?;
    let details = integration.sync().await?;
    tracing::info!(integration = integration.name(), "credentials verified");
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "integration": integration.name(),
            "details": details,
        }))?
    );
    Ok(())
}

pub async fn serve(args: ServeArgs, workspace: Option<PathBuf>) -> Result<()> {
    let (mut config, catalog) = load(workspace.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
        ConfigValidator::validate(&config)?;
    }
    for trigger in catalog.triggers() {
        trigger.setup(&config.trigger_configuration(trigger.name()))?;
    }
    serve_webhook(catalog, config, Arc::new(TracingSink)).await?;
    Ok(())
}

fn load(workspace: Option<&Path>) -> Result<(IntegrationsConfig, Catalog)> {
    let config = match workspace {
        Some(path) => ConfigLoader::load_from_workspace(path)?,
        None => {
            let mut config = IntegrationsConfig::default();
            ConfigLoader::apply_env_overrides(&mut config);
            config
        }
    };
    ConfigValidator::validate(&config)?;
    let catalog = integrations::load_catalog(&config)?;
    Ok((config, catalog))
}

/// Inline JSON, or `@path` to read it from a file.
fn parse_json_arg(flag: &str, raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {} file {}", flag, path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", flag))
}
