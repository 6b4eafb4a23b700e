use super::client::{CloudflareClient, Ruleset};
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

const NAME: &str = "cloudflare.createRedirectRule";
const PAYLOAD_TYPE: &str = "cloudflare.redirectRule";
pub const REDIRECT_PHASE: &str = "http_request_dynamic_redirect";
const STATUS_CODES: &[u16] = &[301, 302, 307, 308];
const DEFAULT_STATUS_CODE: u16 = 302;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRedirectRuleSpec {
    #[serde(default)]
    zone_id: String,
    #[serde(default)]
    target_url: String,
    expression: Option<String>,
    source_host: Option<String>,
    source_path: Option<String>,
    status_code: Option<u16>,
    #[serde(default)]
    preserve_query_string: bool,
    description: Option<String>,
    enabled: Option<bool>,
}

impl CreateRedirectRuleSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: CreateRedirectRuleSpec = decode_configuration(NAME, configuration)?;
        if spec.zone_id.trim().is_empty() {
            return Err(AppError::validation("zoneId is required"));
        }
        let target = spec.target_url.trim();
        if target.is_empty() {
            return Err(AppError::validation("targetUrl is required"));
        }
        let parsed = Url::parse(target)
            .map_err(|err| AppError::validation(format!("targetUrl is not a valid URL: {}", err)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::validation("targetUrl must use http or https"));
        }
        if !STATUS_CODES.contains(&spec.status_code()) {
            return Err(AppError::validation(
                "statusCode must be one of 301, 302, 307, 308",
            ));
        }
        spec.expression()?;
        Ok(spec)
    }

    fn status_code(&self) -> u16 {
        self.status_code.unwrap_or(DEFAULT_STATUS_CODE)
    }

    fn expression(&self) -> Result<String, AppError> {
        if let Some(expression) = non_blank(self.expression.as_deref()) {
            return Ok(expression.to_string());
        }
        let Some(host) = non_blank(self.source_host.as_deref()) else {
            return Err(AppError::validation(
                "either expression or sourceHost is required",
            ));
        };
        Ok(match non_blank(self.source_path.as_deref()) {
            Some(path) => format!(
                "(http.host eq \"{}\" and starts_with(http.request.uri.path, \"{}\"))",
                quote(host),
                quote(path)
            ),
            None => format!("(http.host eq \"{}\")", quote(host)),
        })
    }

    fn rule(&self) -> Result<Value, AppError> {
        let expression = self.expression()?;
        let description = non_blank(self.description.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Redirect to {}", self.target_url.trim()));
        Ok(json!({
            "action": "redirect",
            "expression": expression,
            "description": description,
            "enabled": self.enabled.unwrap_or(true),
            "action_parameters": {
                "from_value": {
                    "target_url": { "value": self.target_url.trim() },
                    "status_code": self.status_code(),
                    "preserve_query_string": self.preserve_query_string,
                }
            }
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Escape a value for a double-quoted string in the Rules language.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The rule just created: the one carrying our expression, else the last one.
fn created_rule<'a>(ruleset: &'a Ruleset, expression: &str) -> Option<&'a Value> {
    ruleset
        .rules
        .iter()
        .rev()
        .find(|rule| rule.get("expression").and_then(Value::as_str) == Some(expression))
        .or_else(|| ruleset.rules.last())
}

pub struct CreateRedirectRule {
    client: Arc<CloudflareClient>,
}

impl CreateRedirectRule {
    pub fn new(client: Arc<CloudflareClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for CreateRedirectRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Create Redirect Rule"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        CreateRedirectRuleSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = CreateRedirectRuleSpec::parse(&ctx.configuration)?;
        let zone_id = spec.zone_id.trim();
        let rule = spec.rule()?;
        let expression = spec.expression()?;

        let created = match self.client.get_phase_entrypoint(zone_id, REDIRECT_PHASE).await {
            Ok(entrypoint) => {
                tracing::info!(zone = %zone_id, ruleset = %entrypoint.id, "adding redirect rule");
                self.client
                    .add_ruleset_rule(zone_id, &entrypoint.id, &rule)
                    .await
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(zone = %zone_id, "creating redirect entrypoint ruleset");
                self.client
                    .put_phase_entrypoint(zone_id, REDIRECT_PHASE, &json!({ "rules": [rule] }))
                    .await
            }
            Err(err) => Err(err),
        };

        let ruleset = match created {
            Ok(ruleset) => ruleset,
            Err(err) if err.is_validation_failure() => {
                tracing::warn!(error = %err, "Cloudflare rejected redirect rule");
                return Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()));
            }
            Err(err) => return Err(err.into()),
        };

        let created = created_rule(&ruleset, &expression).cloned().unwrap_or(Value::Null);
        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "rulesetId": ruleset.id,
                "id": created.get("id").cloned().unwrap_or(Value::Null),
                "expression": expression,
                "description": created.get("description").cloned().unwrap_or(Value::Null),
                "enabled": created.get("enabled").cloned().unwrap_or(Value::Null),
                "targetUrl": spec.target_url.trim(),
                "statusCode": spec.status_code(),
                "preserveQueryString": spec.preserve_query_string,
            }),
        ))
    }
}
