use super::NewRelicClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::Emission;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "newrelic.runNrqlQuery";
const PAYLOAD_TYPE: &str = "newrelic.nrqlResult";

const NRQL_QUERY: &str = "query($accountId: Int!, $nrql: Nrql!) { actor { account(id: $accountId) { nrql(query: $nrql) { results } } } }";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunNrqlQuerySpec {
    #[serde(default)]
    query: String,
    account_id: Option<u64>,
}

impl RunNrqlQuerySpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: RunNrqlQuerySpec = decode_configuration(NAME, configuration)?;
        if spec.query.trim().is_empty() {
            return Err(AppError::validation("query is required"));
        }
        Ok(spec)
    }
}

pub struct RunNrqlQuery {
    client: Arc<NewRelicClient>,
}

impl RunNrqlQuery {
    pub fn new(client: Arc<NewRelicClient>) -> Self {
        Self { client }
    }

    fn account_id(&self, spec: &RunNrqlQuerySpec) -> Result<u64, AppError> {
        spec.account_id
            .or_else(|| self.client.account_id())
            .ok_or_else(|| {
                AppError::validation(
                    "accountId is required when the integration has no account_id",
                )
            })
    }
}

#[async_trait]
impl Component for RunNrqlQuery {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Run NRQL Query"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        let spec = RunNrqlQuerySpec::parse(configuration)?;
        self.account_id(&spec).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = RunNrqlQuerySpec::parse(&ctx.configuration)?;
        let account_id = self.account_id(&spec)?;
        let query = spec.query.trim();
        tracing::debug!(account_id, "running NRQL query");

        let data = self
            .client
            .graphql(NRQL_QUERY, json!({ "accountId": account_id, "nrql": query }))
            .await?;
        let results = data
            .pointer("/actor/account/nrql/results")
            .cloned()
            .unwrap_or_else(|| json!([]));

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "query": query,
                "accountId": account_id,
                "results": results,
            }),
        ))
    }
}
