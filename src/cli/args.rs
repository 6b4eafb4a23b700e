use clap::Args;

#[derive(Args)]
pub struct ListArgs {
    /// Print the catalog as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SetupArgs {
    /// Component name, e.g. cloudflare.createDnsRecord
    #[arg(value_name = "COMPONENT")]
    pub component: String,

    /// Component configuration as inline JSON or @path/to/file.json
    #[arg(long, value_name = "JSON|@FILE")]
    pub config: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Component name, e.g. aws.ecs.runTask
    #[arg(value_name = "COMPONENT")]
    pub component: String,

    /// Component configuration as inline JSON or @path/to/file.json
    #[arg(long, value_name = "JSON|@FILE")]
    pub config: String,

    /// Upstream payload handed to the component (default: null)
    #[arg(long, value_name = "JSON|@FILE")]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Integration name, e.g. grafana
    #[arg(value_name = "INTEGRATION")]
    pub integration: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (default: [server] bind from superplane.toml)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}
