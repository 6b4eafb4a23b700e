pub mod args;
pub mod commands;

pub use args::{ListArgs, RunArgs, ServeArgs, SetupArgs, SyncArgs};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
CATALOG COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "superplane-integrations")]
#[command(version = crate::VERSION)]
#[command(about = "Run SuperPlane integration components and serve trigger webhooks")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Credentials come from superplane.toml in the workspace and SUPERPLANE_* environment variables."
)]
pub struct Args {
    /// Workspace containing superplane.toml (default: current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Explicit `--workspace`, falling back to the current directory.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace.clone().or_else(|| env::current_dir().ok())
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "List configured integrations, components and triggers",
        long_about = "List shows every integration that has credentials configured, with the components and triggers it contributes.",
        after_help = "Example:\n    superplane-integrations list --json"
    )]
    List(ListArgs),
    #[command(
        about = "Validate a component configuration",
        long_about = "Setup runs the component's configuration checks without calling any remote API.",
        after_help = "Example:\n    superplane-integrations setup cloudflare.createDnsRecord --config @record.json"
    )]
    Setup(SetupArgs),
    #[command(
        about = "Execute a component once",
        long_about = "Run executes the component against the live API and prints the emitted channel and payloads as JSON.",
        after_help = "Example:\n    superplane-integrations run aws.ecs.describeTask --config '{\"cluster\":\"prod\",\"task\":\"0abc\"}'"
    )]
    Run(RunArgs),
    #[command(
        about = "Verify integration credentials",
        long_about = "Sync performs one cheap read call with the configured credentials and prints what it learned.",
        after_help = "Example:\n    superplane-integrations sync grafana"
    )]
    Sync(SyncArgs),
    #[command(
        about = "Serve trigger webhooks",
        long_about = "Serve starts the HTTP listener that accepts POST /v1/webhooks/<trigger> callbacks and turns them into events.",
        after_help = "Example:\n    superplane-integrations serve --bind 0.0.0.0:8686"
    )]
    Serve(ServeArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.workspace_root();
    match args.command {
        Command::List(list_args) => commands::list(list_args, workspace).await,
        Command::Setup(setup_args) => commands::setup(setup_args, workspace).await,
        Command::Run(run_args) => commands::run(run_args, workspace).await,
        Command::Sync(sync_args) => commands::sync(sync_args, workspace).await,
        Command::Serve(serve_args) => commands::serve(serve_args, workspace).await,
    }
}
