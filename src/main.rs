use clap::Parser;
use superplane_integrations::{cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let workspace = args.workspace_root();
    let _guard = logging::init(&args.command, workspace.as_deref())?;
    cli::run(args).await
}
