use clap::Parser;
use codeintel::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    codeintel::logging::init();
    let cli = Cli::parse();
    run(cli).await
}
