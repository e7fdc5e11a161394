use anyhow::Result;
use clap::Parser;

use callassist::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    callassist_logging::init_tracing(&cli.log_level)?;

    callassist::run(cli).await
}
