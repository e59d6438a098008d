use ai_routing_engine::cli::{self, Cli};
use ai_routing_engine::config::AppConfig;
use ai_routing_engine::infrastructure::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    cli::run(cli, &config).await
}
