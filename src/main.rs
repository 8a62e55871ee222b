use clap::Parser;
use llm_revenue_analyzer::cli::{self, Cli, Command};
use llm_revenue_analyzer::config::AppConfig;
use llm_revenue_analyzer::infrastructure::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    match cli.command {
        Command::Demo(args) => cli::demo::run(&config, args).await,
        Command::ValidatePricing(args) => cli::validate_pricing(&config, args),
    }
}
