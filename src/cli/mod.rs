//! Command-line entry points

pub mod demo;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::PricingCatalog;

#[derive(Debug, Parser)]
#[command(name = "llm-revenue-analyzer", about = "Tenant LLM cost/revenue analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Seed synthetic traffic into in-memory stores and print reports
    Demo(DemoArgs),
    /// Load a pricing catalog and report what it contains
    ValidatePricing(ValidatePricingArgs),
}

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Override the number of seeded days
    #[arg(long)]
    pub days: Option<u32>,
    /// Override the RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ValidatePricingArgs {
    /// Pricing file to validate (defaults to the configured one)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub fn validate_pricing(config: &AppConfig, args: ValidatePricingArgs) -> anyhow::Result<()> {
    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(&config.pricing.file));
    let catalog = PricingCatalog::from_path(&path)?;
    println!("{} OK: {} models priced", path.display(), catalog.len());
    let mut entries: Vec<_> = catalog
        .models()
        .map(|m| format!("  {}/{} in={} out={} {}", m.provider, m.model, m.input_per_1k_tokens, m.output_per_1k_tokens, m.currency))
        .collect();
    entries.sort();
    for entry in entries {
        println!("{entry}");
    }
    Ok(())
}
