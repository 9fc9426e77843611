mod cli;
mod config;
mod ethereum;
mod filter;
mod formatter;
mod models;
mod monitor;
mod publisher;

use anyhow::Result;
use clap::Parser;
use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::formatter::MessageFormatter;
use crate::models::RawLogEntry;
use crate::monitor::Monitor;
use crate::publisher::Publisher;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { dry_run, max_posts } => {
            let publisher = Publisher::new(settings.webhook_url.clone(), dry_run);
            let monitor = Monitor::new(settings, publisher)?;
            let summary = monitor.run_once(max_posts).await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Scan { lookback } => {
            let lookback = lookback.unwrap_or(settings.lookback_blocks);
            let monitor = Monitor::new(settings, Publisher::DryRun)?;
            let (window, logs_fetched, transfers) = monitor.scan(lookback).await?;

            println!(
                "Blocks {}..latest (head {}): {} logs, {} significant transfers",
                window.from_block,
                window.head,
                logs_fetched,
                transfers.len()
            );
            for transfer in transfers {
                println!("{}", serde_json::to_string_pretty(&transfer)?);
            }
        }
        Commands::Decode { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let logs = RawLogEntry::parse_batch(&contents)?;
            let filter = monitor::build_filter(&settings)?;
            let formatter = MessageFormatter::new(settings.tiers.clone())?;

            let transfers = filter.apply(&logs);
            println!("{} logs, {} significant transfers", logs.len(), transfers.len());
            for transfer in transfers {
                println!("{}", serde_json::to_string_pretty(&transfer)?);
                println!("{}\n", formatter.format(&transfer));
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        }
    }

    Ok(())
}
