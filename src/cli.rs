use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "token-transfer-bot")]
#[command(about = "Posts large token transfers seen in a contract's recent logs")]
pub struct Cli {
    /// Settings file (defaults to ./monitor.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// One monitoring cycle: fetch, filter, post
    Run {
        #[arg(long)]
        dry_run: bool,
        #[arg(short, long)]
        max_posts: Option<usize>,
    },
    /// Print qualifying transfers in the lookback window without posting
    Scan {
        #[arg(short, long)]
        lookback: Option<u64>,
    },
    /// Filter a saved eth_getLogs response
    Decode {
        file: PathBuf,
    },
    /// Print the effective settings
    Config,
}
