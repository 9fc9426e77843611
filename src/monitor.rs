use anyhow::Result;
use chrono::Utc;
use log::{error, info, warn};
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    config::Settings,
    ethereum::{EthereumClient, LogSource},
    filter::TransferFilter,
    formatter::MessageFormatter,
    models::{LookbackWindow, RunSummary, TransferRecord},
    publisher::Publisher,
};

pub struct Monitor<S: LogSource = EthereumClient> {
    source: S,
    filter: TransferFilter,
    formatter: MessageFormatter,
    publisher: Publisher,
    settings: Settings,
}

impl Monitor<EthereumClient> {
    pub fn new(settings: Settings, publisher: Publisher) -> Result<Self> {
        let ethereum_client = EthereumClient::new(&settings.rpc_url, settings.contract()?)?;
        Self::with_source(ethereum_client, settings, publisher)
    }
}

impl<S: LogSource> Monitor<S> {
    pub fn with_source(source: S, settings: Settings, publisher: Publisher) -> Result<Self> {
        let filter = build_filter(&settings)?;
        let formatter = MessageFormatter::new(settings.tiers.clone())?;

        Ok(Self {
            source,
            filter,
            formatter,
            publisher,
            settings,
        })
    }

    /// Fetches and filters the lookback window ending at the current head.
    /// A failed retrieval is logged and yields no transfers.
    pub async fn scan(&self, lookback_blocks: u64) -> Result<(LookbackWindow, usize, Vec<TransferRecord>)> {
        let head = self.source.latest_block_number().await?;
        let window = LookbackWindow::from_head(head, lookback_blocks);
        info!(
            "Scanning {} from block {} to latest (head {})",
            self.settings.contract_address, window.from_block, window.head
        );

        let logs = match self.source.raw_logs(&window).await {
            Ok(logs) => logs,
            Err(e) => {
                error!("Failed to fetch logs: {}", e);
                Vec::new()
            }
        };
        info!("Fetched {} logs", logs.len());

        let transfers = self.filter.apply(&logs);
        info!("Found {} significant transfers", transfers.len());

        Ok((window, logs.len(), transfers))
    }

    pub async fn run_once(&self, max_posts: Option<usize>) -> Result<RunSummary> {
        info!(
            "Monitoring {} at {} (min trade amount {})",
            self.settings.contract_address,
            Utc::now(),
            self.settings.min_trade_amount
        );

        let (window, logs_fetched, transfers) = self.scan(self.settings.lookback_blocks).await?;
        let limit = max_posts.unwrap_or(self.settings.max_posts_per_run);

        let mut summary = RunSummary {
            window: Some(window),
            logs_fetched,
            matched: transfers.len(),
            ..Default::default()
        };

        for transfer in transfers.iter().take(limit) {
            let message = self.formatter.format(transfer);

            match self.publisher.publish(&message).await {
                Ok(()) => {
                    summary.posted += 1;
                    info!("Posted transfer {} ({} tokens)", transfer.transaction_hash, transfer.amount_tokens);
                    if !self.publisher.is_dry_run() {
                        sleep(Duration::from_secs(self.settings.post_interval_secs)).await;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to post transfer {}: {}", transfer.transaction_hash, e);
                }
            }
        }

        if summary.posted == 0 {
            info!("No significant activity posted in the search window");
        } else {
            info!("Posted {} of {} significant transfers", summary.posted, summary.matched);
        }

        Ok(summary)
    }
}

pub fn build_filter(settings: &Settings) -> Result<TransferFilter> {
    Ok(TransferFilter::new(
        settings.event_signatures()?,
        settings.min_trade_amount.clone(),
    ))
}
