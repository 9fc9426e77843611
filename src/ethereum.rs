use anyhow::Result;
use async_trait::async_trait;
use ethers::prelude::*;
use ethers_core::types::{Filter, H160, U64};
use ethers_providers::{Http, Middleware, Provider};
use std::sync::Arc;

use crate::models::{LookbackWindow, RawLogEntry};

/// Chain head and contract logs for one run.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64>;
    async fn raw_logs(&self, window: &LookbackWindow) -> Result<Vec<RawLogEntry>>;
}

pub struct EthereumClient {
    provider: Arc<Provider<Http>>,
    contract_address: H160,
}

impl EthereumClient {
    pub fn new(rpc_url: &str, contract_address: H160) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let provider = Arc::new(provider);

        Ok(Self {
            provider,
            contract_address,
        })
    }

    pub async fn get_latest_block_number(&self) -> Result<u64> {
        let block_number = self.provider.get_block_number().await?;
        Ok(block_number.as_u64())
    }

    /// Every log the contract emitted from the window start up to `latest`.
    /// No topic filter is sent; event selection happens in the transfer filter.
    pub async fn get_raw_logs(&self, window: &LookbackWindow) -> Result<Vec<RawLogEntry>> {
        let filter = Filter::new()
            .address(self.contract_address)
            .from_block(BlockNumber::Number(U64::from(window.from_block)))
            .to_block(BlockNumber::Latest);

        let logs: Vec<serde_json::Value> = self.provider.request("eth_getLogs", [filter]).await?;
        Ok(RawLogEntry::from_values(logs))
    }
}

#[async_trait]
impl LogSource for EthereumClient {
    async fn latest_block_number(&self) -> Result<u64> {
        self.get_latest_block_number().await
    }

    async fn raw_logs(&self, window: &LookbackWindow) -> Result<Vec<RawLogEntry>> {
        self.get_raw_logs(window).await
    }
}
