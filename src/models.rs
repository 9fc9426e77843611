use anyhow::Result;
use bigdecimal::BigDecimal;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of an `eth_getLogs` result, kept as the node returned it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEntry {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: String,
}

impl RawLogEntry {
    /// Reads a saved `eth_getLogs` response: a bare array or a full JSON-RPC envelope.
    pub fn parse_batch(json: &str) -> Result<Vec<RawLogEntry>> {
        let values = match serde_json::from_str(json)? {
            LogsDocument::Bare(values) => values,
            LogsDocument::Envelope { result } => result,
        };
        Ok(Self::from_values(values))
    }

    /// Converts each log on its own; entries of the wrong shape are logged and skipped.
    pub fn from_values(values: Vec<Value>) -> Vec<RawLogEntry> {
        values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping log {}: {}", index, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LogsDocument {
    Bare(Vec<Value>),
    Envelope { result: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub amount_tokens: BigDecimal,
    pub from_address: String,
    pub to_address: String,
    pub transaction_hash: String,
    pub block_number: String,
    pub event: String,
}

/// Block range scanned by a single run. `to_block` is always the chain head at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookbackWindow {
    pub head: u64,
    pub from_block: u64,
}

impl LookbackWindow {
    pub fn from_head(head: u64, lookback_blocks: u64) -> Self {
        Self {
            head,
            from_block: head.saturating_sub(lookback_blocks),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub window: Option<LookbackWindow>,
    pub logs_fetched: usize,
    pub matched: usize,
    pub posted: usize,
    pub failed: usize,
}
