use anyhow::Result;
use bigdecimal::BigDecimal;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use ethers_core::types::H160;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{EventSignature, ERC20_TRANSFER_SIGNATURE, ERC404_TRANSFER_SIGNATURE};
use crate::formatter::{default_tiers, MessageTier};

pub const DEFAULT_CONFIG_FILE: &str = "monitor";
pub const ENV_PREFIX: &str = "MONITOR";
const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid contract address {0:?}")]
    ContractAddress(String),
    #[error("invalid signature {name:?}: {reason}")]
    Signature { name: String, reason: String },
    #[error("no event signatures configured")]
    NoSignatures,
    #[error("min_trade_amount must be positive, got {0}")]
    MinTradeAmount(BigDecimal),
    #[error("at least one message tier is required")]
    NoTiers,
    #[error("max_posts_per_run must be at least 1")]
    MaxPosts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSetting {
    pub name: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    #[serde(default = "default_min_trade_amount")]
    pub min_trade_amount: BigDecimal,
    /// ~1 hour of 3 second blocks
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
    #[serde(default = "default_max_posts_per_run")]
    pub max_posts_per_run: usize,
    #[serde(default = "default_post_interval_secs")]
    pub post_interval_secs: u64,
    /// Messages are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_signatures")]
    pub signatures: Vec<SignatureSetting>,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<MessageTier>,
}

fn default_rpc_url() -> String {
    "https://mainnet.evm.nodes.onflow.org".to_string()
}

fn default_contract_address() -> String {
    "0xc8654A7a4BD671D4cEac6096A92a3170FA3b4798".to_string()
}

fn default_min_trade_amount() -> BigDecimal {
    BigDecimal::from(1000)
}

fn default_lookback_blocks() -> u64 {
    1200
}

fn default_max_posts_per_run() -> usize {
    3
}

fn default_post_interval_secs() -> u64 {
    10
}

fn default_signatures() -> Vec<SignatureSetting> {
    vec![
        SignatureSetting {
            name: "ERC-20".to_string(),
            topic: ERC20_TRANSFER_SIGNATURE.to_string(),
        },
        SignatureSetting {
            name: "ERC-404".to_string(),
            topic: ERC404_TRANSFER_SIGNATURE.to_string(),
        },
    ]
}

impl Settings {
    /// Defaults, then `monitor.toml` (or `path`), then `MONITOR_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX));

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.contract()?;
        self.event_signatures()?;

        if self.min_trade_amount <= BigDecimal::from(0) {
            return Err(SettingsError::MinTradeAmount(self.min_trade_amount.clone()));
        }
        if self.tiers.is_empty() {
            return Err(SettingsError::NoTiers);
        }
        if self.max_posts_per_run == 0 {
            return Err(SettingsError::MaxPosts);
        }

        Ok(())
    }

    /// Copy safe to print: the webhook URL carries its own credential.
    pub fn redacted(&self) -> Settings {
        let mut settings = self.clone();
        if settings.webhook_url.is_some() {
            settings.webhook_url = Some(REDACTED.to_string());
        }
        settings
    }

    pub fn contract(&self) -> Result<H160, SettingsError> {
        self.contract_address
            .parse()
            .map_err(|_| SettingsError::ContractAddress(self.contract_address.clone()))
    }

    pub fn event_signatures(&self) -> Result<Vec<EventSignature>, SettingsError> {
        if self.signatures.is_empty() {
            return Err(SettingsError::NoSignatures);
        }

        self.signatures
            .iter()
            .map(|s| {
                EventSignature::parse(&s.name, &s.topic).map_err(|e| SettingsError::Signature {
                    name: s.name.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}
