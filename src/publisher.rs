use anyhow::{bail, Result};
use log::info;
use reqwest::Client;
use serde_json::json;

/// Where formatted messages go.
pub enum Publisher {
    DryRun,
    Webhook { client: Client, url: String },
}

impl Publisher {
    pub fn new(webhook_url: Option<String>, dry_run: bool) -> Self {
        match webhook_url {
            Some(url) if !dry_run => Self::Webhook {
                client: Client::new(),
                url,
            },
            _ => Self::DryRun,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }

    pub async fn publish(&self, text: &str) -> Result<()> {
        match self {
            Self::DryRun => {
                info!("[dry-run] {}", text);
                Ok(())
            }
            Self::Webhook { client, url } => {
                let response = client.post(url).json(&json!({ "content": text })).send().await?;
                if !response.status().is_success() {
                    bail!("webhook returned {}", response.status());
                }
                Ok(())
            }
        }
    }
}
