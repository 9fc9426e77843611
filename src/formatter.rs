use anyhow::{ensure, Result};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::models::TransferRecord;

/// A message template used for transfers of at least `min_amount` tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTier {
    pub min_amount: BigDecimal,
    pub template: String,
}

impl MessageTier {
    pub fn new(min_amount: u64, template: &str) -> Self {
        Self {
            min_amount: BigDecimal::from(min_amount),
            template: template.to_string(),
        }
    }
}

pub struct MessageFormatter {
    tiers: Vec<MessageTier>,
}

impl MessageFormatter {
    pub fn new(mut tiers: Vec<MessageTier>) -> Result<Self> {
        ensure!(!tiers.is_empty(), "at least one message tier is required");
        tiers.sort_by(|a, b| b.min_amount.cmp(&a.min_amount));
        Ok(Self { tiers })
    }

    /// Highest tier not above `amount`, or the lowest tier.
    pub fn tier_for(&self, amount: &BigDecimal) -> &MessageTier {
        let lowest = &self.tiers[self.tiers.len() - 1];
        self.tiers
            .iter()
            .find(|tier| &tier.min_amount <= amount)
            .unwrap_or(lowest)
    }

    pub fn format(&self, record: &TransferRecord) -> String {
        self.tier_for(&record.amount_tokens)
            .template
            .replace("{amount}", &whole_tokens(&record.amount_tokens))
            .replace("{event}", &record.event)
            .replace("{from}", &record.from_address)
            .replace("{to}", &record.to_address)
            .replace("{tx}", &record.transaction_hash)
            .replace("{block}", &record.block_number)
    }
}

/// Integer part of `amount`, truncated and grouped with commas: `1234567.9` -> `1,234,567`.
pub fn whole_tokens(amount: &BigDecimal) -> String {
    let (int, _) = amount.with_scale(0).into_bigint_and_exponent();
    let digits = int.to_string();
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

pub fn default_tiers() -> Vec<MessageTier> {
    const CHORUS: &str = "\u{1F3B5} Oh, give me a home, where the $BUFFAFLOW roam... \u{1F3B5}";
    vec![
        MessageTier::new(
            100_000,
            &format!("\u{1F403} MoonBuffaFLOW BOT: \u{1F40B} LIBERTY STAMPEDE! {{amount}} $BUFFAFLOW tokens bought\n\nWhen giants roam the open range for @immutable_type\n\n{}", CHORUS),
        ),
        MessageTier::new(
            20_000,
            &format!("\u{1F403} MoonBuffaFLOW BOT: FREEDOM migration! {{amount}} $BUFFAFLOW tokens bought\n\nThe bulls charge across the range for @immutable_type\n\n{}", CHORUS),
        ),
        MessageTier::new(
            5_000,
            &format!("\u{1F403} MoonBuffaFLOW BOT: Big stampede! {{amount}} $BUFFAFLOW tokens bought\n\nSomeone's claiming territory for @immutable_type\n\n{}", CHORUS),
        ),
        MessageTier::new(
            0,
            &format!("\u{1F403} MoonBuffaFLOW BOT: {{amount}} $BUFFAFLOW tokens bought\n\nThe herd roams for @immutable_type\n\n{}", CHORUS),
        ),
    ]
}
