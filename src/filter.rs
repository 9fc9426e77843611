use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;
use ethers_core::types::{H160, H256};
use log::{debug, warn};
use thiserror::Error;

use crate::models::{RawLogEntry, TransferRecord};

pub const TOKEN_DECIMALS: i64 = 18;

/// keccak256("Transfer(address,address,uint256)")
pub const ERC20_TRANSFER_SIGNATURE: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Transfer variant emitted by ERC-404 contracts for the fungible side.
pub const ERC404_TRANSFER_SIGNATURE: &str =
    "0xe59fdd36d0d223c0c7d996db7ad796880f45e1936cb0bb7ac102e7082e031487";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed topic {0:?}")]
    MalformedTopic(String),
    #[error("malformed data {0:?}")]
    MalformedData(String),
}

/// A topic0 value accepted as a transfer, with the label used in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignature {
    pub name: String,
    pub topic: H256,
}

impl EventSignature {
    pub fn parse(name: &str, topic: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            name: name.to_string(),
            topic: parse_topic(topic)?,
        })
    }
}

pub struct TransferFilter {
    signatures: Vec<EventSignature>,
    min_trade_amount: BigDecimal,
}

impl TransferFilter {
    pub fn new(signatures: Vec<EventSignature>, min_trade_amount: BigDecimal) -> Self {
        Self {
            signatures,
            min_trade_amount,
        }
    }

    /// Keeps the entries that decode to a qualifying transfer, in input order.
    /// Malformed entries are logged and skipped.
    pub fn apply(&self, entries: &[RawLogEntry]) -> Vec<TransferRecord> {
        let mut records = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match self.decode(entry) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(
                    "Skipping log {} (tx {}): {}",
                    index, entry.transaction_hash, e
                ),
            }
        }

        debug!("{} of {} logs matched", records.len(), entries.len());
        records
    }

    /// `Ok(None)` means the entry is well formed but not a qualifying transfer.
    pub fn decode(&self, entry: &RawLogEntry) -> Result<Option<TransferRecord>, DecodeError> {
        if entry.topics.len() < 3 {
            return Ok(None);
        }

        let topic0 = parse_topic(&entry.topics[0])?;
        let Some(signature) = self.signatures.iter().find(|s| s.topic == topic0) else {
            return Ok(None);
        };

        let Some(amount_tokens) = parse_amount(&entry.data)? else {
            debug!("{}: {} has no amount", signature.name, entry.transaction_hash);
            return Ok(None);
        };

        let from = topic_address(&entry.topics[1])?;
        let to = topic_address(&entry.topics[2])?;

        if amount_tokens < self.min_trade_amount {
            debug!(
                "{}: {} below threshold ({} < {})",
                signature.name, entry.transaction_hash, amount_tokens, self.min_trade_amount
            );
            return Ok(None);
        }

        if from.is_zero() || to.is_zero() {
            debug!("{}: {} is a mint/burn", signature.name, entry.transaction_hash);
            return Ok(None);
        }

        Ok(Some(TransferRecord {
            amount_tokens,
            from_address: format!("0x{:x}", from),
            to_address: format!("0x{:x}", to),
            transaction_hash: entry.transaction_hash.clone(),
            block_number: entry.block_number.clone(),
            event: signature.name.clone(),
        }))
    }
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

pub fn parse_topic(value: &str) -> Result<H256, DecodeError> {
    let bytes = hex::decode(strip_hex_prefix(value))
        .map_err(|_| DecodeError::MalformedTopic(value.to_string()))?;
    if bytes.len() != 32 {
        return Err(DecodeError::MalformedTopic(value.to_string()));
    }
    Ok(H256::from_slice(&bytes))
}

/// Low-order 20 bytes of an indexed address topic.
fn topic_address(value: &str) -> Result<H160, DecodeError> {
    parse_topic(value).map(H160::from)
}

/// Big-endian unsigned integer scaled down by 10^18. Empty data and the bare `0x` marker yield `None`.
pub fn parse_amount(data: &str) -> Result<Option<BigDecimal>, DecodeError> {
    let digits = strip_hex_prefix(data.trim());
    if digits.is_empty() {
        return Ok(None);
    }

    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        padded.as_str()
    } else {
        digits
    };

    let bytes = hex::decode(digits).map_err(|_| DecodeError::MalformedData(data.to_string()))?;
    let raw = BigInt::from_bytes_be(Sign::Plus, &bytes);
    Ok(Some(BigDecimal::new(raw, TOKEN_DECIMALS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const FROM: &str = "0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const TO: &str = "0x000000000000000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const ZERO: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
    const THOUSAND_TOKENS: &str =
        "0x0000000000000000000000000000000000000000000000000000003635c9adc5dea00000";

    fn filter(min: &str) -> TransferFilter {
        TransferFilter::new(
            vec![
                EventSignature::parse("ERC-20", ERC20_TRANSFER_SIGNATURE).unwrap(),
                EventSignature::parse("ERC-404", ERC404_TRANSFER_SIGNATURE).unwrap(),
            ],
            BigDecimal::from_str(min).unwrap(),
        )
    }

    fn entry(topics: &[&str], data: &str, tx: &str) -> RawLogEntry {
        RawLogEntry {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            data: data.to_string(),
            transaction_hash: tx.to_string(),
            block_number: "0x1b4".to_string(),
        }
    }

    fn transfer(data: &str, tx: &str) -> RawLogEntry {
        entry(&[ERC20_TRANSFER_SIGNATURE, FROM, TO], data, tx)
    }

    #[test]
    fn thousand_tokens_at_threshold_is_kept() {
        let record = filter("1000")
            .decode(&transfer(THOUSAND_TOKENS, "0x01"))
            .unwrap()
            .unwrap();

        assert_eq!(record.amount_tokens, BigDecimal::from(1000));
        assert_eq!(record.from_address, "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(record.to_address, "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert_eq!(record.block_number, "0x1b4");
        assert_eq!(record.event, "ERC-20");
    }

    #[test]
    fn one_wei_below_threshold_is_dropped() {
        // 10^21 - 1 wei
        let data = "0x3635c9adc5de9fffff";
        assert!(filter("1000").decode(&transfer(data, "0x01")).unwrap().is_none());
    }

    #[test]
    fn amount_is_exact_for_large_values() {
        // 10^30 + 1 wei: one trillion tokens plus a single wei
        let data = "0x0c9f2c9cd04674edea40000001";
        let amount = parse_amount(data).unwrap().unwrap();
        assert_eq!(
            amount,
            BigDecimal::from_str("1000000000000.000000000000000001").unwrap()
        );
    }

    #[test]
    fn odd_length_data_is_accepted() {
        assert_eq!(
            parse_amount("0xde0b6b3a7640000").unwrap(),
            Some(BigDecimal::from(1))
        );
    }

    #[test]
    fn empty_data_has_no_amount() {
        assert_eq!(parse_amount("").unwrap(), None);
        assert_eq!(parse_amount("0x").unwrap(), None);
    }

    #[test]
    fn unknown_signature_is_ignored() {
        let other = "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925";
        let log = entry(&[other, FROM, TO], THOUSAND_TOKENS, "0x01");
        assert!(filter("1").decode(&log).unwrap().is_none());
    }

    #[test]
    fn signature_match_ignores_case() {
        let upper = ERC20_TRANSFER_SIGNATURE.to_uppercase().replacen("0X", "0x", 1);
        let log = entry(&[&upper, FROM, TO], THOUSAND_TOKENS, "0x01");
        assert!(filter("1").decode(&log).unwrap().is_some());
    }

    #[test]
    fn erc404_variant_is_labelled() {
        let log = entry(&[ERC404_TRANSFER_SIGNATURE, FROM, TO], THOUSAND_TOKENS, "0x01");
        let record = filter("1").decode(&log).unwrap().unwrap();
        assert_eq!(record.event, "ERC-404");
    }

    #[test]
    fn fewer_than_three_topics_is_not_a_transfer() {
        let log = entry(&[ERC20_TRANSFER_SIGNATURE, FROM], THOUSAND_TOKENS, "0x01");
        assert!(filter("1").decode(&log).unwrap().is_none());
    }

    #[test]
    fn mint_and_burn_are_excluded() {
        let f = filter("1");
        let mint = entry(&[ERC20_TRANSFER_SIGNATURE, ZERO, TO], THOUSAND_TOKENS, "0x01");
        let burn = entry(&[ERC20_TRANSFER_SIGNATURE, FROM, ZERO], THOUSAND_TOKENS, "0x02");
        let both = entry(&[ERC20_TRANSFER_SIGNATURE, ZERO, ZERO], THOUSAND_TOKENS, "0x03");

        assert!(f.decode(&mint).unwrap().is_none());
        assert!(f.decode(&burn).unwrap().is_none());
        assert!(f.decode(&both).unwrap().is_none());
    }

    #[test]
    fn malformed_entries_are_errors() {
        let f = filter("1");
        let bad_data = transfer("0xzz", "0x01");
        let bad_topic = entry(&[ERC20_TRANSFER_SIGNATURE, "0x1234", TO], THOUSAND_TOKENS, "0x02");

        assert!(matches!(f.decode(&bad_data), Err(DecodeError::MalformedData(_))));
        assert!(matches!(f.decode(&bad_topic), Err(DecodeError::MalformedTopic(_))));
    }

    #[test]
    fn apply_skips_malformed_and_keeps_order() {
        let logs = vec![
            transfer(THOUSAND_TOKENS, "0x01"),
            transfer("0xnothex", "0x02"),
            transfer("0x01", "0x03"),
            transfer(THOUSAND_TOKENS, "0x04"),
            transfer(THOUSAND_TOKENS, "0x01"),
        ];

        let txs: Vec<String> = filter("1000")
            .apply(&logs)
            .into_iter()
            .map(|r| r.transaction_hash)
            .collect();

        assert_eq!(txs, vec!["0x01", "0x04", "0x01"]);
    }

    #[test]
    fn apply_on_empty_batch_is_empty() {
        assert!(filter("1").apply(&[]).is_empty());
    }
}
