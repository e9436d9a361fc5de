use lucky_selection::{Address, MinterPool};
use serde::{Deserialize, Serialize};

use crate::abi::{decode_word, event_topic, parse_quantity, TRANSFER_EVENT_SIG};
use crate::types::RegistryError;

/// The fields of an `eth_getLogs` entry the registry reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub topics: Vec<String>,
    pub block_number: String,
    pub log_index: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

/// A decoded mint: `Transfer(0x0, to, tokenId)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintEvent {
    pub minter: Address,
    pub block_number: u64,
    pub log_index: u64,
}

/// Decode a log as a mint, or `None` if it is some other transfer.
pub fn decode_mint(log: &LogEntry) -> Result<Option<MintEvent>, RegistryError> {
    if log.removed || log.topics.len() < 3 {
        return Ok(None);
    }
    let topic0 = decode_word(&log.topics[0])?;
    let from = decode_word(&log.topics[1])?;
    if topic0 != event_topic(TRANSFER_EVENT_SIG) || Address::from_word(&from) != Address::ZERO {
        return Ok(None);
    }

    Ok(Some(MintEvent {
        minter: Address::from_word(&decode_word(&log.topics[2])?),
        block_number: parse_quantity(&log.block_number)?,
        log_index: parse_quantity(&log.log_index)?,
    }))
}

/// Order mint logs chronologically and collapse them into the minter pool.
///
/// Returns the pool and the block of the last mint (if any).
pub fn minters_from_logs(logs: &[LogEntry]) -> Result<(MinterPool, Option<u64>), RegistryError> {
    let mut mints = Vec::with_capacity(logs.len());
    for log in logs {
        if let Some(mint) = decode_mint(log)? {
            mints.push(mint);
        }
    }
    mints.sort_by_key(|m| (m.block_number, m.log_index));

    let last_block = mints.last().map(|m| m.block_number);
    let pool = MinterPool::from_addresses(mints.into_iter().map(|m| m.minter));
    Ok((pool, last_block))
}
