use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::BeaconRound;

/// Public drand HTTP relay.
pub const DEFAULT_BASE_URL: &str = "https://api.drand.sh";
/// drand quicknet (unchained, 3s period).
pub const QUICKNET_CHAIN_HASH: &str =
    "52db9ba70e0cc0f6eaf7803dd07447a1f5477735fd3f661792ba94600c84e971";
pub const QUICKNET_GENESIS: u64 = 1_692_803_367;
pub const QUICKNET_PERIOD_SECS: u64 = 3;

/// A drand chain and the relay it is fetched from.
///
/// Round 1 is emitted at `genesis_time`; round `r` at
/// `genesis_time + (r - 1) * period_secs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconChain {
    pub base_url: String,
    pub chain_hash: String,
    /// Unix seconds.
    pub genesis_time: u64,
    pub period_secs: u64,
}

impl Default for BeaconChain {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chain_hash: QUICKNET_CHAIN_HASH.to_string(),
            genesis_time: QUICKNET_GENESIS,
            period_secs: QUICKNET_PERIOD_SECS,
        }
    }
}

impl BeaconChain {
    /// The latest round emitted at or before `unix_secs` (1 before genesis).
    pub fn round_at(&self, unix_secs: u64) -> u64 {
        if unix_secs < self.genesis_time || self.period_secs == 0 {
            return 1;
        }
        (unix_secs - self.genesis_time) / self.period_secs + 1
    }

    /// The first round emitted strictly after `unix_secs`.
    pub fn round_after(&self, unix_secs: u64) -> u64 {
        if unix_secs < self.genesis_time {
            return 1;
        }
        self.round_at(unix_secs) + 1
    }

    /// Emission time of a round, in unix seconds.
    pub fn round_time(&self, round: u64) -> u64 {
        self.genesis_time + round.saturating_sub(1) * self.period_secs
    }

    /// The round being emitted right now, by the local clock.
    pub fn current_round(&self) -> u64 {
        let now = Utc::now().timestamp().max(0) as u64;
        self.round_at(now)
    }

    /// HTTP endpoint for a round.
    pub fn round_url(&self, round: BeaconRound) -> String {
        format!(
            "{}/{}/public/{}",
            self.base_url.trim_end_matches('/'),
            self.chain_hash,
            round
        )
    }
}
