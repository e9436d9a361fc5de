use lucky_selection::MinterPool;
use serde::{Deserialize, Serialize};

/// Mint progress read from contract state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyStatus {
    pub total_minted: u64,
    pub max_supply: u64,
}

impl SupplyStatus {
    /// Selection becomes possible once the collection sells out.
    pub fn is_complete(&self) -> bool {
        self.total_minted >= self.max_supply
    }
}

/// The minter pool together with the chain position it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinterSnapshot {
    /// Unique minters in first-mint order.
    pub pool: MinterPool,
    /// Block containing the last mint (0 when there were none).
    pub last_mint_block: u64,
    /// Timestamp of that block, unix seconds.
    pub last_mint_timestamp: u64,
}

/// Connection settings for the chain the mint contract lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Ethereum JSON-RPC endpoint.
    pub rpc_url: String,
    /// First block to scan for mint logs (the deployment block).
    pub from_block: u64,
    /// Maximum blocks per `eth_getLogs` call; 0 scans in one call.
    pub log_chunk_blocks: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".to_string(),
            from_block: 0,
            log_chunk_blocks: 0,
        }
    }
}

/// Errors produced by the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("malformed RPC response: {0}")]
    Decode(String),

    #[error("value {0} does not fit in 64 bits")]
    Overflow(String),

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion() {
        let open = SupplyStatus {
            total_minted: 999,
            max_supply: 1000,
        };
        assert!(!open.is_complete());
        let done = SupplyStatus {
            total_minted: 1000,
            max_supply: 1000,
        };
        assert!(done.is_complete());
    }

    #[test]
    fn default_snapshot_is_empty() {
        let snap = MinterSnapshot::default();
        assert!(snap.pool.is_empty());
        assert_eq!(snap.last_mint_block, 0);
    }
}
