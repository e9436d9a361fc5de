use lucky_beacon::{DEFAULT_BASE_URL, QUICKNET_CHAIN_HASH, QUICKNET_GENESIS, QUICKNET_PERIOD_SECS};
use lucky_orchestrator::config::{DEFAULT_CACHE_KEY, DEFAULT_RATE_LIMIT_PREFIX, DEFAULT_STATE_KEY};
use lucky_selection::{Address, PrizeTable, MAX_REGULAR_WINNERS};
use serde::{Deserialize, Serialize};

/// The deployed mint contract on Base.
pub const DEFAULT_CONTRACT: Address = Address([
    0xc8, 0x05, 0x77, 0xc2, 0xc0, 0xe8, 0x60, 0xfc, 0x29, 0x35, 0xc8, 0x09, 0x60, 0x9f, 0xa4,
    0x64, 0x56, 0xce, 0xcc, 0x51,
]);

/// Environment variable that overrides `admin.api_key`.
pub const ADMIN_KEY_ENV: &str = "LUCKY_ADMIN_API_KEY";

/// The mint contract and the chain it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractSection {
    pub address: Address,
    pub rpc_url: String,
    /// Deployment block; mint logs are scanned from here.
    pub from_block: u64,
    /// Blocks per `eth_getLogs` call; 0 scans in one call.
    pub log_chunk_blocks: u64,
}

impl Default for ContractSection {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT,
            rpc_url: "https://mainnet.base.org".into(),
            from_block: 0,
            log_chunk_blocks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconSection {
    pub base_url: String,
    pub chain_hash: String,
    pub genesis_time: u64,
    pub period_secs: u64,
    /// 1 selects the first round emitted after the last mint.
    pub round_offset: u64,
}

impl Default for BeaconSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            chain_hash: QUICKNET_CHAIN_HASH.into(),
            genesis_time: QUICKNET_GENESIS,
            period_secs: QUICKNET_PERIOD_SECS,
            round_offset: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub max_regular_winners: usize,
    pub prizes: PrizeTable,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            max_regular_winners: MAX_REGULAR_WINNERS,
            prizes: PrizeTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub result_ttl_secs: u64,
    pub hot_capacity: usize,
    /// How long a cached result may be served from memory before re-reading
    /// the shared data directory.
    pub hot_lease_ms: u64,
    pub data_dir: String,
    pub cache_key: String,
    pub state_key: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            result_ttl_secs: 300,
            hot_capacity: 1_024,
            hot_lease_ms: 1_000,
            data_dir: "./data".into(),
            cache_key: DEFAULT_CACHE_KEY.into(),
            state_key: DEFAULT_STATE_KEY.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Requests per client per window; 0 disables.
    pub requests: u64,
    pub window_secs: u64,
    pub key_prefix: String,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            requests: 10,
            window_secs: 60,
            key_prefix: DEFAULT_RATE_LIMIT_PREFIX.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub listen_addr: String,
    pub port: u16,
    /// Bound on each beacon or registry call.
    pub request_timeout_secs: u64,
    /// Rate-limit by `x-forwarded-for` / `x-real-ip` instead of the socket
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".into(),
            port: 8645,
            request_timeout_secs: 10,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    /// Unset disables the admin operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Errors from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field} must be > 0")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("max_regular_winners must be at most {max}, got {got}")]
    TooManyWinners { got: usize, max: usize },

    #[error("beacon chain_hash must be 32 bytes of hex, got '{0}'")]
    InvalidChainHash(String),

    #[error("cache_key and state_key must differ")]
    SharedKey,
}
