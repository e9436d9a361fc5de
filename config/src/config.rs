use std::path::Path;
use std::time::Duration;

use lucky_beacon::BeaconChain;
use lucky_orchestrator::OrchestratorConfig;
use lucky_registry::RegistryConfig;
use lucky_selection::MAX_REGULAR_WINNERS;
use lucky_storage::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::*;

/// Complete service configuration. Every field has a default, so a partial
/// (or empty) file is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub contract: ContractSection,
    pub beacon: BeaconSection,
    pub selection: SelectionSection,
    pub cache: CacheSection,
    pub rate_limit: RateLimitSection,
    pub rpc: RpcSection,
    pub admin: AdminSection,
}

impl ServiceConfig {
    /// Load a config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Save the config as TOML.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from `path` (or defaults), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                info!(path = %p.display(), "loading config");
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_env(std::env::var(ADMIN_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay the admin key taken from the environment.
    pub fn apply_env(&mut self, admin_key: Option<String>) {
        if let Some(key) = admin_key.filter(|k| !k.is_empty()) {
            self.admin.api_key = Some(key);
        }
    }

    /// Validate all invariants of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract.rpc_url.is_empty() {
            return Err(ConfigError::Empty {
                field: "contract.rpc_url",
            });
        }

        if self.beacon.base_url.is_empty() {
            return Err(ConfigError::Empty {
                field: "beacon.base_url",
            });
        }
        let hash_ok = self.beacon.chain_hash.len() == 64
            && self.beacon.chain_hash.chars().all(|c| c.is_ascii_hexdigit());
        if !hash_ok {
            return Err(ConfigError::InvalidChainHash(self.beacon.chain_hash.clone()));
        }
        if self.beacon.period_secs == 0 {
            return Err(ConfigError::Zero {
                field: "beacon.period_secs",
            });
        }
        if self.beacon.round_offset == 0 {
            return Err(ConfigError::Zero {
                field: "beacon.round_offset",
            });
        }

        if self.selection.max_regular_winners > MAX_REGULAR_WINNERS {
            return Err(ConfigError::TooManyWinners {
                got: self.selection.max_regular_winners,
                max: MAX_REGULAR_WINNERS,
            });
        }

        if self.cache.result_ttl_secs == 0 {
            return Err(ConfigError::Zero {
                field: "cache.result_ttl_secs",
            });
        }
        if self.cache.hot_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "cache.hot_capacity",
            });
        }
        if self.cache.data_dir.is_empty() {
            return Err(ConfigError::Empty {
                field: "cache.data_dir",
            });
        }
        if self.cache.cache_key.is_empty() || self.cache.state_key.is_empty() {
            return Err(ConfigError::Empty {
                field: "cache.cache_key/state_key",
            });
        }
        if self.cache.cache_key == self.cache.state_key {
            return Err(ConfigError::SharedKey);
        }

        if self.rate_limit.requests > 0 && self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Zero {
                field: "rate_limit.window_secs",
            });
        }

        if self.rpc.request_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "rpc.request_timeout_secs",
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.request_timeout_secs)
    }

    pub fn beacon_chain(&self) -> BeaconChain {
        BeaconChain {
            base_url: self.beacon.base_url.clone(),
            chain_hash: self.beacon.chain_hash.clone(),
            genesis_time: self.beacon.genesis_time,
            period_secs: self.beacon.period_secs,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            rpc_url: self.contract.rpc_url.clone(),
            from_block: self.contract.from_block,
            log_chunk_blocks: self.contract.log_chunk_blocks,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            hot_capacity: self.cache.hot_capacity,
            data_dir: self.cache.data_dir.clone(),
            hot_lease_ms: self.cache.hot_lease_ms,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            contract: self.contract.address,
            max_regular_winners: self.selection.max_regular_winners,
            prizes: self.selection.prizes.clone(),
            result_ttl: Duration::from_secs(self.cache.result_ttl_secs),
            cache_key: self.cache.cache_key.clone(),
            state_key: self.cache.state_key.clone(),
            rate_limit_prefix: self.rate_limit.key_prefix.clone(),
            rate_limit_requests: self.rate_limit.requests,
            rate_limit_window: Duration::from_secs(self.rate_limit.window_secs),
            request_timeout: self.request_timeout(),
            round_offset: self.beacon.round_offset,
            admin_api_key: self.admin.api_key.clone(),
        }
    }

    /// Socket address the RPC server binds.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.rpc.listen_addr, self.rpc.port)
    }
}
