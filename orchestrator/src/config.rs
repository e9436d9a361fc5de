use lucky_selection::{Address, PrizeTable, MAX_REGULAR_WINNERS};
use std::time::Duration;

pub const DEFAULT_CACHE_KEY: &str = "lucky:winners:cache";
pub const DEFAULT_STATE_KEY: &str = "lucky:selection:state";
pub const DEFAULT_RATE_LIMIT_PREFIX: &str = "lucky:ratelimit:";
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Runtime parameters of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// The mint contract; part of every seed.
    pub contract: Address,
    pub max_regular_winners: usize,
    pub prizes: PrizeTable,
    /// Lifetime of the cached result. The selection marker never expires.
    pub result_ttl: Duration,
    pub cache_key: String,
    pub state_key: String,
    pub rate_limit_prefix: String,
    /// Requests allowed per client per window; 0 disables rate limiting.
    pub rate_limit_requests: u64,
    pub rate_limit_window: Duration,
    /// Bound on each beacon or registry call.
    pub request_timeout: Duration,
    /// Which round after the last mint seeds the selection; 1 is the first
    /// round emitted strictly after the last mint block.
    pub round_offset: u64,
    /// Credential for admin operations. `None` rejects every admin call.
    pub admin_api_key: Option<String>,
}

impl OrchestratorConfig {
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            max_regular_winners: MAX_REGULAR_WINNERS,
            prizes: PrizeTable::default(),
            result_ttl: Duration::from_secs(300),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            state_key: DEFAULT_STATE_KEY.to_string(),
            rate_limit_prefix: DEFAULT_RATE_LIMIT_PREFIX.to_string(),
            rate_limit_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            round_offset: 1,
            admin_api_key: None,
        }
    }

    /// Storage key of a client's rate-limit counter.
    pub fn rate_limit_key(&self, client: Option<&str>) -> String {
        let client = client.filter(|c| !c.is_empty()).unwrap_or(ANONYMOUS_CLIENT);
        format!("{}{}", self.rate_limit_prefix, client)
    }
}
