use chrono::{DateTime, Utc};
use lucky_beacon::{Beacon, BeaconError};
use lucky_registry::RegistryError;
use lucky_selection::{assign_prizes, Address, PrizeTable, WinnerAssignment, WinnerEntry};
use lucky_storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the collection stands with respect to winner selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    /// Mint not complete yet.
    NotEligible,
    /// Sold out, no canonical selection stored yet.
    EligibleUnselected,
    /// A canonical selection exists. Terminal.
    Selected,
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionState::NotEligible => write!(f, "NotEligible"),
            SelectionState::EligibleUnselected => write!(f, "EligibleUnselected"),
            SelectionState::Selected => write!(f, "Selected"),
        }
    }
}

/// The durable selection-state marker.
///
/// Holds everything a third party needs, together with the minter pool, to
/// re-derive the assignment: contract, round and randomness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub contract: Address,
    pub round: u64,
    pub randomness: String,
    pub signature: String,
    /// Hex seed derived from (randomness, contract, round).
    pub seed: String,
    pub assignment: WinnerAssignment,
    pub max_regular_winners: usize,
    pub pool_size: usize,
    /// Hex SHA-256 over the pool addresses in order.
    pub pool_digest: String,
    pub snapshot_block: u64,
    pub snapshot_timestamp: u64,
    pub total_minted: u64,
    pub max_supply: u64,
    pub selected_at: DateTime<Utc>,
}

impl SelectionRecord {
    /// Render the cached result for this record.
    pub fn to_result(&self, prizes: &PrizeTable) -> SelectionResult {
        SelectionResult {
            winners: assign_prizes(&self.assignment, prizes, self.round),
            mint_complete: true,
            total_minted: self.total_minted,
            max_supply: self.max_supply,
            drand_round: self.round,
            randomness: self.randomness.clone(),
            selection_timestamp: self.selected_at,
            pool_size: self.pool_size,
        }
    }
}

/// The cached artifact served to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub winners: Vec<WinnerEntry>,
    pub mint_complete: bool,
    pub total_minted: u64,
    pub max_supply: u64,
    pub drand_round: u64,
    pub randomness: String,
    pub selection_timestamp: DateTime<Utc>,
    pub pool_size: usize,
}

/// Answer to "get current winners".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnersResponse {
    pub status: SelectionState,
    pub mint_complete: bool,
    pub total_minted: u64,
    pub max_supply: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SelectionResult>,
}

impl WinnersResponse {
    pub fn not_eligible(total_minted: u64, max_supply: u64) -> Self {
        Self {
            status: SelectionState::NotEligible,
            mint_complete: false,
            total_minted,
            max_supply,
            result: None,
        }
    }

    pub fn selected(result: SelectionResult) -> Self {
        Self {
            status: SelectionState::Selected,
            mint_complete: result.mint_complete,
            total_minted: result.total_minted,
            max_supply: result.max_supply,
            result: Some(result),
        }
    }
}

/// What an admin reset removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub cache_cleared: bool,
    pub marker_cleared: bool,
}

/// A beacon round fetched for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundAudit {
    pub beacon: Beacon,
    /// `randomness == sha256(signature)`.
    pub randomness_verified: bool,
    /// Scheduled emission time, unix seconds.
    pub published_at: u64,
    /// Whether the stored selection was seeded from this round.
    pub used_for_selection: bool,
}

/// Errors produced by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Randomness beacon unavailable: {0}")]
    BeaconUnavailable(String),

    #[error("Minter registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded for {client}: {count} requests in the current window")]
    RateLimited { client: String, count: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Corrupt stored data under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<BeaconError> for OrchestratorError {
    fn from(e: BeaconError) -> Self {
        OrchestratorError::BeaconUnavailable(e.to_string())
    }
}

impl From<RegistryError> for OrchestratorError {
    fn from(e: RegistryError) -> Self {
        OrchestratorError::RegistryUnavailable(e.to_string())
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
