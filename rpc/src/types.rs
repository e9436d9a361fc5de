use jsonrpsee::types::ErrorObjectOwned;
use lucky_orchestrator::{OrchestratorError, ResetOutcome, RoundAudit, SelectionState};
use serde::{Deserialize, Serialize};

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32000;
pub const BEACON_UNAVAILABLE: i32 = -32001;
pub const REGISTRY_UNAVAILABLE: i32 = -32002;
pub const UNAUTHORIZED: i32 = -32003;
pub const RATE_LIMITED: i32 = -32004;

/// Map an orchestrator error to its JSON-RPC error object.
pub fn rpc_error(err: OrchestratorError) -> ErrorObjectOwned {
    let code = match &err {
        OrchestratorError::BeaconUnavailable(_) => BEACON_UNAVAILABLE,
        OrchestratorError::RegistryUnavailable(_) => REGISTRY_UNAVAILABLE,
        OrchestratorError::Unauthorized => UNAUTHORIZED,
        OrchestratorError::RateLimited { .. } => RATE_LIMITED,
        OrchestratorError::Storage(_) | OrchestratorError::Corrupt { .. } => INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

pub fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(INVALID_PARAMS, msg.into(), None::<()>)
}

/// Response for an admin reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub cache_cleared: bool,
    pub marker_cleared: bool,
}

impl From<ResetOutcome> for ResetResponse {
    fn from(outcome: ResetOutcome) -> Self {
        Self {
            success: true,
            cache_cleared: outcome.cache_cleared,
            marker_cleared: outcome.marker_cleared,
        }
    }
}

/// Response for a beacon round audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRoundResponse {
    pub round: u64,
    pub randomness: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_signature: Option<String>,
    pub randomness_verified: bool,
    pub published_at: u64,
    pub used_for_selection: bool,
}

impl From<RoundAudit> for VerifyRoundResponse {
    fn from(audit: RoundAudit) -> Self {
        Self {
            round: audit.beacon.round,
            randomness: audit.beacon.randomness,
            signature: audit.beacon.signature,
            previous_signature: audit.beacon.previous_signature,
            randomness_verified: audit.randomness_verified,
            published_at: audit.published_at,
            used_for_selection: audit.used_for_selection,
        }
    }
}

/// Response for health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub contract: String,
    /// `None` when the registry could not be reached.
    pub selection_state: Option<SelectionState>,
    pub selected_round: Option<u64>,
    /// Beacon round by the local clock.
    pub current_beacon_round: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucky_beacon::Beacon;
    use lucky_storage::StorageError;

    #[test]
    fn error_codes() {
        let cases = [
            (OrchestratorError::BeaconUnavailable("x".into()), -32001),
            (OrchestratorError::RegistryUnavailable("x".into()), -32002),
            (OrchestratorError::Unauthorized, -32003),
            (
                OrchestratorError::RateLimited {
                    client: "a".into(),
                    count: 11,
                },
                -32004,
            ),
            (
                OrchestratorError::Storage(StorageError::NotACounter("k".into())),
                -32000,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(rpc_error(err).code(), code);
        }
        assert_eq!(invalid_params("bad").code(), -32602);
    }

    #[test]
    fn verify_response_from_audit() {
        let audit = RoundAudit {
            beacon: Beacon {
                round: 7,
                randomness: "aa".into(),
                signature: "bb".into(),
                previous_signature: None,
            },
            randomness_verified: false,
            published_at: 1_000,
            used_for_selection: true,
        };
        let resp = VerifyRoundResponse::from(audit);
        assert_eq!(resp.round, 7);
        assert!(!resp.randomness_verified);
        assert!(resp.used_for_selection);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("previousSignature").is_none());
        assert_eq!(json["publishedAt"], 1_000);
    }
}
