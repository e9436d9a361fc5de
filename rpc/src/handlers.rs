use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use lucky_orchestrator::{SelectionRecord, WinnersResponse};

use crate::types::*;

/// The Lucky Mint JSON-RPC API.
///
/// Each method is prefixed with `lucky_` in the JSON-RPC namespace.
#[rpc(server, client)]
pub trait LuckyApi {
    /// Current winners, or supply progress while the mint is open.
    /// Over HTTP the caller is rate-limited by its network address; `client`
    /// is only a label for logs.
    #[method(name = "lucky_getWinners")]
    async fn get_winners(&self, client: Option<String>) -> RpcResult<WinnersResponse>;

    /// The stored canonical selection, for auditing.
    #[method(name = "lucky_getSelection")]
    async fn get_selection(&self) -> RpcResult<Option<SelectionRecord>>;

    /// Admin: clear the cached result and the selection marker.
    #[method(name = "lucky_resetSelection")]
    async fn reset_selection(&self, api_key: String) -> RpcResult<ResetResponse>;

    /// Admin: fetch and check a beacon round.
    #[method(name = "lucky_verifyRound")]
    async fn verify_round(&self, api_key: String, round: u64) -> RpcResult<VerifyRoundResponse>;

    #[method(name = "lucky_health")]
    async fn health(&self) -> RpcResult<HealthResponse>;
}
