use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn, Service};
use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{stop_channel, ServerBuilder, ServerHandle};
use lucky_beacon::BeaconSource;
use lucky_orchestrator::{SelectionOrchestrator, SelectionRecord, WinnersResponse};
use lucky_registry::MinterRegistry;
use lucky_storage::ResultStore;
use tracing::{debug, info, warn};

use crate::handlers::LuckyApiServer;
use crate::peer::client_key;
use crate::types::*;

/// The Lucky Mint RPC server.
pub struct RpcServer<B, R, S> {
    listen_addr: String,
    trust_proxy_headers: bool,
    orchestrator: Arc<SelectionOrchestrator<B, R, S>>,
}

impl<B, R, S> RpcServer<B, R, S>
where
    B: BeaconSource + 'static,
    R: MinterRegistry + 'static,
    S: ResultStore + 'static,
{
    /// Create a server bound to `listen_addr` (`host:port`).
    pub fn new(listen_addr: impl Into<String>, orchestrator: Arc<SelectionOrchestrator<B, R, S>>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            trust_proxy_headers: false,
            orchestrator,
        }
    }

    /// Key rate limits on proxy headers instead of the socket address.
    pub fn with_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Bind and start serving in the background.
    ///
    /// Every request gets its own method table bound to the caller's address,
    /// so rate limiting never depends on what the caller claims to be.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.listen_addr.parse()?;
        let (stop_handle, server_handle) = stop_channel();
        let svc_builder = ServerBuilder::default().to_service_builder();
        let orchestrator = self.orchestrator;
        let trust = self.trust_proxy_headers;
        let conn_stop = stop_handle.clone();

        let make_service = make_service_fn(move |conn: &AddrStream| {
            let remote = conn.remote_addr();
            let stop_handle = conn_stop.clone();
            let svc_builder = svc_builder.clone();
            let orchestrator = orchestrator.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req: hyper::Request<hyper::Body>| {
                    let peer = client_key(req.headers(), remote, trust);
                    let methods = RpcImpl::for_peer(orchestrator.clone(), peer).into_rpc();
                    let mut svc = svc_builder.clone().build(methods, stop_handle.clone());
                    svc.call(req)
                }))
            }
        });

        let server = hyper::Server::try_bind(&addr)?.serve(make_service);
        let addr = server.local_addr();
        info!(%addr, trust_proxy_headers = trust, "Lucky Mint RPC server starting");

        tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async move { stop_handle.shutdown().await });
            if let Err(e) = graceful.await {
                warn!(error = %e, "RPC server terminated");
            }
        });
        Ok((addr, server_handle))
    }

    /// Start the server and wait until it shuts down.
    pub async fn run(self) -> Result<SocketAddr, Box<dyn std::error::Error + Send + Sync>> {
        let (addr, handle) = self.start().await?;
        handle.stopped().await;
        Ok(addr)
    }
}

/// Implementation of the RPC trait backed by the orchestrator.
pub struct RpcImpl<B, R, S> {
    orchestrator: Arc<SelectionOrchestrator<B, R, S>>,
    /// Network identity of the caller, when served over HTTP.
    peer: Option<String>,
}

impl<B, R, S> RpcImpl<B, R, S> {
    /// In-process use: the `client` argument is the rate-limit key.
    pub fn new(orchestrator: Arc<SelectionOrchestrator<B, R, S>>) -> Self {
        Self {
            orchestrator,
            peer: None,
        }
    }

    /// Bound to one HTTP caller: `peer` is the rate-limit key.
    pub fn for_peer(orchestrator: Arc<SelectionOrchestrator<B, R, S>>, peer: String) -> Self {
        Self {
            orchestrator,
            peer: Some(peer),
        }
    }
}

#[async_trait]
impl<B, R, S> LuckyApiServer for RpcImpl<B, R, S>
where
    B: BeaconSource + 'static,
    R: MinterRegistry + 'static,
    S: ResultStore + 'static,
{
    async fn get_winners(&self, client: Option<String>) -> RpcResult<WinnersResponse> {
        if let (Some(peer), Some(label)) = (&self.peer, &client) {
            debug!(%peer, %label, "lucky_getWinners");
        }
        let key = self.peer.as_deref().or(client.as_deref());
        self.orchestrator
            .get_winners(key)
            .await
            .map_err(|e| {
                warn!(error = %e, "lucky_getWinners failed");
                rpc_error(e)
            })
    }

    async fn get_selection(&self) -> RpcResult<Option<SelectionRecord>> {
        self.orchestrator.selection_record().map_err(rpc_error)
    }

    async fn reset_selection(&self, api_key: String) -> RpcResult<ResetResponse> {
        self.orchestrator
            .reset(&api_key)
            .map(ResetResponse::from)
            .map_err(rpc_error)
    }

    async fn verify_round(&self, api_key: String, round: u64) -> RpcResult<VerifyRoundResponse> {
        if round == 0 {
            return Err(invalid_params("round must be >= 1"));
        }
        self.orchestrator
            .verify_round(&api_key, round)
            .await
            .map(VerifyRoundResponse::from)
            .map_err(rpc_error)
    }

    async fn health(&self) -> RpcResult<HealthResponse> {
        let orch = &self.orchestrator;
        let selection_state = match orch.selection_state().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "health: selection state unavailable");
                None
            }
        };
        let selected_round = orch.selection_record().ok().flatten().map(|r| r.round);
        let status = if selection_state.is_some() { "ok" } else { "degraded" };

        Ok(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contract: orch.config().contract.to_checksum(),
            selection_state,
            selected_round,
            current_beacon_round: orch.beacon().chain().current_round(),
        })
    }
}
