use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use lucky_beacon::DrandHttpClient;
use lucky_config::ServiceConfig;
use lucky_orchestrator::SelectionOrchestrator;
use lucky_registry::EthRegistry;
use lucky_rpc::RpcServer;
use lucky_storage::TieredStore;

/// Lucky Mint winner selection service
#[derive(Parser)]
#[command(name = "lucky-server", version, about = "Lucky Mint winner selection service")]
struct Args {
    /// Path to the TOML config file (defaults apply when omitted)
    #[arg(long, env = "LUCKY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the durable store (overrides cache.data_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON-RPC server port (overrides rpc.port)
    #[arg(long)]
    rpc_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("Lucky Mint server starting");

    let mut config = ServiceConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::error!("Config error: {e}");
        std::process::exit(1);
    });
    if let Some(dir) = args.data_dir {
        config.cache.data_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(port) = args.rpc_port {
        config.rpc.port = port;
    }
    if config.admin.api_key.is_none() {
        tracing::warn!("no admin API key configured; admin operations are disabled");
    }

    tracing::info!(
        contract = %config.contract.address,
        rpc_url = %config.contract.rpc_url,
        beacon = %config.beacon.base_url,
        data_dir = %config.cache.data_dir,
        "config loaded"
    );

    // --- Collaborators ---
    let timeout = config.request_timeout();
    let beacon = DrandHttpClient::new(config.beacon_chain(), timeout)?;
    let registry = EthRegistry::new(config.contract.address, config.registry_config(), timeout)?;
    let store = TieredStore::new(&config.store_config())?;

    let orchestrator = Arc::new(SelectionOrchestrator::new(
        beacon,
        registry,
        store,
        config.orchestrator_config(),
    ));
    match orchestrator.selection_record() {
        Ok(Some(record)) => tracing::info!(round = record.round, "existing selection found"),
        Ok(None) => tracing::info!("no selection stored yet"),
        Err(e) => tracing::warn!("stored selection unreadable: {e}"),
    }

    // --- RPC ---
    let rpc_server = RpcServer::new(config.listen_addr(), orchestrator)
        .with_proxy_headers(config.rpc.trust_proxy_headers);

    tokio::select! {
        result = rpc_server.run() => {
            match result {
                Ok(addr) => tracing::info!(%addr, "RPC server stopped"),
                Err(e) => {
                    tracing::error!("RPC server error: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    tracing::info!("Lucky Mint server shut down");
    Ok(())
}
