use std::future::Future;
use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use lucky_selection::Address;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::abi::*;
use crate::logs::{minters_from_logs, LogEntry};
use crate::types::*;

/// Read-only view of the mint contract.
pub trait MinterRegistry: Send + Sync {
    /// Current `totalSupply()` and `MAX_SUPPLY()`.
    fn supply_status(&self) -> impl Future<Output = Result<SupplyStatus, RegistryError>> + Send;

    /// Unique minters in first-mint order, with the position of the last mint.
    fn snapshot(&self) -> impl Future<Output = Result<MinterSnapshot, RegistryError>> + Send;
}

/// Only the field the registry reads from `eth_getBlockByNumber`.
#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

fn transport(e: impl std::fmt::Display) -> RegistryError {
    RegistryError::Transport(e.to_string())
}

/// [`MinterRegistry`] backed by an Ethereum JSON-RPC endpoint.
pub struct EthRegistry {
    client: HttpClient,
    contract: Address,
    config: RegistryConfig,
}

impl EthRegistry {
    /// Connect to `config.rpc_url`; every request is bounded by `timeout`.
    pub fn new(
        contract: Address,
        config: RegistryConfig,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(&config.rpc_url)
            .map_err(transport)?;
        Ok(Self {
            client,
            contract,
            config,
        })
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    /// `eth_call` a zero-argument view function returning a uint256.
    async fn call_u64(&self, signature: &str) -> Result<u64, RegistryError> {
        let call = json!({
            "to": self.contract.to_lower_hex(),
            "data": hex_prefixed(&selector(signature)),
        });
        let result: String = self
            .client
            .request("eth_call", rpc_params![call, "latest"])
            .await
            .map_err(transport)?;
        decode_u64_word(&result)
    }

    async fn block_number(&self) -> Result<u64, RegistryError> {
        let result: String = self
            .client
            .request("eth_blockNumber", rpc_params![])
            .await
            .map_err(transport)?;
        parse_quantity(&result)
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, RegistryError> {
        let header: Option<BlockHeader> = self
            .client
            .request("eth_getBlockByNumber", rpc_params![quantity(block), false])
            .await
            .map_err(transport)?;
        let header = header.ok_or(RegistryError::BlockNotFound(block))?;
        parse_quantity(&header.timestamp)
    }

    async fn get_logs(&self, from: String, to: String) -> Result<Vec<LogEntry>, RegistryError> {
        let filter = json!({
            "address": self.contract.to_lower_hex(),
            "fromBlock": from,
            "toBlock": to,
            "topics": [
                hex_prefixed(&event_topic(TRANSFER_EVENT_SIG)),
                hex_prefixed(&Address::ZERO.to_word()),
            ],
        });
        self.client
            .request("eth_getLogs", rpc_params![filter])
            .await
            .map_err(transport)
    }

    /// All mint logs from the configured start block, in chunks if configured.
    pub async fn mint_logs(&self) -> Result<Vec<LogEntry>, RegistryError> {
        let chunk = self.config.log_chunk_blocks;
        if chunk == 0 {
            return self
                .get_logs(quantity(self.config.from_block), "latest".to_string())
                .await;
        }

        let latest = self.block_number().await?;
        let mut logs = Vec::new();
        let mut start = self.config.from_block;
        while start <= latest {
            let end = start.saturating_add(chunk - 1).min(latest);
            debug!(start, end, "scanning mint logs");
            logs.extend(self.get_logs(quantity(start), quantity(end)).await?);
            start = end + 1;
        }
        Ok(logs)
    }
}

impl MinterRegistry for EthRegistry {
    async fn supply_status(&self) -> Result<SupplyStatus, RegistryError> {
        let total_minted = self.call_u64(TOTAL_SUPPLY_SIG).await?;
        let max_supply = self.call_u64(MAX_SUPPLY_SIG).await?;
        Ok(SupplyStatus {
            total_minted,
            max_supply,
        })
    }

    async fn snapshot(&self) -> Result<MinterSnapshot, RegistryError> {
        let logs = self.mint_logs().await?;
        let (pool, last_block) = minters_from_logs(&logs)?;

        let (last_mint_block, last_mint_timestamp) = match last_block {
            Some(block) => (block, self.block_timestamp(block).await?),
            None => (0, 0),
        };

        info!(
            logs = logs.len(),
            minters = pool.len(),
            last_mint_block,
            "minter snapshot built"
        );
        Ok(MinterSnapshot {
            pool,
            last_mint_block,
            last_mint_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::server::{RpcModule, ServerBuilder, ServerHandle};
    use jsonrpsee::types::ErrorObjectOwned;
    use serde_json::Value;

    fn word(n: u64) -> String {
        format!("0x{}{:016x}", "00".repeat(24), n)
    }

    fn mint_log(to: u8, block: u64, index: u64) -> Value {
        json!({
            "topics": [
                hex_prefixed(&event_topic(TRANSFER_EVENT_SIG)),
                hex_prefixed(&Address::ZERO.to_word()),
                hex_prefixed(&Address::from_bytes([to; 20]).to_word()),
                hex_prefixed(&[0u8; 32]),
            ],
            "blockNumber": quantity(block),
            "logIndex": quantity(index),
        })
    }

    /// A fake chain: 3 of 5 minted, mints in blocks 5 and 9, head at block 12.
    async fn mock_chain() -> (String, ServerHandle) {
        let mut module = RpcModule::new(());
        module
            .register_method("eth_call", |params, _| {
                let (call, _tag): (Value, String) = params.parse()?;
                let data = call["data"].as_str().unwrap_or_default().to_string();
                if data == hex_prefixed(&selector(TOTAL_SUPPLY_SIG)) {
                    Ok::<_, ErrorObjectOwned>(Value::String(word(3)))
                } else {
                    Ok(Value::String(word(5)))
                }
            })
            .unwrap();
        module
            .register_method("eth_blockNumber", |_, _| {
                Ok::<_, ErrorObjectOwned>(Value::String(quantity(12)))
            })
            .unwrap();
        module
            .register_method("eth_getLogs", |params, _| {
                let (filter,): (Value,) = params.parse()?;
                let from = parse_quantity(filter["fromBlock"].as_str().unwrap_or("0x0")).unwrap_or(0);
                let to = match filter["toBlock"].as_str() {
                    Some("latest") | None => 12,
                    Some(q) => parse_quantity(q).unwrap_or(12),
                };
                let logs: Vec<Value> = [(1u8, 5u64, 0u64), (2, 5, 1), (1, 9, 0), (3, 9, 1)]
                    .into_iter()
                    .filter(|(_, block, _)| *block >= from && *block <= to)
                    .map(|(to, block, index)| mint_log(to, block, index))
                    .collect();
                Ok::<_, ErrorObjectOwned>(Value::Array(logs))
            })
            .unwrap();
        module
            .register_method("eth_getBlockByNumber", |params, _| {
                let (block, _full): (String, bool) = params.parse()?;
                let n = parse_quantity(&block).unwrap_or(0);
                Ok::<_, ErrorObjectOwned>(json!({ "timestamp": quantity(1_700_000_000 + n) }))
            })
            .unwrap();

        let server = ServerBuilder::default().build("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.start(module);
        (format!("http://{addr}"), handle)
    }

    fn registry(rpc_url: String, log_chunk_blocks: u64) -> EthRegistry {
        let config = RegistryConfig {
            rpc_url,
            from_block: 0,
            log_chunk_blocks,
        };
        EthRegistry::new(Address::from_bytes([0xc8; 20]), config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn reads_supply() {
        let (url, _handle) = mock_chain().await;
        let status = registry(url, 0).supply_status().await.unwrap();
        assert_eq!(status.total_minted, 3);
        assert_eq!(status.max_supply, 5);
        assert!(!status.is_complete());
    }

    #[tokio::test]
    async fn snapshot_single_scan() {
        let (url, _handle) = mock_chain().await;
        let snap = registry(url, 0).snapshot().await.unwrap();
        let expected: Vec<Address> = [1u8, 2, 3].map(|b| Address::from_bytes([b; 20])).to_vec();
        assert_eq!(snap.pool.as_slice(), expected.as_slice());
        assert_eq!(snap.last_mint_block, 9);
        assert_eq!(snap.last_mint_timestamp, 1_700_000_009);
    }

    #[tokio::test]
    async fn chunked_scan_matches_single_scan() {
        let (url, _handle) = mock_chain().await;
        let single = registry(url.clone(), 0).snapshot().await.unwrap();
        let chunked = registry(url, 4).snapshot().await.unwrap();
        assert_eq!(single, chunked);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let err = registry("http://127.0.0.1:1".into(), 0)
            .supply_status()
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
    }
}
