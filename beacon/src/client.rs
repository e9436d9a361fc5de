use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::chain::BeaconChain;
use crate::types::*;

/// Source of public randomness rounds.
///
/// Implementations must return exactly the requested round or an error;
/// substituting another round is never acceptable.
pub trait BeaconSource: Send + Sync {
    fn fetch(&self, round: BeaconRound) -> impl Future<Output = Result<Beacon, BeaconError>> + Send;

    /// The chain this source reads from.
    fn chain(&self) -> &BeaconChain;
}

/// drand HTTP API client.
#[derive(Debug, Clone)]
pub struct DrandHttpClient {
    http: reqwest::Client,
    chain: BeaconChain,
}

impl DrandHttpClient {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(chain: BeaconChain, timeout: Duration) -> Result<Self, BeaconError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lucky-beacon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, chain })
    }
}

impl BeaconSource for DrandHttpClient {
    async fn fetch(&self, round: BeaconRound) -> Result<Beacon, BeaconError> {
        let url = self.chain.round_url(round);
        debug!(%url, "fetching beacon");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%round, status = status.as_u16(), "beacon fetch failed");
            // drand answers 425 Too Early / 404 for rounds it has not emitted yet.
            return Err(match round {
                BeaconRound::Number(n) => BeaconError::RoundNotAvailable {
                    round: n,
                    status: status.as_u16(),
                },
                BeaconRound::Latest => BeaconError::Status(status.as_u16()),
            });
        }

        let beacon: Beacon = response.json().await?;
        beacon.check(round)?;
        debug!(round = beacon.round, "beacon fetched");
        Ok(beacon)
    }

    fn chain(&self) -> &BeaconChain {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SIGNATURE: &str = "b75c69d0b72a5d906e854e808ba7e2accb1542ac355ae486d591aa9d43765482e26cd02df835d3546d23c4b13e0dfc92";
    const RANDOMNESS: &str = "fb8f7bc29bf24db51871ec8c79f3a1e4bd0557bc0dfcee9ed1d924e69d1c60dc";

    /// Serve a single canned HTTP response on an ephemeral port.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> DrandHttpClient {
        let chain = BeaconChain {
            base_url,
            ..BeaconChain::default()
        };
        DrandHttpClient::new(chain, Duration::from_secs(5)).unwrap()
    }

    fn beacon_json(round: u64) -> String {
        format!(r#"{{"round":{round},"randomness":"{RANDOMNESS}","signature":"{SIGNATURE}"}}"#)
    }

    #[tokio::test]
    async fn fetches_requested_round() {
        let url = serve_once("200 OK", beacon_json(123)).await;
        let beacon = client(url).fetch(BeaconRound::Number(123)).await.unwrap();
        assert_eq!(beacon.round, 123);
        assert_eq!(beacon.randomness, RANDOMNESS);
    }

    #[tokio::test]
    async fn future_round_is_unavailable() {
        let url = serve_once("425 Too Early", String::new()).await;
        let err = client(url).fetch(BeaconRound::Number(999_999_999)).await.unwrap_err();
        assert!(matches!(
            err,
            BeaconError::RoundNotAvailable {
                round: 999_999_999,
                status: 425
            }
        ));
    }

    #[tokio::test]
    async fn substituted_round_is_rejected() {
        let url = serve_once("200 OK", beacon_json(123)).await;
        let err = client(url).fetch(BeaconRound::Number(200)).await.unwrap_err();
        assert!(matches!(err, BeaconError::RoundMismatch { .. }));
    }

    #[tokio::test]
    async fn latest_error_status() {
        let url = serve_once("500 Internal Server Error", String::new()).await;
        let err = client(url).fetch(BeaconRound::Latest).await.unwrap_err();
        assert!(matches!(err, BeaconError::Status(500)));
    }
}
