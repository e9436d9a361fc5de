use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// One emission of the drand network, as served by its HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    pub round: u64,
    /// Hex-encoded 32-byte randomness.
    pub randomness: String,
    /// Hex-encoded BLS signature over the round.
    pub signature: String,
    /// Only present on chained schemes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_signature: Option<String>,
}

impl Beacon {
    /// Check that `randomness == sha256(signature)`.
    ///
    /// This binds the randomness to the signature. It does not check the BLS
    /// signature itself against the network's public key.
    pub fn verify_randomness(&self) -> Result<(), BeaconError> {
        let signature = hex::decode(&self.signature)
            .map_err(|e| BeaconError::InvalidHex(format!("signature: {e}")))?;
        let randomness = hex::decode(&self.randomness)
            .map_err(|e| BeaconError::InvalidHex(format!("randomness: {e}")))?;

        let expected = Sha256::digest(&signature);
        if expected.as_slice() != randomness.as_slice() {
            return Err(BeaconError::InvalidRandomness { round: self.round });
        }
        Ok(())
    }

    /// Validate a response against the round that was asked for.
    pub fn check(&self, requested: BeaconRound) -> Result<(), BeaconError> {
        if let BeaconRound::Number(round) = requested {
            if self.round != round {
                return Err(BeaconError::RoundMismatch {
                    requested: round,
                    received: self.round,
                });
            }
        }
        self.verify_randomness()
    }
}

/// Which round to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconRound {
    Latest,
    Number(u64),
}

impl fmt::Display for BeaconRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeaconRound::Latest => write!(f, "latest"),
            BeaconRound::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<Option<u64>> for BeaconRound {
    fn from(round: Option<u64>) -> Self {
        round.map_or(BeaconRound::Latest, BeaconRound::Number)
    }
}

/// Errors produced by the beacon client.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("beacon endpoint returned status {0}")]
    Status(u16),

    #[error("round {round} is not available (status {status})")]
    RoundNotAvailable { round: u64, status: u16 },

    #[error("requested round {requested} but beacon returned round {received}")]
    RoundMismatch { requested: u64, received: u64 },

    #[error("randomness of round {round} does not match its signature")]
    InvalidRandomness { round: u64 },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    // drand quicknet round 123.
    const SIGNATURE: &str = "b75c69d0b72a5d906e854e808ba7e2accb1542ac355ae486d591aa9d43765482e26cd02df835d3546d23c4b13e0dfc92";
    const RANDOMNESS: &str = "fb8f7bc29bf24db51871ec8c79f3a1e4bd0557bc0dfcee9ed1d924e69d1c60dc";

    fn beacon() -> Beacon {
        Beacon {
            round: 123,
            randomness: RANDOMNESS.to_string(),
            signature: SIGNATURE.to_string(),
            previous_signature: None,
        }
    }

    #[test]
    fn accepts_real_beacon() {
        beacon().verify_randomness().unwrap();
        beacon().check(BeaconRound::Number(123)).unwrap();
        beacon().check(BeaconRound::Latest).unwrap();
    }

    #[test]
    fn rejects_tampered_randomness() {
        let mut b = beacon();
        b.randomness.replace_range(0..2, "00");
        assert!(matches!(
            b.verify_randomness(),
            Err(BeaconError::InvalidRandomness { round: 123 })
        ));
    }

    #[test]
    fn rejects_other_round() {
        assert!(matches!(
            beacon().check(BeaconRound::Number(124)),
            Err(BeaconError::RoundMismatch {
                requested: 124,
                received: 123
            })
        ));
    }

    #[test]
    fn rejects_bad_hex() {
        let mut b = beacon();
        b.signature = "zz".into();
        assert!(matches!(b.verify_randomness(), Err(BeaconError::InvalidHex(_))));
    }

    #[test]
    fn parses_api_json() {
        let json = format!(
            r#"{{"round":123,"randomness":"{RANDOMNESS}","signature":"{SIGNATURE}"}}"#
        );
        let b: Beacon = serde_json::from_str(&json).unwrap();
        assert_eq!(b, beacon());
    }

    #[test]
    fn round_display() {
        assert_eq!(BeaconRound::Latest.to_string(), "latest");
        assert_eq!(BeaconRound::from(Some(9)).to_string(), "9");
        assert_eq!(BeaconRound::from(None), BeaconRound::Latest);
    }
}
