use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::address::Address;
use crate::types::SelectionError;

/// 256-bit shuffle seed, interpreted as a big-endian unsigned integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionSeed(pub [u8; 32]);

impl SelectionSeed {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The seed reduced modulo 2^32. This is all the shuffle generator ever sees,
    /// since its first step already reduces modulo 2^32.
    pub fn low_u32(&self) -> u32 {
        let mut low = [0u8; 4];
        low.copy_from_slice(&self.0[28..]);
        u32::from_be_bytes(low)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, SelectionError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| SelectionError::InvalidSeed(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SelectionError::InvalidSeed("seed must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for SelectionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SelectionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectionSeed({})", self.to_hex())
    }
}

impl Serialize for SelectionSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SelectionSeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive the shuffle seed from a beacon round.
///
/// `keccak256(randomness_utf8 || contract[20] || round_be[32])`, the Solidity
/// `abi.encodePacked(string, address, uint256)` layout. The randomness is
/// hashed as the hex text the beacon published, not its decoded bytes.
/// Both trailing fields are fixed width, so distinct inputs never share an
/// encoding.
pub fn derive_seed(randomness: &str, contract: &Address, round: u64) -> SelectionSeed {
    let mut round_word = [0u8; 32];
    round_word[24..].copy_from_slice(&round.to_be_bytes());

    let mut hasher = Keccak256::new();
    hasher.update(randomness.as_bytes());
    hasher.update(contract.as_bytes());
    hasher.update(round_word);
    SelectionSeed(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOMNESS: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

    fn contract() -> Address {
        "0xC80577C2C0e860fC2935c809609Fa46456cECC51".parse().unwrap()
    }

    #[test]
    fn golden_seed() {
        let seed = derive_seed(RANDOMNESS, &contract(), 100);
        assert_eq!(
            seed.to_hex(),
            "0xe689e3c1c91e33c0ca4f3c049f0b48c559c885a3eb88f47534657e0c66bb9ea2"
        );
        assert_eq!(seed.low_u32(), 0x66bb_9ea2);
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            derive_seed(RANDOMNESS, &contract(), 7),
            derive_seed(RANDOMNESS, &contract(), 7)
        );
    }

    #[test]
    fn each_input_changes_seed() {
        let base = derive_seed(RANDOMNESS, &contract(), 100);
        assert_ne!(base, derive_seed(RANDOMNESS, &contract(), 101));
        assert_ne!(base, derive_seed(RANDOMNESS, &Address::ZERO, 100));
        assert_ne!(base, derive_seed("deadbeef", &contract(), 100));
    }

    #[test]
    fn rounds_give_distinct_seeds() {
        let seeds: std::collections::HashSet<_> = (1..=500u64)
            .map(|r| derive_seed(RANDOMNESS, &contract(), r))
            .collect();
        assert_eq!(seeds.len(), 500);
    }

    #[test]
    fn hex_roundtrip() {
        let seed = derive_seed(RANDOMNESS, &contract(), 1);
        assert_eq!(SelectionSeed::from_hex(&seed.to_hex()).unwrap(), seed);
        assert!(SelectionSeed::from_hex("0x1234").is_err());
    }
}
