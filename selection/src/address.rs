use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::types::SelectionError;

/// A 20-byte EVM account address.
///
/// Parsing is case-insensitive; display uses the EIP-55 mixed-case checksum
/// form so the same account always renders identically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (`0x000…0`), the `from` side of every mint transfer.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Extract an address from a 32-byte ABI word (indexed event topic).
    /// The address occupies the low-order 20 bytes.
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Self(bytes)
    }

    /// Left-pad the address into a 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 checksum encoding.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Abbreviated display form, e.g. `0xC805...CC51`.
    pub fn short(&self) -> String {
        let full = self.to_checksum();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SelectionError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != 40 {
            return Err(invalid("expected 40 hex digits"));
        }

        let bytes = hex::decode(digits).map_err(|e| invalid(&e.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        let lower: Address = "0xc80577c2c0e860fc2935c809609fa46456cecc51".parse().unwrap();
        let upper: Address = "0xC80577C2C0E860FC2935C809609FA46456CECC51".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn checksum_matches_eip55_vectors() {
        for vector in [
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "0xde709f2102306220921060314715629080e2fb77",
            "0xC80577C2C0e860fC2935c809609Fa46456cECC51",
        ] {
            let addr: Address = vector.parse().unwrap();
            assert_eq!(addr.to_checksum(), vector);
        }
    }

    #[test]
    fn short_form() {
        let addr: Address = "0xC80577C2C0e860fC2935c809609Fa46456cECC51".parse().unwrap();
        assert_eq!(addr.short(), "0xC805...CC51");
    }

    #[test]
    fn rejects_bad_input() {
        assert!("c80577c2c0e860fc2935c809609fa46456cecc51".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz0577c2c0e860fc2935c809609fa46456cecc51".parse::<Address>().is_err());
    }

    #[test]
    fn word_roundtrip() {
        let addr = Address::from_bytes([0xab; 20]);
        let word = addr.to_word();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(Address::from_word(&word), addr);
    }

    #[test]
    fn serde_uses_checksum_string() {
        let addr: Address = "0x52908400098527886e0f7030069857d2e4169ee7".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x52908400098527886E0F7030069857D2E4169EE7\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
