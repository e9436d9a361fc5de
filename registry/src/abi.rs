//! Minimal ABI helpers for the handful of calls the registry makes.

use sha3::{Digest, Keccak256};

use crate::types::RegistryError;

pub const TOTAL_SUPPLY_SIG: &str = "totalSupply()";
pub const MAX_SUPPLY_SIG: &str = "MAX_SUPPLY()";
pub const TRANSFER_EVENT_SIG: &str = "Transfer(address,address,uint256)";

/// First four bytes of the keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// keccak-256 of an event signature (topic 0).
pub fn event_topic(signature: &str) -> [u8; 32] {
    Keccak256::digest(signature.as_bytes()).into()
}

/// `0x`-prefixed lowercase hex.
pub fn hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode `0x`-prefixed hex data.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, RegistryError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| RegistryError::Decode(format!("bad hex '{s}': {e}")))
}

/// Decode a 32-byte word that must hold a value below 2^64.
pub fn decode_u64_word(s: &str) -> Result<u64, RegistryError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != 32 {
        return Err(RegistryError::Decode(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    if bytes[..24].iter().any(|b| *b != 0) {
        return Err(RegistryError::Overflow(s.to_string()));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[24..]);
    Ok(u64::from_be_bytes(low))
}

/// Parse a JSON-RPC hex quantity (`0x1b4`).
pub fn parse_quantity(s: &str) -> Result<u64, RegistryError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RegistryError::Decode(format!("quantity '{s}' lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(RegistryError::Decode("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16).map_err(|e| RegistryError::Decode(format!("quantity '{s}': {e}")))
}

/// Format a JSON-RPC hex quantity.
pub fn quantity(n: u64) -> String {
    format!("0x{n:x}")
}

/// Decode a 32-byte topic.
pub fn decode_word(s: &str) -> Result<[u8; 32], RegistryError> {
    decode_hex(s)?
        .try_into()
        .map_err(|_| RegistryError::Decode(format!("topic '{s}' is not 32 bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(selector(TOTAL_SUPPLY_SIG)), "18160ddd");
        assert_eq!(hex::encode(selector(MAX_SUPPLY_SIG)), "32cb6b0c");
        assert_eq!(
            hex::encode(event_topic(TRANSFER_EVENT_SIG)),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn decode_words() {
        let word = format!("0x{}{}", "00".repeat(30), "1388");
        assert_eq!(decode_u64_word(&word).unwrap(), 5000);

        let huge = format!("0x01{}", "00".repeat(31));
        assert!(matches!(decode_u64_word(&huge), Err(RegistryError::Overflow(_))));

        assert!(decode_u64_word("0x1388").is_err());
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0x").is_err());
        assert_eq!(quantity(436), "0x1b4");
    }
}
