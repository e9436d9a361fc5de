use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::address::Address;

/// The ordered, duplicate-free set of addresses winners are drawn from.
///
/// Order matters: the shuffle is a function of the input order, so the pool
/// must be built in a reproducible order (first-mint order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MinterPool {
    addresses: Vec<Address>,
}

impl MinterPool {
    /// Build a pool keeping only the first occurrence of each address.
    pub fn from_addresses<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let mut seen = HashSet::new();
        let addresses = addresses
            .into_iter()
            .filter(|a| seen.insert(*a))
            .collect();
        Self { addresses }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.addresses.iter()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// SHA-256 over the concatenated 20-byte addresses, in pool order.
    /// Published next to a result so auditors can confirm they rebuilt the same pool.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for addr in &self.addresses {
            hasher.update(addr.as_bytes());
        }
        hasher.finalize().into()
    }
}

impl FromIterator<Address> for MinterPool {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self::from_addresses(iter)
    }
}

// Deserialized pools come from files and the wire; re-apply set semantics.
impl<'de> Deserialize<'de> for MinterPool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Address>::deserialize(deserializer)?;
        Ok(MinterPool::from_addresses(raw))
    }
}
