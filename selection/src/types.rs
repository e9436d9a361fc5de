use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Outcome of one selection run: one super winner followed by the regular winners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerAssignment {
    /// First entry of the shuffled pool. `None` only for an empty pool.
    pub super_winner: Option<Address>,
    /// The entries after the super winner, in shuffled order.
    pub regular_winners: Vec<Address>,
}

impl WinnerAssignment {
    /// Total number of selected addresses (super winner included).
    pub fn len(&self) -> usize {
        self.super_winner.iter().count() + self.regular_winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.super_winner.is_none() && self.regular_winners.is_empty()
    }

    /// Whether the address won anything in this assignment.
    pub fn contains(&self, address: &Address) -> bool {
        self.super_winner.as_ref() == Some(address) || self.regular_winners.contains(address)
    }

    /// All winners in prize order: the super winner first.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.super_winner.iter().chain(self.regular_winners.iter())
    }
}

/// Errors produced by the selection crate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("recomputed super winner {computed:?} does not match published {published:?}")]
    SuperWinnerMismatch {
        published: Option<Address>,
        computed: Option<Address>,
    },

    #[error("recomputed regular winners differ from the published list at position {position}")]
    RegularWinnersMismatch { position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn empty_assignment() {
        let a = WinnerAssignment::default();
        assert!(a.is_empty());
        assert_eq!(a.len(), 0);
        assert_eq!(a.iter().count(), 0);
    }

    #[test]
    fn len_counts_super_winner() {
        let a = WinnerAssignment {
            super_winner: Some(addr(1)),
            regular_winners: vec![addr(2), addr(3)],
        };
        assert_eq!(a.len(), 3);
        assert!(a.contains(&addr(1)));
        assert!(a.contains(&addr(3)));
        assert!(!a.contains(&addr(4)));
        assert_eq!(a.iter().next(), Some(&addr(1)));
    }
}
