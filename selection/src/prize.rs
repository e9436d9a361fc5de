use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::types::WinnerAssignment;

/// Placeholder transaction hash until a prize has been paid out.
pub const PENDING_TX: &str = "pending";

/// The two prize tiers produced by one selection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeTier {
    Super,
    Regular,
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrizeTier::Super => write!(f, "Super"),
            PrizeTier::Regular => write!(f, "Regular"),
        }
    }
}

/// A fixed prize bundle, in whole token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub degen: u64,
    pub myu: u64,
}

/// Prize bundle per tier. Configuration constants, never computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTable {
    pub super_prize: Prize,
    pub regular_prize: Prize,
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            super_prize: Prize {
                degen: 2_500,
                myu: 25_000_000,
            },
            regular_prize: Prize {
                degen: 250,
                myu: 1_000_000,
            },
        }
    }
}

impl PrizeTable {
    pub fn prize_for(&self, tier: PrizeTier) -> Prize {
        match tier {
            PrizeTier::Super => self.super_prize,
            PrizeTier::Regular => self.regular_prize,
        }
    }
}

/// A winner as presented to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerEntry {
    pub address: Address,
    pub display_address: String,
    pub tier: PrizeTier,
    pub prize: Prize,
    /// Beacon round the selection was seeded from.
    pub round: u64,
    /// Payout transaction, or [`PENDING_TX`].
    pub tx_hash: String,
}

/// Attach prizes to an assignment: super winner first, then regular winners in shuffled order.
pub fn assign_prizes(
    assignment: &WinnerAssignment,
    table: &PrizeTable,
    round: u64,
) -> Vec<WinnerEntry> {
    let entry = |address: &Address, tier: PrizeTier| WinnerEntry {
        address: *address,
        display_address: address.short(),
        tier,
        prize: table.prize_for(tier),
        round,
        tx_hash: PENDING_TX.to_string(),
    };

    assignment
        .super_winner
        .iter()
        .map(|a| entry(a, PrizeTier::Super))
        .chain(
            assignment
                .regular_winners
                .iter()
                .map(|a| entry(a, PrizeTier::Regular)),
        )
        .collect()
}
