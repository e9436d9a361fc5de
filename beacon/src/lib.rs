pub mod chain;
pub mod client;
pub mod types;

pub use chain::{
    BeaconChain, DEFAULT_BASE_URL, QUICKNET_CHAIN_HASH, QUICKNET_GENESIS, QUICKNET_PERIOD_SECS,
};
pub use client::{BeaconSource, DrandHttpClient};
pub use types::*;
