pub mod abi;
pub mod client;
pub mod logs;
pub mod types;

pub use client::{EthRegistry, MinterRegistry};
pub use types::*;
