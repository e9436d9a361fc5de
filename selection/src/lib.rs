pub mod address;
pub mod pool;
pub mod prize;
pub mod seed;
pub mod shuffle;
pub mod types;
pub mod verify;

pub use address::Address;
pub use pool::MinterPool;
pub use prize::{assign_prizes, Prize, PrizeTable, PrizeTier, WinnerEntry};
pub use seed::{derive_seed, SelectionSeed};
pub use shuffle::{select_winners, select_winners_with_limit, shuffle, MAX_REGULAR_WINNERS};
pub use types::*;
pub use verify::verify_assignment;
