pub mod handlers;
pub mod peer;
pub mod server;
pub mod types;

pub use handlers::{LuckyApiClient, LuckyApiServer};
pub use peer::client_key;
pub use server::{RpcImpl, RpcServer};
pub use types::*;
