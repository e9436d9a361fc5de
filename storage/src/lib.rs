pub mod disk;
pub mod lru_cache;
pub mod store;
pub mod tiered;
pub mod types;

pub use disk::FileStore;
pub use lru_cache::MemoryStore;
pub use store::ResultStore;
pub use tiered::TieredStore;
pub use types::*;
