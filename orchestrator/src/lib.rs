pub mod auth;
pub mod config;
pub mod engine;
pub mod types;

pub use config::OrchestratorConfig;
pub use engine::SelectionOrchestrator;
pub use types::*;
