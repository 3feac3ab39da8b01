// src/lib.rs

pub mod base_retriever;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fact_registry;
pub mod http;
pub mod memory;
pub mod state;

// Export commonly used items
pub use config::CONFIG;
pub use error::{CoreError, CoreResult};
pub use state::AppState;
