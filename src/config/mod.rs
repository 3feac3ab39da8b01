// src/config/mod.rs
// Central configuration for the usefulness engine.

pub mod engine;
pub mod helpers;
pub mod server;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

/// Main configuration structure - composes all domain configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub engine: engine::EngineConfig,
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub embedding: server::EmbeddingConfig,
    pub logging: server::LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            engine: engine::EngineConfig::from_env(),
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            embedding: server::EmbeddingConfig::from_env(),
            logging: server::LoggingConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
