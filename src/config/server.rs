// src/config/server.rs
// Server, database, and embedding-service connection configuration.

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_usize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("USEFULNESS_HOST", "0.0.0.0"),
            port: env_usize("USEFULNESS_PORT", 8085) as u16,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Durable store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("DATABASE_URL", "sqlite://usefulness.db"),
            max_connections: env_usize("SQLITE_MAX_CONNECTIONS", 10) as u32,
        }
    }
}

/// Embedding service connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_or(
                "EMBEDDING_ENDPOINT",
                "https://api.openai.com/v1/embeddings",
            ),
            api_key: env_or("EMBEDDING_API_KEY", ""),
            model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: env_or("RUST_LOG", "usefulness_engine=info,tower_http=info"),
        }
    }
}
