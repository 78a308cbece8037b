//! Application configuration

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub database_url: String,
    pub broadcast_token: String,
    /// Maximum number of chat contexts kept resident.
    pub memory_max_entries: u64,
    /// Seconds a stored context stays readable.
    pub memory_ttl_secs: u64,
    /// Upper bound on one context's serialized turn list, in bytes.
    pub memory_max_entry_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            gemini_api_key: env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:wargabot.db".into()),
            broadcast_token: env::var("BROADCAST_TOKEN")
                .map_err(|_| anyhow::anyhow!("BROADCAST_TOKEN is not set"))?,
            memory_max_entries: env::var("MEMORY_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            memory_ttl_secs: env::var("MEMORY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1800),
            memory_max_entry_bytes: env::var("MEMORY_MAX_ENTRY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
        })
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }
}
