//! Runtime configuration for Braid.
//!
//! Loaded once from the environment (with `.env` support via dotenvy).
//! Every value has a sensible default so the crate works with zero
//! configuration.

use once_cell::sync::OnceCell;
use tracing::warn;

/// Default path for a project's memory database file.
pub const DEFAULT_DB_PATH: &str = ".braid/memory.db";

/// Default row cap for scoped retrieval queries.
pub const DEFAULT_MEMORY_LIMIT: i64 = 50;

/// Default token budget for memory briefs.
pub const DEFAULT_BRIEF_MAX_TOKENS: usize = 2000;

/// Crate configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite memory database.
    pub db_path: String,
    /// Row cap applied when a query does not supply its own limit.
    pub memory_limit: i64,
    /// Token budget applied when brief options do not supply one.
    pub brief_max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            memory_limit: DEFAULT_MEMORY_LIMIT,
            brief_max_tokens: DEFAULT_BRIEF_MAX_TOKENS,
        }
    }
}

impl Config {
    /// Build configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            db_path: std::env::var("BRAID_DB_PATH")
                .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            memory_limit: parse_env("BRAID_MEMORY_LIMIT", DEFAULT_MEMORY_LIMIT),
            brief_max_tokens: parse_env("BRAID_BRIEF_MAX_TOKENS", DEFAULT_BRIEF_MAX_TOKENS),
        }
    }
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Initialize configuration from the environment.
pub fn init() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Access the global configuration, initializing it on first use.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}
