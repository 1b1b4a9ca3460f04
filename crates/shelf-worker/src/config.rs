//! Configuration management

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::sync::DEFAULT_SYNC_INTERVAL;
use crate::ingest::{PoolConfig, DEFAULT_BACKLOG, DEFAULT_WORKER_COUNT};
use crate::lookup::google_books::{DEFAULT_BOOKS_API_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::lookup::GoogleBooksConfig;
use crate::queue::postgres::PgQueueConfig;
use crate::queue::DEFAULT_QUEUE_NAME;
use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default status endpoint host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default status endpoint port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/bookshelf";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Queue Constants
// ============================================================================

/// Default idle poll interval in milliseconds.
pub const DEFAULT_QUEUE_POLL_MS: u64 = 500;

/// Default delay before a nacked message is offered again.
pub const DEFAULT_REDELIVERY_DELAY_SECS: u64 = 10;

/// Default lease on a delivered message before it is offered again.
pub const DEFAULT_ACK_DEADLINE_SECS: u64 = 60;

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub queue: QueueConfig,
    pub sync: SyncConfig,
    pub books_api: BooksApiConfig,
}

/// Status endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Ingestion pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub workers: usize,
    pub backlog: usize,
}

/// Postgres queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub poll_interval_ms: u64,
    pub redelivery_delay_secs: u64,
    pub ack_deadline_secs: u64,
}

/// Cache synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

/// Metadata lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksApiConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env();
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without loading `.env` or validating
    pub fn from_env() -> Self {
        Config {
            server: ServerConfig {
                host: env_string("SHELF_HOST", DEFAULT_SERVER_HOST),
                port: env_or("PORT", DEFAULT_SERVER_PORT),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            ingest: IngestConfig {
                workers: env_or("SHELF_WORKER_COUNT", DEFAULT_WORKER_COUNT),
                backlog: env_or("SHELF_BACKLOG", DEFAULT_BACKLOG),
            },
            queue: QueueConfig {
                name: env_string("SHELF_QUEUE_NAME", DEFAULT_QUEUE_NAME),
                poll_interval_ms: env_or("SHELF_QUEUE_POLL_MS", DEFAULT_QUEUE_POLL_MS),
                redelivery_delay_secs: env_or(
                    "SHELF_REDELIVERY_DELAY_SECS",
                    DEFAULT_REDELIVERY_DELAY_SECS,
                ),
                ack_deadline_secs: env_or("SHELF_ACK_DEADLINE_SECS", DEFAULT_ACK_DEADLINE_SECS),
            },
            sync: SyncConfig {
                interval_secs: env_or("SHELF_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL.as_secs()),
                max_attempts: env_or("SHELF_SYNC_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
                base_delay_ms: env_or(
                    "SHELF_SYNC_BASE_DELAY_MS",
                    DEFAULT_BASE_DELAY.as_millis() as u64,
                ),
            },
            books_api: BooksApiConfig {
                url: env_string("BOOKS_API_URL", DEFAULT_BOOKS_API_URL),
                api_key: std::env::var("BOOKS_API_KEY").ok().filter(|k| !k.is_empty()),
                timeout_secs: env_or("SHELF_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.ingest.workers == 0 {
            anyhow::bail!("Worker count must be greater than 0");
        }

        if self.ingest.backlog == 0 {
            anyhow::bail!("Backlog capacity must be greater than 0");
        }

        if self.queue.name.is_empty() {
            anyhow::bail!("Queue name cannot be empty");
        }

        if self.sync.interval_secs == 0 {
            anyhow::bail!("Cache sync interval must be greater than 0");
        }

        if self.sync.max_attempts == 0 {
            anyhow::bail!("Cache sync max_attempts must be greater than 0");
        }

        Ok(())
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            workers: self.ingest.workers,
            backlog: self.ingest.backlog,
        }
    }

    pub fn queue_config(&self) -> PgQueueConfig {
        PgQueueConfig {
            name: self.queue.name.clone(),
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
            ack_deadline: Duration::from_secs(self.queue.ack_deadline_secs),
            redelivery_delay: Duration::from_secs(self.queue.redelivery_delay_secs),
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.sync.max_attempts,
            Duration::from_millis(self.sync.base_delay_ms),
        )
    }

    pub fn books_api(&self) -> GoogleBooksConfig {
        GoogleBooksConfig {
            base_url: self.books_api.url.clone(),
            api_key: self.books_api.api_key.clone(),
            timeout: Duration::from_secs(self.books_api.timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            ingest: IngestConfig {
                workers: DEFAULT_WORKER_COUNT,
                backlog: DEFAULT_BACKLOG,
            },
            queue: QueueConfig {
                name: DEFAULT_QUEUE_NAME.to_string(),
                poll_interval_ms: DEFAULT_QUEUE_POLL_MS,
                redelivery_delay_secs: DEFAULT_REDELIVERY_DELAY_SECS,
                ack_deadline_secs: DEFAULT_ACK_DEADLINE_SECS,
            },
            sync: SyncConfig {
                interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            },
            books_api: BooksApiConfig {
                url: DEFAULT_BOOKS_API_URL.to_string(),
                api_key: None,
                timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "SHELF_HOST",
        "DATABASE_URL",
        "SHELF_WORKER_COUNT",
        "SHELF_BACKLOG",
        "SHELF_SYNC_MAX_ATTEMPTS",
        "BOOKS_API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_is_empty() {
        clear_env();
        let config = Config::from_env();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.name, "book-worker-sub");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.sync_interval(), Duration::from_secs(5));
        assert_eq!(config.books_api.api_key, None);
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("PORT", "9000");
        std::env::set_var("SHELF_WORKER_COUNT", "2");
        std::env::set_var("SHELF_BACKLOG", "4");
        std::env::set_var("BOOKS_API_KEY", "k");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.pool(),
            PoolConfig {
                workers: 2,
                backlog: 4
            }
        );
        assert_eq!(config.books_api().api_key.as_deref(), Some("k"));
    }

    #[test]
    #[serial]
    fn test_unparseable_value_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "eighty");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = Config::default();
        config.ingest.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingest.backlog = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sync.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.url.clear();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
