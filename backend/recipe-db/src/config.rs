//! Configuration for the recipe database layer
//!
//! Loaded from environment variables; see [`DatabaseConfig::from_env`].

use db_pool::env_utils::{parse_env_bool, parse_env_required, parse_env_with_default};
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Length in bytes of the OAuth2 token encryption key, when one is set
pub const ENCRYPTION_KEY_LEN: usize = 32;

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_url: String,
    #[serde(default)]
    pub run_migrations: bool,
    #[serde(default = "default_max_ping_attempts")]
    pub max_ping_attempts: u32,
    #[serde(default = "default_ping_wait_period", with = "duration_ms")]
    pub ping_wait_period: Duration,
    #[serde(default)]
    pub oauth2_token_encryption_key: String,
    #[serde(default)]
    pub log_queries: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: u32,
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: u32,
    #[serde(default = "default_connection_max_lifetime", with = "duration_secs")]
    pub connection_max_lifetime: Duration,
}

fn default_max_ping_attempts() -> u32 {
    50
}

fn default_ping_wait_period() -> Duration {
    Duration::from_secs(1)
}

fn default_max_open_connections() -> u32 {
    20
}

fn default_max_idle_connections() -> u32 {
    5
}

fn default_connection_max_lifetime() -> Duration {
    Duration::from_secs(1800)
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("connection_url", &"[REDACTED]")
            .field("run_migrations", &self.run_migrations)
            .field("max_ping_attempts", &self.max_ping_attempts)
            .field("ping_wait_period", &self.ping_wait_period)
            .field("oauth2_token_encryption_key", &"[REDACTED]")
            .field("log_queries", &self.log_queries)
            .field("debug", &self.debug)
            .field("max_open_connections", &self.max_open_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("connection_max_lifetime", &self.connection_max_lifetime)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn new(connection_url: impl Into<String>) -> Self {
        Self {
            connection_url: connection_url.into(),
            run_migrations: false,
            max_ping_attempts: default_max_ping_attempts(),
            ping_wait_period: default_ping_wait_period(),
            oauth2_token_encryption_key: String::new(),
            log_queries: false,
            debug: false,
            max_open_connections: default_max_open_connections(),
            max_idle_connections: default_max_idle_connections(),
            connection_max_lifetime: default_connection_max_lifetime(),
        }
    }

    pub fn from_env() -> Result<Self, String> {
        let connection_url: String = parse_env_required("DATABASE_URL")?;

        let config = Self {
            connection_url,
            run_migrations: parse_env_bool("DATABASE_RUN_MIGRATIONS", false),
            max_ping_attempts: parse_env_with_default(
                "DATABASE_MAX_PING_ATTEMPTS",
                default_max_ping_attempts(),
            ),
            ping_wait_period: Duration::from_millis(parse_env_with_default(
                "DATABASE_PING_WAIT_PERIOD_MS",
                default_ping_wait_period().as_millis() as u64,
            )),
            oauth2_token_encryption_key: std::env::var("DATABASE_OAUTH2_TOKEN_ENCRYPTION_KEY")
                .unwrap_or_default(),
            log_queries: parse_env_bool("DATABASE_LOG_QUERIES", false),
            debug: parse_env_bool("DATABASE_DEBUG", false),
            max_open_connections: parse_env_with_default(
                "DB_MAX_CONNECTIONS",
                default_max_open_connections(),
            ),
            max_idle_connections: parse_env_with_default(
                "DB_MIN_CONNECTIONS",
                default_max_idle_connections(),
            ),
            connection_max_lifetime: Duration::from_secs(parse_env_with_default(
                "DB_MAX_LIFETIME_SECS",
                default_connection_max_lifetime().as_secs(),
            )),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.connection_url.trim().is_empty() {
            return Err("database connection url must not be empty".to_string());
        }
        if self.max_ping_attempts == 0 {
            return Err("max_ping_attempts must be at least 1".to_string());
        }
        if self.max_open_connections == 0 {
            return Err("max_open_connections must be at least 1".to_string());
        }
        if self.max_idle_connections > self.max_open_connections {
            return Err(format!(
                "max_idle_connections ({}) exceeds max_open_connections ({})",
                self.max_idle_connections, self.max_open_connections
            ));
        }
        if !self.oauth2_token_encryption_key.is_empty()
            && self.oauth2_token_encryption_key.len() != ENCRYPTION_KEY_LEN
        {
            return Err(format!(
                "oauth2_token_encryption_key must be exactly {} bytes",
                ENCRYPTION_KEY_LEN
            ));
        }
        Ok(())
    }

    /// Pool settings for `db_pool::create_pool`
    pub fn to_pool_config(&self, service_name: &str) -> DbConfig {
        DbConfig {
            service_name: service_name.to_string(),
            database_url: self.connection_url.clone(),
            max_connections: self.max_open_connections,
            min_connections: self.max_idle_connections,
            max_lifetime_secs: self.connection_max_lifetime.as_secs(),
            log_statements: self.log_queries,
            ..DbConfig::default()
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
