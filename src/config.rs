//! Application configuration loaded from environment variables.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::messaging::KafkaSettings;
use crate::store::CacheMode;
use crate::utils::RetryConfig;

const DEFAULT_CACHE_SIZE: usize = 50;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration.
///
/// Every variable has a default, so an empty environment gives a service that
/// talks to a local Kafka and keeps orders in memory. Empty values count as
/// unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` selects the in-memory backing store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub retry: RetryConfig,
    pub cache: CacheMode,
    pub kafka: KafkaSettings,
    pub consumer_backoff: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let text = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let retry_attempts: u32 = parse(&var, "DB_RETRY_ATTEMPTS", 3)?;
        let retry_delay_ms: u64 = parse(&var, "DB_RETRY_DELAY_MS", 500)?;

        let cache = if parse_bool(&var, "ENABLE_CACHE", true)? {
            CacheMode::Enabled {
                capacity: cache_size(var("CACHE_SIZE")),
            }
        } else {
            CacheMode::Disabled
        };

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parse(&var, "PORT", 3000)?,
            database_url: var("DATABASE_URL").or_else(|| {
                var("DB_HOST").map(|host| {
                    format!(
                        "postgres://{}:{}@{}:{}/{}?sslmode={}",
                        text("DB_USER", "serviceuser"),
                        text("DB_PASSWORD", "123"),
                        host,
                        text("DB_PORT", "5432"),
                        text("DB_NAME", "order_management"),
                        text("DB_SSLMODE", "disable"),
                    )
                })
            }),
            db_max_connections: parse(&var, "DB_MAX_CONNECTIONS", 10)?,
            retry: RetryConfig::new(retry_attempts, Duration::from_millis(retry_delay_ms)),
            cache,
            kafka: KafkaSettings {
                brokers: text("KAFKA_BROKERS", "localhost:9092"),
                topic: text("KAFKA_TOPIC", "orders"),
                group_id: text("KAFKA_GROUP", "order-service"),
                dead_letter_topic: text("KAFKA_DLQ_TOPIC", "orders-dlq"),
            },
            consumer_backoff: Duration::from_secs(parse(&var, "CONSUMER_BACKOFF_SECS", 10)?),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, V>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool<V>(var: &V, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

/// A bad cache size is not fatal: fall back to the default.
fn cache_size(value: Option<String>) -> NonZeroUsize {
    let default = NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<NonZeroUsize>() {
            Ok(size) => size,
            Err(_) => {
                tracing::warn!(value = %raw, default = DEFAULT_CACHE_SIZE, "Invalid CACHE_SIZE, using default");
                default
            }
        },
    }
}
