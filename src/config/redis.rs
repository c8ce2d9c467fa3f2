//! Redis backend settings shared by the session store and the rate limiter.

use redis::aio::MultiplexedConnection;
use redis::{ErrorKind, RedisError};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Both Redis-backed adapters share one connection and one key namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedisConfig {
    /// `redis://` or `rediss://` URL.
    pub url: String,

    /// Namespace for every key the service writes; must end with `:`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("redis.url"));
        }
        let scheme_ok = ["redis://", "rediss://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));
        if !scheme_ok {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if !self.key_prefix.ends_with(':') {
            return Err(ValidationError::OutOfRange {
                field: "redis.key_prefix",
                reason: "must end with ':'".to_string(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    /// Opens the multiplexed connection both Redis adapters clone.
    pub async fn connect(&self) -> Result<MultiplexedConnection, RedisError> {
        let client = redis::Client::open(self.url.as_str())?;
        match tokio::time::timeout(
            self.connect_timeout(),
            client.get_multiplexed_tokio_connection(),
        )
        .await
        {
            Ok(conn) => conn,
            Err(_) => Err(RedisError::from((
                ErrorKind::IoError,
                "timed out connecting to redis",
            ))),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key_prefix: default_key_prefix(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_key_prefix() -> String {
    "offer_migration:".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> RedisConfig {
        RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_namespace_keys_under_the_service_name() {
        let config = RedisConfig::default();
        assert_eq!(config.key_prefix, "offer_migration:");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn empty_url_is_reported_as_missing() {
        assert_eq!(
            RedisConfig::default().validate(),
            Err(ValidationError::MissingRequired("redis.url"))
        );
    }

    #[test]
    fn non_redis_scheme_is_rejected() {
        let config = RedisConfig {
            url: "http://127.0.0.1:6379".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRedisUrl));
    }

    #[test]
    fn prefix_without_separator_is_rejected() {
        let config = RedisConfig {
            key_prefix: "offers".to_string(),
            ..local()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange { field: "redis.key_prefix", .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = RedisConfig {
            connect_timeout_secs: 0,
            ..local()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn tls_url_is_accepted() {
        let config = RedisConfig {
            url: "rediss://cache.internal:6380".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
