//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `OFFER_MIGRATION`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use offer_migration::config::{init_tracing, AppConfig};
//!
//! let config = AppConfig::load_validated().expect("Invalid configuration");
//! init_tracing(&config.logging).expect("Failed to install tracing");
//! ```

mod error;
mod logging;
mod redis;
mod wizard;

pub use error::{ConfigError, ValidationError};
pub use logging::{init_tracing, LoggingConfig};
pub use redis::RedisConfig;
pub use wizard::WizardConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub wizard: WizardConfig,

    /// Redis backend; the in-memory adapters are used when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the process environment.
    ///
    /// Keys are `OFFER_MIGRATION__<SECTION>__<FIELD>`, for example
    /// `OFFER_MIGRATION__WIZARD__SESSION_TTL_SECS=900` or
    /// `OFFER_MIGRATION__REDIS__URL=redis://cache:6379`. Anything unset keeps
    /// its default.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("OFFER_MIGRATION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// `load` followed by `validate`.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.wizard.validate()?;
        self.logging.validate()?;
        match &self.redis {
            Some(redis) => redis.validate(),
            None => Ok(()),
        }
    }
}
