//! # fiscus-config
//!
//! Layered run configuration for Fiscus using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`FISCUS_*` prefix, `__` as separator)
//! 2. Built-in defaults
//!
//! On-disk configuration files are owned by an external collaborator, so
//! no TOML layer exists here; `.env` loading via dotenvy is supported for
//! local development and tests.
//!
//! # Environment Variable Mapping
//!
//! Figment maps `FISCUS_CRM__BASE_URL` -> `crm.base_url`,
//! `FISCUS_LIMITS__BATCH_SIZE` -> `limits.batch_size`, etc. The `__`
//! (double underscore) separates nested config sections.

mod crm;
mod error;
mod limits;

pub use crm::CrmConfig;
pub use error::ConfigError;
pub use limits::LimitsConfig;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FiscusConfig {
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl FiscusConfig {
    /// Load configuration from defaults plus environment variables.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] if `.env`
    /// file loading is needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of
    /// its allowed range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of
    /// its allowed range.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("FISCUS_").split("__"))
    }

    /// Range checks on tuning values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-positive rate
    /// ceiling, a zero batch size, or an in-flight bound of zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.requests_per_second".into(),
                reason: "must be positive".into(),
            });
        }
        if self.limits.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.batch_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.limits.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_in_flight".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.limits.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.retry_max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Fail unless the CRM section carries both endpoint and credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when either is missing.
    pub fn require_crm(&self) -> Result<&CrmConfig, ConfigError> {
        if self.crm.is_configured() {
            Ok(&self.crm)
        } else {
            Err(ConfigError::NotConfigured { section: "crm".into() })
        }
    }
}
