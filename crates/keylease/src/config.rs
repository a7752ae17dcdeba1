//! Lock client configuration
//!
//! Values default to a 30 second lease renewed three times per window and can
//! be overridden from `KEYLEASE_*` environment variables.

use std::time::Duration;

use anyhow::Context;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::error::{LockError, Result};
use crate::lock::{MAX_TTL, MIN_TTL};

/// Default lease TTL in milliseconds (30 seconds)
pub const DEFAULT_TTL_MS: u64 = 30_000;

/// Default number of renewals per lease window
pub const DEFAULT_RENEW_DIVISOR: u32 = 3;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "KEYLEASE";

pub const DEFAULT_TTL_MS_PROPERTY: &str = "default_ttl_ms";
pub const RENEW_DIVISOR_PROPERTY: &str = "renew_divisor";
pub const KEY_PREFIX_PROPERTY: &str = "key_prefix";

/// Configuration for a [`LockClient`](crate::LockClient)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lease TTL used when none is given explicitly
    pub default_ttl_ms: u64,
    /// Renewals per lease window; the renewer ticks every `ttl / renew_divisor`
    pub renew_divisor: u32,
    /// Prepended to every resource name handed to the client
    pub key_prefix: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            renew_divisor: DEFAULT_RENEW_DIVISOR,
            key_prefix: String::new(),
        }
    }
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `KEYLEASE_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; set but malformed ones are
    /// an error.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    pub(crate) fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        let settings = Config::builder().add_source(environment).build()?;
        let defaults = Self::default();

        let default_ttl_ms = match optional(settings.get_int(DEFAULT_TTL_MS_PROPERTY))? {
            Some(v) => u64::try_from(v).with_context(|| {
                format!("{} must not be negative, got {}", DEFAULT_TTL_MS_PROPERTY, v)
            })?,
            None => defaults.default_ttl_ms,
        };
        let renew_divisor = match optional(settings.get_int(RENEW_DIVISOR_PROPERTY))? {
            Some(v) => u32::try_from(v).with_context(|| {
                format!("{} is out of range, got {}", RENEW_DIVISOR_PROPERTY, v)
            })?,
            None => defaults.renew_divisor,
        };

        let config = Self {
            default_ttl_ms,
            renew_divisor,
            key_prefix: optional(settings.get_string(KEY_PREFIX_PROPERTY))?
                .unwrap_or(defaults.key_prefix),
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the default lease TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how many renewals happen per lease window
    pub fn with_renew_divisor(mut self, divisor: u32) -> Self {
        self.renew_divisor = divisor;
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Full store key for a resource name
    pub fn resource_key(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    /// Reject settings under which no lease could be renewed
    pub fn validate(&self) -> Result<()> {
        let ttl = self.default_ttl();
        if ttl < MIN_TTL || ttl > MAX_TTL {
            return Err(LockError::usage(format!(
                "default_ttl_ms must be between {} and {}, got {}",
                MIN_TTL.as_millis(),
                MAX_TTL.as_millis(),
                self.default_ttl_ms
            )));
        }
        if self.renew_divisor == 0 {
            return Err(LockError::usage("renew_divisor must be at least 1"));
        }
        Ok(())
    }
}

/// Treat a missing key as unset while still surfacing malformed values
fn optional<T>(
    value: std::result::Result<T, ConfigError>,
) -> std::result::Result<Option<T>, ConfigError> {
    match value {
        Ok(v) => Ok(Some(v)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
