//! Redis connection settings

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Environment variable prefix, e.g. `KEYLEASE_REDIS_URL`
pub const ENV_PREFIX: &str = "KEYLEASE_REDIS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL, `redis://[user:password@]host:port/db`
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl RedisConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Load from `KEYLEASE_REDIS_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    pub(crate) fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        let settings = Config::builder().add_source(environment).build()?;

        Ok(Self {
            url: settings
                .get_string("url")
                .unwrap_or(DEFAULT_REDIS_URL.to_string()),
        })
    }
}
