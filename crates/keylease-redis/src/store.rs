// Redis lock store
// One connection manager shared by every lease; reconnects are handled by redis-rs

use std::time::Duration;

use async_trait::async_trait;
use keylease::{DeleteOutcome, LockStore, SetOutcome, StoreError, StoreResult};
use redis::aio::ConnectionManager;
use redis::{RedisError, Script};
use tracing::info;

use crate::config::RedisConfig;
use crate::scripts::RELEASE_LOCK;

/// [`LockStore`] backed by a Redis server
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    release_script: Script,
}

impl RedisStore {
    /// Bind an existing connection manager
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            release_script: Script::new(RELEASE_LOCK),
        }
    }

    /// Open a connection to `url`
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;

        info!("Connected lock store to Redis");
        Ok(Self::new(conn))
    }

    pub async fn from_config(config: &RedisConfig) -> StoreResult<Self> {
        Self::connect(&config.url).await
    }
}

#[async_trait]
impl LockStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> StoreResult<SetOutcome> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        match reply.as_deref() {
            Some("OK") => Ok(SetOutcome::Created),
            None => Ok(SetOutcome::AlreadyExists),
            Some(other) => Err(StoreError::Protocol(format!("SET NX returned {}", other))),
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome> {
        let mut conn = self.conn.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        match deleted {
            1 => Ok(DeleteOutcome::Deleted),
            0 => Ok(DeleteOutcome::NotMatched),
            n => Err(StoreError::Protocol(format!(
                "release script deleted {} keys",
                n
            ))),
        }
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();

        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;

        Ok(updated == 1)
    }
}

/// TTL in whole milliseconds; Redis rejects a zero expiry
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}
