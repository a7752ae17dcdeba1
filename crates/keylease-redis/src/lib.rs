//! Keylease Redis - Redis-backed lock store
//!
//! Implements the keylease store contract on a single Redis instance:
//! - conditional set via `SET key value NX PX ttl`
//! - compare-and-delete via a Lua script evaluated server-side
//! - TTL refresh via `PEXPIRE`

pub mod config;
pub mod scripts;
pub mod store;

pub use config::RedisConfig;
pub use store::RedisStore;
