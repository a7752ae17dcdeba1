//! Store adapter contract
//!
//! A lease only needs three atomic primitives from the backing store:
//! - conditional set ("create if absent, with expiry")
//! - compare-and-delete (executed server-side as one atomic step)
//! - TTL refresh by key

mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Result of a conditional set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key did not exist and now holds the given value
    Created,
    /// The key already exists; nothing was written
    AlreadyExists,
}

/// Result of a compare-and-delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The stored value matched and the key was removed
    Deleted,
    /// The key was absent or held a different value; nothing was removed
    NotMatched,
}

/// Key-value store capable of backing a lease.
///
/// `compare_and_delete` must be atomic on the store side. A client-side
/// read followed by a delete leaves a gap in which another owner can take
/// the key.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key := value` with expiry `ttl`, only if `key` does not exist
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> StoreResult<SetOutcome>;

    /// Delete `key` only if its current value equals `expected`
    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome>;

    /// Reset the remaining expiry of `key` to `ttl` without touching its value.
    ///
    /// Returns `false` when the key did not exist.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<bool>;
}
