//! Keylease - distributed lease lock over a key-value store
//!
//! This crate provides:
//! - `Lease`: a single non-blocking lock attempt with background renewal
//! - `LockStore`: the store contract (conditional set, compare-and-delete, TTL refresh)
//! - `MemoryStore`: an in-process store for tests and single-process use
//! - `LockClient`: a lease factory bound to a store and configuration
//! - Prometheus metrics for lock operations and renewals
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use keylease::{LockClient, MemoryStore};
//!
//! # async fn example() -> keylease::Result<()> {
//! let client = LockClient::new(Arc::new(MemoryStore::new()));
//!
//! let mut lease = client.try_lock("orders").await?;
//! // ----- critical section -----
//! lease.unlock().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod store;

pub use client::LockClient;
pub use config::LockConfig;
pub use error::{LockError, Result, StoreError, StoreResult};
pub use lock::{Lease, LeaseState};
pub use metrics::LockMetrics;
pub use store::{DeleteOutcome, LockStore, MemoryStore, SetOutcome};
