//! Lease acquisition and release
//!
//! A [`Lease`] is one attempt to own a resource key. `try_lock` performs a
//! single conditional set and starts background renewal on success;
//! `unlock` stops renewal and removes the key only if it still carries this
//! lease's owner token.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{LeaseState, MAX_TTL, MIN_TTL, renew_period};
use super::renewer::Renewer;
use crate::config::{DEFAULT_RENEW_DIVISOR, DEFAULT_TTL_MS};
use crate::error::{LockError, Result};
use crate::metrics::{
    LockMetrics, OP_TRY_LOCK, OP_UNLOCK, OUTCOME_ACQUIRED, OUTCOME_ERROR, OUTCOME_HELD,
    OUTCOME_NOT_OWNER, OUTCOME_RELEASED, Timer,
};
use crate::store::{DeleteOutcome, LockStore, SetOutcome};

/// Exclusive, renewable hold on a resource key
pub struct Lease {
    owner_token: String,
    resource_key: String,
    ttl: Duration,
    renew_period: Duration,
    state: LeaseState,
    store: Arc<dyn LockStore>,
    renewer: Option<Renewer>,
    metrics: Option<Arc<LockMetrics>>,
}

impl Lease {
    /// Create an idle lease with the default 30 second TTL
    pub fn new(resource_key: impl Into<String>, store: Arc<dyn LockStore>) -> Result<Self> {
        Self::with_ttl(resource_key, store, Duration::from_millis(DEFAULT_TTL_MS))
    }

    /// Create an idle lease with the given TTL
    pub fn with_ttl(
        resource_key: impl Into<String>,
        store: Arc<dyn LockStore>,
        ttl: Duration,
    ) -> Result<Self> {
        Self::build(resource_key.into(), store, ttl, DEFAULT_RENEW_DIVISOR)
    }

    pub(crate) fn build(
        resource_key: String,
        store: Arc<dyn LockStore>,
        ttl: Duration,
        renew_divisor: u32,
    ) -> Result<Self> {
        if resource_key.is_empty() {
            return Err(LockError::usage("resource key must not be empty"));
        }
        if ttl < MIN_TTL || ttl > MAX_TTL {
            return Err(LockError::usage(format!(
                "ttl must be between {:?} and {:?}, got {:?}",
                MIN_TTL, MAX_TTL, ttl
            )));
        }

        Ok(Self {
            owner_token: Uuid::new_v4().to_string(),
            resource_key,
            ttl,
            renew_period: renew_period(ttl, renew_divisor),
            state: LeaseState::Idle,
            store,
            renewer: None,
            metrics: None,
        })
    }

    /// Record operation outcomes on the given collector
    pub fn with_metrics(mut self, metrics: Arc<LockMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn owner_token(&self) -> &str {
        &self.owner_token
    }

    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn renew_period(&self) -> Duration {
        self.renew_period
    }

    pub fn state(&self) -> LeaseState {
        self.state
    }

    /// Whether this lease believes it owns the key.
    ///
    /// The store may have expired the key already; that only shows up as
    /// `NotOwner` from [`unlock`](Self::unlock).
    pub fn is_held(&self) -> bool {
        self.state == LeaseState::Held
    }

    /// Make one attempt to acquire the key.
    ///
    /// Returns `LockHeld` if another owner has it. An idle lease may try
    /// again; a held or released one returns `Usage` without contacting the
    /// store.
    pub async fn try_lock(&mut self) -> Result<()> {
        if self.state != LeaseState::Idle {
            return Err(LockError::usage(format!(
                "try_lock called on a {} lease for '{}'",
                self.state, self.resource_key
            )));
        }

        let timer = Timer::start(self.metrics.as_deref(), OP_TRY_LOCK);

        match self
            .store
            .set_if_absent(&self.resource_key, &self.owner_token, self.ttl)
            .await
        {
            Ok(SetOutcome::Created) => {
                self.state = LeaseState::Held;
                self.renewer = Some(Renewer::spawn(
                    self.store.clone(),
                    self.resource_key.clone(),
                    self.ttl,
                    self.renew_period,
                    self.metrics.clone(),
                ));
                timer.finish(OUTCOME_ACQUIRED);

                debug!(
                    key = %self.resource_key,
                    owner = %self.owner_token,
                    ttl = ?self.ttl,
                    "Lock acquired"
                );
                Ok(())
            }
            Ok(SetOutcome::AlreadyExists) => {
                timer.finish(OUTCOME_HELD);
                debug!(key = %self.resource_key, "Lock held by another owner");
                Err(LockError::LockHeld {
                    key: self.resource_key.clone(),
                })
            }
            Err(e) => {
                timer.finish(OUTCOME_ERROR);
                warn!(key = %self.resource_key, error = %e, "Lock acquisition failed");
                Err(e.into())
            }
        }
    }

    /// Stop renewal and release the key if this lease still owns it.
    ///
    /// Renewal is fully stopped before the delete is sent. If the key now
    /// holds another owner's token, or is gone, nothing is deleted and
    /// `NotOwner` is returned. A store failure leaves the lease held so the
    /// release can be retried.
    pub async fn unlock(&mut self) -> Result<()> {
        if self.state != LeaseState::Held {
            return Err(LockError::usage(format!(
                "unlock called on a {} lease for '{}'",
                self.state, self.resource_key
            )));
        }

        if let Some(renewer) = self.renewer.take() {
            renewer.stop().await;
        }

        let timer = Timer::start(self.metrics.as_deref(), OP_UNLOCK);

        match self
            .store
            .compare_and_delete(&self.resource_key, &self.owner_token)
            .await
        {
            Ok(DeleteOutcome::Deleted) => {
                self.state = LeaseState::Released;
                timer.finish(OUTCOME_RELEASED);
                debug!(key = %self.resource_key, owner = %self.owner_token, "Lock released");
                Ok(())
            }
            Ok(DeleteOutcome::NotMatched) => {
                self.state = LeaseState::Released;
                timer.finish(OUTCOME_NOT_OWNER);
                warn!(
                    key = %self.resource_key,
                    owner = %self.owner_token,
                    "Lease lapsed before release"
                );
                Err(LockError::NotOwner {
                    key: self.resource_key.clone(),
                    owner: self.owner_token.clone(),
                })
            }
            Err(e) => {
                timer.finish(OUTCOME_ERROR);
                warn!(key = %self.resource_key, error = %e, "Lock release failed");
                Err(e.into())
            }
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("owner_token", &self.owner_token)
            .field("resource_key", &self.resource_key)
            .field("ttl", &self.ttl)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        // The renewer exits once its shutdown sender is dropped with it
        if self.state == LeaseState::Held {
            warn!(
                key = %self.resource_key,
                owner = %self.owner_token,
                ttl = ?self.ttl,
                "Lease dropped while held, key will expire after its ttl"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_new_lease_is_idle() {
        let lease = Lease::new("orders", memory_store()).unwrap();

        assert_eq!(lease.state(), LeaseState::Idle);
        assert_eq!(lease.resource_key(), "orders");
        assert_eq!(lease.ttl(), Duration::from_secs(30));
        assert_eq!(lease.renew_period(), Duration::from_secs(10));
        assert!(!lease.is_held());
        assert!(Uuid::parse_str(lease.owner_token()).is_ok());
    }

    #[test]
    fn test_owner_token_is_unique() {
        let store = memory_store();
        let a = Lease::new("orders", store.clone()).unwrap();
        let b = Lease::new("orders", store).unwrap();
        assert_ne!(a.owner_token(), b.owner_token());
    }

    #[test]
    fn test_invalid_construction() {
        let result = Lease::new("", memory_store());
        assert!(matches!(result, Err(LockError::Usage(_))));

        let result = Lease::with_ttl("orders", memory_store(), Duration::ZERO);
        assert!(matches!(result, Err(LockError::Usage(_))));

        let result = Lease::with_ttl("orders", memory_store(), Duration::MAX);
        assert!(matches!(result, Err(LockError::Usage(_))));

        let lease = Lease::with_ttl("orders", memory_store(), MAX_TTL).unwrap();
        assert_eq!(lease.ttl(), MAX_TTL);
    }

    #[tokio::test]
    async fn test_longest_ttl_locks_and_renews() {
        let store = memory_store();
        let mut lease = Lease::build("orders".to_string(), store.clone(), MAX_TTL, 1).unwrap();
        assert_eq!(lease.renew_period(), MAX_TTL);

        lease.try_lock().await.unwrap();
        assert!(store.ttl("orders").is_some());

        lease.unlock().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_lock_unlock() {
        let store = memory_store();
        let mut lease = Lease::new("orders", store.clone()).unwrap();

        lease.try_lock().await.unwrap();
        assert!(lease.is_held());
        assert_eq!(store.get("orders").as_deref(), Some(lease.owner_token()));

        lease.unlock().await.unwrap();
        assert_eq!(lease.state(), LeaseState::Released);
        assert!(store.get("orders").is_none());
    }

    #[tokio::test]
    async fn test_lock_held_stays_idle() {
        let store = memory_store();
        let mut first = Lease::new("orders", store.clone()).unwrap();
        let mut second = Lease::new("orders", store.clone()).unwrap();

        first.try_lock().await.unwrap();
        let err = second.try_lock().await.unwrap_err();
        assert!(matches!(err, LockError::LockHeld { ref key } if key == "orders"));
        assert_eq!(second.state(), LeaseState::Idle);

        // Same idle lease may try again once the key is free
        first.unlock().await.unwrap();
        second.try_lock().await.unwrap();
        assert!(second.is_held());
        second.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_usage_errors() {
        let store = memory_store();
        let mut lease = Lease::new("orders", store).unwrap();

        // Unlock before lock
        assert!(matches!(lease.unlock().await, Err(LockError::Usage(_))));
        assert_eq!(lease.state(), LeaseState::Idle);

        lease.try_lock().await.unwrap();
        // Double lock
        assert!(matches!(lease.try_lock().await, Err(LockError::Usage(_))));
        assert!(lease.is_held());

        lease.unlock().await.unwrap();
        // Lock after release
        assert!(matches!(lease.try_lock().await, Err(LockError::Usage(_))));
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let store = memory_store();
        let metrics = Arc::new(LockMetrics::new().unwrap());
        let mut first = Lease::new("orders", store.clone())
            .unwrap()
            .with_metrics(metrics.clone());
        let mut second = Lease::new("orders", store.clone())
            .unwrap()
            .with_metrics(metrics.clone());

        first.try_lock().await.unwrap();
        let _ = second.try_lock().await;
        first.unlock().await.unwrap();

        assert_eq!(metrics.operation_count(OP_TRY_LOCK, OUTCOME_ACQUIRED), 1);
        assert_eq!(metrics.operation_count(OP_TRY_LOCK, OUTCOME_HELD), 1);
        assert_eq!(metrics.operation_count(OP_UNLOCK, OUTCOME_RELEASED), 1);
    }

    #[test]
    fn test_debug_omits_store() {
        let lease = Lease::new("orders", memory_store()).unwrap();
        let output = format!("{:?}", lease);
        assert!(output.contains("orders"));
        assert!(output.contains("Idle"));
    }
}
