//! Lease factory bound to a store and configuration

use std::sync::Arc;
use std::time::Duration;

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::lock::Lease;
use crate::metrics::LockMetrics;
use crate::store::LockStore;

/// Creates leases against one store.
///
/// Cloning is cheap; every lease it hands out gets a fresh owner token.
#[derive(Clone)]
pub struct LockClient {
    store: Arc<dyn LockStore>,
    config: LockConfig,
    metrics: Option<Arc<LockMetrics>>,
}

impl LockClient {
    /// Create a client with the default configuration
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            config: LockConfig::default(),
            metrics: None,
        }
    }

    /// Create a client with a custom configuration
    pub fn with_config(store: Arc<dyn LockStore>, config: LockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            metrics: None,
        })
    }

    /// Attach a metrics collector shared by all leases of this client
    pub fn with_metrics(mut self, metrics: Arc<LockMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<LockMetrics>> {
        self.metrics.as_ref()
    }

    /// Build an idle lease for `name` with the configured TTL
    pub fn lease(&self, name: &str) -> Result<Lease> {
        self.lease_with_ttl(name, self.config.default_ttl())
    }

    /// Build an idle lease for `name` with an explicit TTL
    pub fn lease_with_ttl(&self, name: &str, ttl: Duration) -> Result<Lease> {
        if name.is_empty() {
            return Err(LockError::usage("resource name must not be empty"));
        }

        let lease = Lease::build(
            self.config.resource_key(name),
            self.store.clone(),
            ttl,
            self.config.renew_divisor,
        )?;

        Ok(match &self.metrics {
            Some(metrics) => lease.with_metrics(metrics.clone()),
            None => lease,
        })
    }

    /// Build a lease for `name` and make one acquisition attempt
    pub async fn try_lock(&self, name: &str) -> Result<Lease> {
        let mut lease = self.lease(name)?;
        lease.try_lock().await?;
        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LeaseState;
    use crate::store::MemoryStore;

    #[test]
    fn test_lease_uses_config() {
        let config = LockConfig::new()
            .with_ttl(Duration::from_secs(6))
            .with_renew_divisor(2)
            .with_key_prefix("lock:");
        let client = LockClient::with_config(Arc::new(MemoryStore::new()), config).unwrap();

        let lease = client.lease("orders").unwrap();
        assert_eq!(lease.resource_key(), "lock:orders");
        assert_eq!(lease.ttl(), Duration::from_secs(6));
        assert_eq!(lease.renew_period(), Duration::from_secs(3));
        assert_eq!(lease.state(), LeaseState::Idle);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LockConfig::new().with_renew_divisor(0);
        let result = LockClient::with_config(Arc::new(MemoryStore::new()), config);
        assert!(matches!(result, Err(LockError::Usage(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        let client = LockClient::new(Arc::new(MemoryStore::new()));
        assert!(matches!(client.lease(""), Err(LockError::Usage(_))));
    }

    #[tokio::test]
    async fn test_try_lock_convenience() {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(LockMetrics::new().unwrap());
        let client = LockClient::new(store.clone()).with_metrics(metrics.clone());

        let mut lease = client.try_lock("orders").await.unwrap();
        assert!(lease.is_held());

        let err = client.try_lock("orders").await.unwrap_err();
        assert!(matches!(err, LockError::LockHeld { .. }));

        lease.unlock().await.unwrap();
        assert!(store.is_empty());
        assert!(client.metrics().is_some());
    }
}
