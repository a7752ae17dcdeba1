// Background lease renewal
// Refreshes the store TTL of a held lease every period until stopped

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::metrics::{LockMetrics, RENEWAL_ERROR, RENEWAL_MISSING, RENEWAL_OK};
use crate::store::LockStore;

/// Handle to a running renewal task.
///
/// Dropping the handle closes the shutdown channel, which the task treats
/// the same as an explicit stop.
pub(crate) struct Renewer {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Renewer {
    /// Spawn the renewal loop. The first refresh happens one period from now.
    pub(crate) fn spawn(
        store: Arc<dyn LockStore>,
        key: String,
        ttl: Duration,
        period: Duration,
        metrics: Option<Arc<LockMetrics>>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!(key = %key, "Lease renewer stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        renew_once(store.as_ref(), &key, ttl, metrics.as_deref()).await;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the task and wait until it has exited.
    ///
    /// A refresh that was already running completes before this returns, so
    /// no refresh is issued once the caller proceeds.
    pub(crate) async fn stop(self) {
        let Self {
            shutdown_tx,
            handle,
        } = self;

        // Full channel means a stop is already pending
        let _ = shutdown_tx.try_send(());
        drop(shutdown_tx);

        if let Err(e) = handle.await
            && e.is_panic()
        {
            warn!(error = %e, "Lease renewer panicked");
        }
    }
}

async fn renew_once(
    store: &dyn LockStore,
    key: &str,
    ttl: Duration,
    metrics: Option<&LockMetrics>,
) {
    let outcome = match store.refresh_ttl(key, ttl).await {
        Ok(true) => {
            debug!(key = %key, ttl = ?ttl, "Lease renewed");
            RENEWAL_OK
        }
        Ok(false) => {
            warn!(key = %key, "Lease key missing on renewal, lease may have lapsed");
            RENEWAL_MISSING
        }
        Err(e) => {
            // Transient failures are retried on the next tick
            warn!(key = %key, error = %e, "Lease renewal failed");
            RENEWAL_ERROR
        }
    };

    if let Some(metrics) = metrics {
        metrics.record_renewal(outcome);
    }
}
