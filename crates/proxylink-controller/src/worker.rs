//! Watch-driven worker: drains change notifications and applies retry
//! policy around the engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::reconciler::{ReconcileError, Reconciler};
use proxylink_core::NamespacedName;
use proxylink_storage::ResourceStore;

/// Retry policy for transient store failures.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Attempts per event, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// Consumes store events one at a time and reconciles each subject.
///
/// Processing is sequential: the merge protocol is a non-transactional
/// read-modify-write against a shared parent, so two children of the same
/// parent must not interleave their read and write halves within one
/// worker. Across workers the store's version check plus full-cycle retry
/// provides the same guarantee.
pub struct Controller {
    reconciler: Reconciler,
    store: Arc<dyn ResourceStore>,
    config: WorkerConfig,
}

impl Controller {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        field_owner: impl Into<String>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone(), field_owner),
            store,
            config,
        }
    }

    /// Run until the store's watch channel closes.
    pub async fn run(&self) {
        let mut events = self.store.watch();
        info!(backend = self.store.backend_name(), "controller started");

        loop {
            match events.recv().await {
                Ok(event) => self.process(&event.key).await,
                Err(RecvError::Lagged(skipped)) => {
                    // Harmless under level-triggering: the next event for
                    // any affected resource re-derives full state.
                    warn!(skipped, "watch channel lagged, resuming");
                }
                Err(RecvError::Closed) => {
                    info!("watch channel closed, controller stopping");
                    break;
                }
            }
        }
    }

    /// Reconcile one key, retrying the whole cycle on transient errors.
    pub async fn process(&self, key: &NamespacedName) {
        for attempt in 1..=self.config.max_attempts {
            match self.reconciler.reconcile(key).await {
                Ok(()) => return,
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    debug!(key = %key, attempt, error = %e, "transient failure, retrying from read step");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    report_terminal(key, &e, attempt);
                    return;
                }
            }
        }
    }
}

fn report_terminal(key: &NamespacedName, error: &ReconcileError, attempts: u32) {
    match error {
        // Operator-actionable: the child stays annotated but unreflected
        // until the conflict is resolved.
        ReconcileError::Merge(_)
        | ReconcileError::Intent(_)
        | ReconcileError::ParentNotFound { .. } => {
            warn!(key = %key, error = %error, "reconciliation rejected");
        }
        ReconcileError::Store(_) => {
            error!(key = %key, attempts, error = %error, "reconciliation failed");
        }
    }
}
