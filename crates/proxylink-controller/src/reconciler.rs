//! The reconciliation engine: one read-compute-write cycle per event.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::merge::{MergeError, merge, remove};
use proxylink_core::{
    ALLOW_INCLUSION_ANNOTATION, CoreError, DelegationIntent, FINALIZER, NamespacedName,
    ProxyResource,
};
use proxylink_storage::{ResourceStore, StoreError};

/// Errors surfacing from a single reconciliation.
///
/// Only store-level transients are retryable; everything else is terminal
/// for the event and recurs naturally with the next relevant change.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Intent(#[from] CoreError),

    #[error("parent not found: {parent}")]
    ParentNotFound { parent: NamespacedName },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Whether re-running the whole reconciliation from the read step can
    /// succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

/// Reconciles one resource at a time against the store.
///
/// Level-triggered: the input is only a namespaced identifier; all state
/// is re-fetched, so stale or duplicate events are harmless.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    field_owner: String,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ResourceStore>, field_owner: impl Into<String>) -> Self {
        Self {
            store,
            field_owner: field_owner.into(),
        }
    }

    /// Process one event for the resource behind `key`.
    ///
    /// A missing subject is a stale event and a no-op. A resource without
    /// a parent annotation is unmanaged and ignored.
    pub async fn reconcile(&self, key: &NamespacedName) -> Result<(), ReconcileError> {
        let child = match self.store.get(key).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "subject already gone, ignoring stale event");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let intent = DelegationIntent::from_annotations(&child.annotations)?;
        let Some(parent_key) = intent.parent_ref.clone() else {
            return Ok(());
        };

        if !child.is_deleting() {
            let child = self.ensure_cleanup_marker(child).await?;
            self.apply_inclusion(&child, &intent, &parent_key).await
        } else if child.has_finalizer(FINALIZER) {
            self.cleanup_parent(&child, &parent_key).await?;
            self.detach_cleanup_marker(child).await
        } else {
            // Terminated: marker already detached, the store finishes the
            // erasure on its own.
            Ok(())
        }
    }

    /// Attach the cleanup marker before the first merge, so a later
    /// deletion is always observed while the parent still lists the child.
    async fn ensure_cleanup_marker(
        &self,
        mut child: ProxyResource,
    ) -> Result<ProxyResource, ReconcileError> {
        if child.has_finalizer(FINALIZER) {
            return Ok(child);
        }
        child.add_finalizer(FINALIZER);
        let written = self.store.update(child, &self.field_owner).await?;
        debug!(key = %written.key, "cleanup marker attached");
        Ok(written)
    }

    async fn apply_inclusion(
        &self,
        child: &ProxyResource,
        intent: &DelegationIntent,
        parent_key: &NamespacedName,
    ) -> Result<(), ReconcileError> {
        let mut parent = match self.store.get(parent_key).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                return Err(ReconcileError::ParentNotFound {
                    parent: parent_key.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let parent_allows = parent.annotation(ALLOW_INCLUSION_ANNOTATION) == Some("true");
        let prefix = intent.desired_prefix(&child.key.name);
        let next = merge(&parent.includes, &child.key, &prefix, parent_allows)?;

        if next == parent.includes {
            debug!(child = %child.key, parent = %parent_key, "includes already current");
            return Ok(());
        }

        parent.includes = next;
        self.store.update(parent, &self.field_owner).await?;
        info!(child = %child.key, parent = %parent_key, prefix = %prefix, "parent includes reconciled");
        Ok(())
    }

    /// Remove the child's entry from its parent, tolerating an absent
    /// parent or entry: cleanup is idempotent.
    async fn cleanup_parent(
        &self,
        child: &ProxyResource,
        parent_key: &NamespacedName,
    ) -> Result<(), ReconcileError> {
        let mut parent = match self.store.get(parent_key).await {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                debug!(child = %child.key, parent = %parent_key, "parent already gone, nothing to clean up");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let next = remove(&parent.includes, &child.key);
        if next.len() == parent.includes.len() {
            return Ok(());
        }

        parent.includes = next;
        self.store.update(parent, &self.field_owner).await?;
        info!(child = %child.key, parent = %parent_key, "parent includes cleaned up");
        Ok(())
    }

    /// Detach the cleanup marker so the store may finalize the deletion.
    async fn detach_cleanup_marker(&self, mut child: ProxyResource) -> Result<(), ReconcileError> {
        child.remove_finalizer(FINALIZER);
        self.store.update(child, &self.field_owner).await?;
        Ok(())
    }
}
