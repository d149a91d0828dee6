//! Store trait the controller reconciles against.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::events::StoreEvent;
use proxylink_core::{NamespacedName, ProxyResource};

/// The resource store collaborator.
///
/// Implementations must be thread-safe (`Send + Sync`). Updates are
/// whole-object replacements with optimistic concurrency: the store
/// compares the caller's `meta.version` against the stored one and
/// rejects stale writes, which is the principal correctness mechanism
/// when reconciliations run concurrently.
///
/// # Example
///
/// ```ignore
/// use proxylink_storage::{ResourceStore, StoreError};
/// use proxylink_core::NamespacedName;
///
/// async fn parent_allows(store: &dyn ResourceStore, key: &NamespacedName) -> Result<bool, StoreError> {
///     let parent = store.get(key).await?;
///     Ok(parent.annotation("allow-inclusion") == Some("true"))
/// }
/// ```
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Reads a resource by its namespaced key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the resource does not exist;
    /// other variants only for infrastructure issues.
    async fn get(&self, key: &NamespacedName) -> Result<ProxyResource, StoreError>;

    /// Creates a new resource.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a resource with the same
    /// key exists.
    async fn create(&self, resource: ProxyResource) -> Result<ProxyResource, StoreError>;

    /// Replaces a resource wholesale.
    ///
    /// `field_owner` tags the writer for provenance. On success the store
    /// bumps `meta.version`, stamps `meta.last_updated`, and emits a watch
    /// event. If the resource carries a deletion timestamp and its
    /// finalizer list is empty, the write finalizes the deletion and the
    /// object is erased.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the resource does not exist.
    /// Returns `StoreError::VersionConflict` if the stored version differs
    /// from `resource.meta.version` — the caller must re-read and retry.
    async fn update(
        &self,
        resource: ProxyResource,
        field_owner: &str,
    ) -> Result<ProxyResource, StoreError>;

    /// Requests deletion of a resource.
    ///
    /// If finalizers are present the object is only marked (deletion
    /// timestamp stamped) and remains visible until they are cleared;
    /// otherwise it is erased immediately. Deleting a missing or
    /// already-marked resource is an idempotent no-op.
    async fn delete(&self, key: &NamespacedName, field_owner: &str) -> Result<(), StoreError>;

    /// Subscribes to change notifications.
    ///
    /// Events sent before subscription are not received; level-triggering
    /// makes that harmless for a subscriber that lists current state first
    /// or is driven only by future changes.
    fn watch(&self) -> broadcast::Receiver<StoreEvent>;

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

// Ensure the trait is object-safe by using it as a trait object.
#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that ResourceStore is object-safe
    fn _assert_store_object_safe(_: &dyn ResourceStore) {}
}
