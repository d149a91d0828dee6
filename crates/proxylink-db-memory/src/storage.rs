use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::{Compute, HashMap as PapayaHashMap, Operation};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use proxylink_core::{NamespacedName, ProxyResource};
use proxylink_storage::{ResourceStore, StoreError, StoreEvent};

/// Default buffer size for the watch channel. Slow receivers past this
/// limit observe a lag error and resume; level-triggering makes the
/// skipped events harmless.
const DEFAULT_EVENT_BUFFER: usize = 1024;

pub type StorageKey = String; // Format: "namespace/name"

pub(crate) fn make_storage_key(key: &NamespacedName) -> StorageKey {
    key.to_string()
}

/// In-memory resource store using a papaya lock-free HashMap.
///
/// This backend provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Optimistic concurrency through a monotonic version counter
/// - Two-phase deletion honoring finalizers
/// - Level-triggered watch notifications over a broadcast channel
#[derive(Debug)]
pub struct MemoryStore {
    data: PapayaHashMap<StorageKey, ProxyResource>,
    version_counter: AtomicU64,
    sender: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Creates a new in-memory store with the default watch buffer.
    pub fn new() -> Self {
        Self::with_event_buffer(DEFAULT_EVENT_BUFFER)
    }

    /// Creates a new in-memory store with a custom watch buffer size.
    pub fn with_event_buffer(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            data: PapayaHashMap::new(),
            version_counter: AtomicU64::new(1),
            sender,
        }
    }

    /// Generates the next version token.
    fn next_version(&self) -> u64 {
        self.version_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Emits a watch event for the given key. Send results are ignored:
    /// zero subscribers is a valid state.
    fn notify(&self, key: &NamespacedName) {
        let _ = self.sender.send(StoreEvent::new(key.clone()));
    }

    /// Number of live resources.
    pub fn count(&self) -> usize {
        self.data.pin().len()
    }

    /// Whether a resource currently exists under the given key.
    pub fn exists(&self, key: &NamespacedName) -> bool {
        self.data.pin().contains_key(&make_storage_key(key))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, key: &NamespacedName) -> Result<ProxyResource, StoreError> {
        let guard = self.data.pin();
        guard
            .get(&make_storage_key(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    async fn create(&self, mut resource: ProxyResource) -> Result<ProxyResource, StoreError> {
        let storage_key = make_storage_key(&resource.key);
        let guard = self.data.pin();

        resource.meta.version = self.next_version();
        resource.meta.last_updated = OffsetDateTime::now_utc();
        if guard.try_insert(storage_key, resource.clone()).is_err() {
            return Err(StoreError::already_exists(&resource.key));
        }
        self.notify(&resource.key);
        Ok(resource)
    }

    async fn update(
        &self,
        resource: ProxyResource,
        field_owner: &str,
    ) -> Result<ProxyResource, StoreError> {
        let storage_key = make_storage_key(&resource.key);
        let guard = self.data.pin();

        // A deletion-requested object whose finalizers have all been
        // cleared is finalized by this write: the object is erased.
        let finalize = resource.is_deleting() && resource.finalizers.is_empty();

        // The version check and the write are one atomic step; checking
        // first and inserting after would let two writers holding the same
        // read version both pass, silently losing one update.
        let outcome = guard.compute(storage_key, |entry| match entry {
            None => Operation::Abort(StoreError::not_found(&resource.key)),
            Some((_, current)) if current.meta.version != resource.meta.version => {
                Operation::Abort(StoreError::version_conflict(
                    &resource.key,
                    resource.meta.version,
                    current.meta.version,
                ))
            }
            Some(_) if finalize => Operation::Remove,
            Some(_) => {
                let mut updated = resource.clone();
                updated.meta.version = self.next_version();
                updated.meta.last_updated = OffsetDateTime::now_utc();
                updated.meta.field_owner = Some(field_owner.to_string());
                Operation::Insert(updated)
            }
        });

        match outcome {
            Compute::Updated {
                new: (_, stored), ..
            } => {
                let stored = stored.clone();
                self.notify(&stored.key);
                Ok(stored)
            }
            Compute::Removed(..) => {
                self.notify(&resource.key);
                tracing::debug!(key = %resource.key, "resource finalized and erased");
                Ok(resource)
            }
            Compute::Aborted(err) => Err(err),
            // The closure aborts on a missing entry, so an insert into an
            // empty slot cannot happen.
            Compute::Inserted(..) => Err(StoreError::internal("update created a new entry")),
        }
    }

    async fn delete(&self, key: &NamespacedName, field_owner: &str) -> Result<(), StoreError> {
        let storage_key = make_storage_key(key);
        let guard = self.data.pin();

        let outcome = guard.compute(storage_key, |entry| match entry {
            // Idempotent: deleting a missing or already-marked resource
            // is a no-op.
            None => Operation::Abort(()),
            Some((_, current)) if current.is_deleting() => Operation::Abort(()),
            Some((_, current)) if current.finalizers.is_empty() => Operation::Remove,
            // Finalizers pending: only mark the object. It stays visible
            // until every finalizer is removed.
            Some((_, current)) => {
                let mut marked = current.clone();
                marked.deletion_timestamp = Some(OffsetDateTime::now_utc());
                marked.meta.version = self.next_version();
                marked.meta.last_updated = OffsetDateTime::now_utc();
                marked.meta.field_owner = Some(field_owner.to_string());
                Operation::Insert(marked)
            }
        });

        match outcome {
            Compute::Removed(..) | Compute::Updated { .. } => {
                self.notify(key);
                Ok(())
            }
            Compute::Aborted(()) | Compute::Inserted(..) => Ok(()),
        }
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
