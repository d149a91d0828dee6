//! Watch event type for level-triggered change notification.

use proxylink_core::NamespacedName;

/// A change notification for one resource.
///
/// Deliberately payload-free: the receiver always re-fetches current state,
/// so a missed, duplicated, or reordered event is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: NamespacedName,
}

impl StoreEvent {
    pub fn new(key: NamespacedName) -> Self {
        Self { key }
    }
}
