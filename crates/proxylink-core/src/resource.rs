use crate::key::NamespacedName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Store-managed metadata for a proxy resource.
///
/// `version` is the optimistic-concurrency token: the store rejects any
/// update whose version does not match the currently stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub version: u64,
    #[serde(rename = "lastUpdated", with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(rename = "fieldOwner", skip_serializing_if = "Option::is_none")]
    pub field_owner: Option<String>,
}

impl ResourceMeta {
    pub fn new() -> Self {
        Self {
            version: 0,
            last_updated: OffsetDateTime::now_utc(),
            field_owner: None,
        }
    }
}

impl Default for ResourceMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// One delegation record inside a parent's include list.
///
/// Identity within a list is `(namespace, name)`; the prefix is the single
/// match condition this controller manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub namespace: String,
    pub name: String,
    pub prefix: String,
}

impl Include {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            prefix: prefix.into(),
        }
    }

    /// Whether this entry belongs to the given child.
    pub fn matches_child(&self, child: &NamespacedName) -> bool {
        self.namespace == child.namespace && self.name == child.name
    }
}

/// A proxy resource as held by the store.
///
/// Mutated only through whole-object read-modify-write cycles; every read
/// must be treated as possibly stale by the time of write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResource {
    pub key: NamespacedName,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(
        rename = "deletionTimestamp",
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub deletion_timestamp: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Include>,
    pub meta: ResourceMeta,
}

impl ProxyResource {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: NamespacedName::new(namespace, name),
            annotations: BTreeMap::new(),
            finalizers: Vec::new(),
            deletion_timestamp: None,
            includes: Vec::new(),
            meta: ResourceMeta::new(),
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_includes(mut self, includes: Vec<Include>) -> Self {
        self.includes = includes;
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    pub fn add_finalizer(&mut self, finalizer: impl Into<String>) {
        let finalizer = finalizer.into();
        if !self.has_finalizer(&finalizer) {
            self.finalizers.push(finalizer);
        }
    }

    pub fn remove_finalizer(&mut self, finalizer: &str) {
        self.finalizers.retain(|f| f != finalizer);
    }

    /// Deletion has been requested but the object is still visible because
    /// finalizers are pending.
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}
