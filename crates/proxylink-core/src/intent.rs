//! Annotation extraction: maps a resource's annotations to its declared
//! delegation intent. Pure string transformation, no store access.

use crate::error::CoreError;
use crate::key::NamespacedName;
use std::collections::BTreeMap;

/// Present on a parent with value `"true"` to permit child inclusions.
pub const ALLOW_INCLUSION_ANNOTATION: &str = "allow-inclusion";

/// Present on a child: the `namespace/name` of the parent it wants to be
/// included under.
pub const PARENT_REF_ANNOTATION: &str = "parent";

/// Present on a child: explicit path prefix override.
pub const PATH_PREFIX_ANNOTATION: &str = "prefix";

/// Cleanup marker attached to a child once it has been merged into a
/// parent, so the deletion is observed before the object disappears.
pub const FINALIZER: &str = "proxylink/finalizer";

/// What a resource's annotations declare about inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationIntent {
    /// True iff the resource carries `allow-inclusion: "true"` exactly.
    pub allows_inclusion: bool,
    /// Declared parent reference, if the resource is a child.
    pub parent_ref: Option<NamespacedName>,
    prefix: Option<String>,
}

impl DelegationIntent {
    /// Extract intent from an annotation map.
    ///
    /// A missing `parent` annotation means the resource is not managed by
    /// this controller. A malformed one is a parse error, not a default.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let allows_inclusion = annotations
            .get(ALLOW_INCLUSION_ANNOTATION)
            .is_some_and(|v| v == "true");

        let parent_ref = match annotations.get(PARENT_REF_ANNOTATION) {
            Some(value) if !value.is_empty() => Some(value.parse()?),
            _ => None,
        };

        let prefix = annotations
            .get(PATH_PREFIX_ANNOTATION)
            .filter(|v| !v.is_empty())
            .cloned();

        Ok(Self {
            allows_inclusion,
            parent_ref,
            prefix,
        })
    }

    /// The prefix this child wants delegated: the `prefix` annotation when
    /// present and non-empty, else `/<child-name>`.
    pub fn desired_prefix(&self, child_name: &str) -> String {
        match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => format!("/{child_name}"),
        }
    }
}
