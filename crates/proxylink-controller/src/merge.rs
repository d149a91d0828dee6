//! The inclusion merger: pure list arithmetic over a parent's includes.
//!
//! Callers own the write-back; the store has no list-element upsert, so
//! the result is always applied as a whole-list replacement.

use proxylink_core::{Include, NamespacedName};
use thiserror::Error;

/// Terminal conflicts. The caller must not write anything back; retrying
/// without operator intervention cannot succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("parent does not allow child inclusions")]
    InclusionNotPermitted,

    #[error("prefix {prefix} is already delegated to {owner}")]
    DuplicatePrefix {
        prefix: String,
        owner: NamespacedName,
    },
}

/// Compute the new include list for a parent given one child's intent.
///
/// An existing entry for the child is replaced in place (position is
/// preserved, which keeps diffs readable); otherwise a new entry is
/// appended. A child re-declaring its own current prefix is not a
/// conflict and yields an identical list.
pub fn merge(
    current: &[Include],
    child: &NamespacedName,
    desired_prefix: &str,
    parent_allows: bool,
) -> Result<Vec<Include>, MergeError> {
    if !parent_allows {
        return Err(MergeError::InclusionNotPermitted);
    }

    if let Some(owner) = current
        .iter()
        .find(|entry| !entry.matches_child(child) && entry.prefix == desired_prefix)
    {
        return Err(MergeError::DuplicatePrefix {
            prefix: desired_prefix.to_string(),
            owner: NamespacedName::new(&owner.namespace, &owner.name),
        });
    }

    let mut next = current.to_vec();
    match next.iter_mut().find(|entry| entry.matches_child(child)) {
        Some(entry) => entry.prefix = desired_prefix.to_string(),
        None => next.push(Include::new(
            &child.namespace,
            &child.name,
            desired_prefix,
        )),
    }
    Ok(next)
}

/// Excise the child's entry, preserving relative order of the rest.
/// Removing an absent entry returns the list unchanged (idempotent).
pub fn remove(current: &[Include], child: &NamespacedName) -> Vec<Include> {
    current
        .iter()
        .filter(|entry| !entry.matches_child(child))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(namespace: &str, name: &str) -> NamespacedName {
        NamespacedName::new(namespace, name)
    }

    #[test]
    fn test_merge_appends_new_entry() {
        let result = merge(&[], &child("blog-team", "blog"), "/blog", true).unwrap();
        assert_eq!(result, vec![Include::new("blog-team", "blog", "/blog")]);
    }

    #[test]
    fn test_merge_replaces_in_place() {
        let current = vec![
            Include::new("hoge", "hoge", "/hoge"),
            Include::new("blog-team", "blog", "/blog"),
            Include::new("sales-team", "sales", "/sales"),
        ];

        let result = merge(&current, &child("blog-team", "blog"), "/newblog", true).unwrap();

        // Single entry replaced, position preserved, siblings untouched.
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], current[0]);
        assert_eq!(result[1], Include::new("blog-team", "blog", "/newblog"));
        assert_eq!(result[2], current[2]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge(&[], &child("blog-team", "blog"), "/blog", true).unwrap();
        let twice = merge(&once, &child("blog-team", "blog"), "/blog", true).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_never_alters_sibling_entries() {
        let current = vec![
            Include::new("a-team", "a", "/a"),
            Include::new("b-team", "b", "/b"),
        ];

        let result = merge(&current, &child("a-team", "a"), "/a2", true).unwrap();
        assert_eq!(result[1], current[1]);
    }

    #[test]
    fn test_merge_rejects_duplicate_prefix() {
        let current = vec![Include::new("hoge", "hoge", "/hoge")];

        let err = merge(&current, &child("sales-team", "sales"), "/hoge", true).unwrap_err();
        assert_eq!(
            err,
            MergeError::DuplicatePrefix {
                prefix: "/hoge".into(),
                owner: child("hoge", "hoge"),
            }
        );
        // Caller never writes on conflict; the list it holds is untouched.
        assert_eq!(current, vec![Include::new("hoge", "hoge", "/hoge")]);
    }

    #[test]
    fn test_merge_self_collision_is_not_a_conflict() {
        let current = vec![Include::new("blog-team", "blog", "/blog")];
        let result = merge(&current, &child("blog-team", "blog"), "/blog", true).unwrap();
        assert_eq!(result, current);
    }

    #[test]
    fn test_merge_requires_permission() {
        let err = merge(&[], &child("blog-team", "blog"), "/blog", false).unwrap_err();
        assert_eq!(err, MergeError::InclusionNotPermitted);
    }

    #[test]
    fn test_remove_excises_single_entry() {
        let current = vec![
            Include::new("a-team", "a", "/a"),
            Include::new("b-team", "b", "/b"),
            Include::new("c-team", "c", "/c"),
        ];

        let result = remove(&current, &child("b-team", "b"));
        assert_eq!(
            result,
            vec![
                Include::new("a-team", "a", "/a"),
                Include::new("c-team", "c", "/c"),
            ]
        );
    }

    #[test]
    fn test_remove_is_idempotent_on_absent_entry() {
        let current = vec![Include::new("a-team", "a", "/a")];
        let result = remove(&current, &child("b-team", "b"));
        assert_eq!(result, current);
    }

    #[test]
    fn test_remove_on_empty_list() {
        assert!(remove(&[], &child("a-team", "a")).is_empty());
    }

    #[test]
    fn test_identity_is_namespace_and_name() {
        // Same name under a different namespace is a different child and
        // its prefix claim collides.
        let current = vec![Include::new("team-one", "app", "/app")];
        let err = merge(&current, &child("team-two", "app"), "/app", true).unwrap_err();
        assert!(matches!(err, MergeError::DuplicatePrefix { .. }));
    }
}
