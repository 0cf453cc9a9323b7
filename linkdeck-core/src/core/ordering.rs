//! Dense-position ordering rules shared by every sibling scope.
//!
//! Each container level (a user's workspaces, a workspace's folders, a
//! folder's groups, a group's bookmarks) orders its children by a dense,
//! zero-based `position` column. A reorder request must list *every*
//! current member of the scope exactly once; the new position of each item
//! is simply its index in that list. This module holds the pure validation
//! half of that contract — the SQL that applies positions lives in
//! [`library`](super::library).

use crate::{LinkdeckError, Result};
use std::collections::HashSet;

/// Validates that `ordered_ids` is a permutation of `members`.
///
/// The check is strict rather than best-effort: a wrong length, a duplicate,
/// an id from outside the scope, or a missing member each fail with
/// [`LinkdeckError::InvalidReorder`] naming the mismatch. Callers apply
/// positions only after this returns `Ok`, so a rejected reorder never
/// partially applies.
pub fn validate_permutation(members: &[String], ordered_ids: &[String]) -> Result<()> {
    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();

    if ordered_ids.len() != member_set.len() {
        return Err(LinkdeckError::InvalidReorder(format!(
            "expected {} ids, got {}",
            member_set.len(),
            ordered_ids.len()
        )));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !member_set.contains(id.as_str()) {
            return Err(LinkdeckError::InvalidReorder(format!(
                "id {id} is not a member of this scope"
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(LinkdeckError::InvalidReorder(format!("duplicate id {id}")));
        }
    }

    // Equal length + no duplicates + all members ⇒ a full permutation.
    Ok(())
}

/// Returns the position a newly created item takes in a scope whose current
/// maximum position is `max_position` (`None` for an empty scope).
pub fn next_position(max_position: Option<i64>) -> i64 {
    max_position.map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_accepts_any_permutation() {
        let members = ids(&["a", "b", "c"]);
        validate_permutation(&members, &ids(&["c", "a", "b"])).unwrap();
        validate_permutation(&members, &ids(&["a", "b", "c"])).unwrap();
    }

    #[test]
    fn test_rejects_subset() {
        let members = ids(&["a", "b", "c"]);
        let err = validate_permutation(&members, &ids(&["a", "b"])).unwrap_err();
        assert!(err.to_string().contains("expected 3 ids, got 2"));
    }

    #[test]
    fn test_rejects_foreign_id() {
        let members = ids(&["a", "b"]);
        let err = validate_permutation(&members, &ids(&["a", "z"])).unwrap_err();
        assert!(err.to_string().contains("not a member"));
    }

    #[test]
    fn test_rejects_duplicate() {
        let members = ids(&["a", "b"]);
        let err = validate_permutation(&members, &ids(&["a", "a"])).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_rejects_superset() {
        let members = ids(&["a"]);
        assert!(validate_permutation(&members, &ids(&["a", "b"])).is_err());
    }

    #[test]
    fn test_empty_scope_accepts_empty_reorder() {
        validate_permutation(&[], &[]).unwrap();
    }

    #[test]
    fn test_next_position() {
        assert_eq!(next_position(None), 0);
        assert_eq!(next_position(Some(0)), 1);
        assert_eq!(next_position(Some(41)), 42);
    }
}
