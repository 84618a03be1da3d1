//! Secret-versioning rules shared by every [`crate::Backend`] implementation.
//!
//! Storage engines differ only in how an encrypted row is persisted; the
//! bookkeeping below — how `current_version`/`oldest_version` move and how
//! soft-deletes behave — is identical regardless of which one is in use, per
//! `spec.md` §4.3.

use std::collections::HashMap;

use nexus_types::secret::{Secret, SecretVersion};

/// Creates a new version of `secret` with `data`, advancing
/// `current_version` and pruning the oldest versions if the retained count
/// would exceed `max_versions`.
pub fn upsert(secret: &mut Secret, data: HashMap<String, String>, now: u64, max_versions: u64) {
    let new_version = secret.current_version + 1;
    secret
        .versions
        .insert(new_version, SecretVersion::new(data, now));
    secret.current_version = new_version;
    if secret.oldest_version == 0 {
        secret.oldest_version = new_version;
    }
    prune(secret, max_versions);
}

/// Drops the oldest retained versions until at most `max_versions` remain.
fn prune(secret: &mut Secret, max_versions: u64) {
    while secret.versions.len() as u64 > max_versions {
        let Some(&oldest) = secret.versions.keys().next() else {
            break;
        };
        secret.versions.remove(&oldest);
        if let Some(&next_oldest) = secret.versions.keys().next() {
            secret.oldest_version = next_oldest;
        }
    }
}

/// Soft-deletes `versions` at time `now`.
///
/// `[0]` means "the current version": it is soft-deleted and
/// `current_version` decrements to the next non-deleted version below it (or
/// stays if none exists, leaving the secret fully deleted). An empty list is
/// a no-op; explicit version numbers delete exactly those.
pub fn delete(secret: &mut Secret, versions: &[u64], now: u64) {
    if versions.is_empty() {
        return;
    }
    if versions == [0] {
        let current = secret.current_version;
        if let Some(v) = secret.versions.get_mut(&current) {
            v.deleted_time = Some(now);
        }
        let next_active = secret
            .versions
            .range(..current)
            .rev()
            .find(|(_, v)| !v.is_deleted())
            .map(|(&version, _)| version);
        if let Some(next_active) = next_active {
            secret.current_version = next_active;
        }
        return;
    }
    for version in versions {
        if let Some(v) = secret.versions.get_mut(version) {
            v.deleted_time = Some(now);
        }
    }
}

/// Clears soft-delete markers on `versions`; an empty list restores the
/// highest deleted version.
pub fn undelete(secret: &mut Secret, versions: &[u64]) {
    if versions.is_empty() {
        if let Some((_, v)) = secret
            .versions
            .iter_mut()
            .rev()
            .find(|(_, v)| v.is_deleted())
        {
            v.deleted_time = None;
        }
        return;
    }
    for version in versions {
        if let Some(v) = secret.versions.get_mut(version) {
            v.deleted_time = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: &str) -> HashMap<String, String> {
        HashMap::from([("k".to_owned(), value.to_owned())])
    }

    #[test]
    fn upsert_advances_current_version() {
        let mut secret = Secret::new("/p");
        upsert(&mut secret, data("v1"), 1, 10);
        upsert(&mut secret, data("v2"), 2, 10);
        assert_eq!(secret.current_version, 2);
        assert_eq!(secret.oldest_version, 1);
        assert_eq!(secret.version(1).unwrap().data["k"], "v1");
        assert_eq!(secret.version(2).unwrap().data["k"], "v2");
    }

    #[test]
    fn upsert_prunes_beyond_max_versions() {
        let mut secret = Secret::new("/p");
        for (i, v) in ["v1", "v2", "v3", "v4", "v5"].into_iter().enumerate() {
            upsert(&mut secret, data(v), i as u64 + 1, 3);
        }
        assert_eq!(secret.current_version, 5);
        assert_eq!(secret.oldest_version, 3);
        assert!(secret.version(1).is_none());
        assert!(secret.version(2).is_none());
        assert_eq!(secret.version(3).unwrap().data["k"], "v3");
        assert_eq!(secret.version(5).unwrap().data["k"], "v5");
    }

    #[test]
    fn delete_zero_targets_current_and_decrements() {
        let mut secret = Secret::new("/p");
        upsert(&mut secret, data("v1"), 1, 10);
        upsert(&mut secret, data("v2"), 2, 10);
        upsert(&mut secret, data("v3"), 3, 10);
        delete(&mut secret, &[0], 4);
        assert_eq!(secret.current_version, 2);
        assert!(secret.version(3).unwrap().is_deleted());
        assert!(secret.active_current_version().is_some());
    }

    #[test]
    fn delete_last_active_version_leaves_all_deleted() {
        let mut secret = Secret::new("/p");
        upsert(&mut secret, data("v1"), 1, 10);
        delete(&mut secret, &[0], 2);
        assert!(secret.active_current_version().is_none());
        assert!(secret.all_versions_deleted());
    }

    #[test]
    fn undelete_with_empty_list_restores_highest_deleted() {
        let mut secret = Secret::new("/p");
        upsert(&mut secret, data("v1"), 1, 10);
        upsert(&mut secret, data("v2"), 2, 10);
        delete(&mut secret, &[1, 2], 3);
        undelete(&mut secret, &[]);
        assert!(!secret.version(2).unwrap().is_deleted());
        assert!(secret.version(1).unwrap().is_deleted());
    }
}
