//! The directory of Keeper base URLs consumed by the Keeper protocol driver.

use std::collections::BTreeMap;

use crate::crypto::KeeperId;

/// A mapping from Keeper id to its base URL.
///
/// `spec.md` §3 requires every Keeper id to parse as a positive integer and
/// to equal the `id` field of exactly one [`Share`](crate::crypto::Share);
/// both properties fall out of using [`KeeperId`] as the map key.
#[derive(Debug, Clone, Default)]
pub struct KeeperDirectory {
    entries: BTreeMap<KeeperId, String>,
}

impl KeeperDirectory {
    /// Builds a directory from `(id, base_url)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (KeeperId, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The number of Keepers in the directory (`N`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` iff the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the base URL registered for `id`, if any.
    pub fn base_url(&self, id: KeeperId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Iterates over `(id, base_url)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (KeeperId, &str)> {
        self.entries.iter().map(|(id, url)| (*id, url.as_str()))
    }

    /// Returns `true` iff the directory has at least `n` entries.
    ///
    /// Per `spec.md` §3, bootstrap and periodic redistribution treat a
    /// directory smaller than the configured total share count as fatal.
    pub fn meets_minimum(&self, n: u16) -> bool {
        self.entries.len() >= usize::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_size_and_lookup() {
        let a = KeeperId::new(1).unwrap();
        let b = KeeperId::new(2).unwrap();
        let dir = KeeperDirectory::new([
            (a, "https://keeper-a.example".to_owned()),
            (b, "https://keeper-b.example".to_owned()),
        ]);
        assert_eq!(dir.len(), 2);
        assert!(dir.meets_minimum(2));
        assert!(!dir.meets_minimum(3));
        assert_eq!(dir.base_url(a), Some("https://keeper-a.example"));
        assert_eq!(dir.base_url(KeeperId::new(3).unwrap()), None);
    }
}
