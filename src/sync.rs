//! Shared facade: one writer at a time, readers in parallel.
//!
//! The engine itself is single-owner; this wrapper serializes mutation
//! behind a write lock and lets concurrent readers share the read lock
//! (every engine read path is mutation-free). The length is mirrored in an
//! atomic so counting never touches the lock.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::map::ByteTrie;

/// A [`ByteTrie`] behind a reader-writer lock.
///
/// ```
/// use bytetrie::SharedTrie;
///
/// let trie: SharedTrie<u64> = SharedTrie::new();
/// trie.insert(b"user:1001", 42);
/// assert_eq!(trie.get(b"user:1001"), Some(42));
/// ```
pub struct SharedTrie<V> {
    inner: RwLock<ByteTrie<V>>,
    len: AtomicUsize,
}

impl<V> SharedTrie<V> {
    /// Create an empty shared trie.
    pub fn new() -> Self {
        SharedTrie { inner: RwLock::new(ByteTrie::new()), len: AtomicUsize::new(0) }
    }

    /// Insert a key-value pair; an existing entry keeps its value.
    /// Returns whether a new entry was made.
    pub fn insert(&self, key: impl AsRef<[u8]>, value: V) -> bool {
        let mut inner = self.inner.write();
        let (_, inserted) = inner.insert(key.as_ref(), value);
        if inserted {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Insert a key-value pair, overwriting an existing entry's value.
    /// Returns whether a new entry was made.
    pub fn insert_or_assign(&self, key: impl AsRef<[u8]>, value: V) -> bool {
        let mut inner = self.inner.write();
        let (_, inserted) = inner.insert_or_assign(key.as_ref(), value);
        if inserted {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Look up a key, cloning the value out.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().get(key.as_ref()).cloned()
    }

    /// Whether a key is present.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.read().contains(key.as_ref())
    }

    /// Remove a key, returning its value when it was present.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Option<V> {
        let mut inner = self.inner.write();
        let old = inner.remove(key.as_ref());
        if old.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        old
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.clear();
        self.len.store(0, Ordering::Relaxed);
    }
}

impl<V> Default for SharedTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_basic_operations() {
        let trie: SharedTrie<u64> = SharedTrie::new();
        assert!(trie.insert(b"key1", 1));
        assert!(trie.insert(b"key2", 2));
        assert!(!trie.insert(b"key1", 10));
        assert_eq!(trie.get(b"key1"), Some(1));
        assert!(trie.insert_or_assign(b"key3", 3));
        assert!(!trie.insert_or_assign(b"key1", 11));
        assert_eq!(trie.get(b"key1"), Some(11));
        assert_eq!(trie.len(), 3);
        assert_eq!(trie.remove(b"key1"), Some(11));
        assert_eq!(trie.len(), 2);
        trie.clear();
        assert!(trie.is_empty());
    }

    #[test]
    fn test_concurrent_readers() {
        let trie: Arc<SharedTrie<u64>> = Arc::new(SharedTrie::new());
        for i in 0..1000u64 {
            trie.insert(format!("key:{:04}", i).as_bytes(), i);
        }
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let trie = Arc::clone(&trie);
                std::thread::spawn(move || {
                    let mut sum = 0u64;
                    for i in (t..1000u64).step_by(4) {
                        sum += trie.get(format!("key:{:04}", i).as_bytes()).unwrap();
                    }
                    sum
                })
            })
            .collect();
        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, (0..1000u64).sum::<u64>());
    }
}
