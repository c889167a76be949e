//! `ByteTrie`: the ordered-map facade over the trie engine for
//! variable-length byte-string keys.

use std::error::Error;
use std::fmt;

use crate::trie::nav::RawEntry;
use crate::trie::RawTrie;
use crate::value;

/// Checked access failed: the key is not in the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

impl Error for KeyNotFound {}

/// A located entry: owned key bytes plus a borrow of the stored value.
///
/// The key is materialised from the trie structure; the value borrow keeps
/// the trie immutable for as long as the entry lives.
pub struct Entry<'a, V> {
    /// Full key bytes.
    pub key: Vec<u8>,
    /// The value stored under `key`.
    pub value: &'a V,
}

/// A memory-efficient ordered map from byte strings to values.
///
/// Keys are arbitrary byte sequences (the empty key included) ordered
/// byte-lexicographically. Storage is a compact trie of packed 64-bit
/// words: shared prefixes are stored once, small branches as sorted byte
/// lists, wide branches as 256-bit bitmaps.
///
/// ```
/// use bytetrie::ByteTrie;
///
/// let mut trie: ByteTrie<u64> = ByteTrie::new();
/// trie.insert(b"hello", 1);
/// trie.insert(b"world", 2);
///
/// assert_eq!(trie.get(b"hello"), Some(&1));
/// assert_eq!(trie.len(), 2);
/// ```
pub struct ByteTrie<V> {
    raw: RawTrie<V>,
}

impl<V> ByteTrie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        ByteTrie { raw: RawTrie::new() }
    }

    /// Number of keys stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when no keys are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Upper bound on the number of storable elements.
    pub fn max_size() -> usize {
        RawTrie::<V>::max_size()
    }

    /// Remove every key and release all storage.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.raw.contains(key)
    }

    /// Number of entries under `key`: 0 or 1.
    pub fn count(&self, key: &[u8]) -> usize {
        self.raw.contains(key) as usize
    }

    /// Borrow the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let word = self.raw.find_word(key)?;
        // SAFETY: the word is a live terminator; the borrow pins `self`.
        Some(unsafe { value::as_ref(&*word) })
    }

    /// Mutably borrow the value stored under `key`.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let word = self.raw.find_word(key)?;
        // SAFETY: as in `get`, with exclusivity from `&mut self`.
        Some(unsafe { value::as_mut(&mut *word) })
    }

    /// Borrow the value under `key`, reporting a missing key as an error.
    pub fn at(&self, key: &[u8]) -> Result<&V, KeyNotFound> {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Insert `key`. An existing entry keeps its value (the given one is
    /// dropped). Returns the stored value and whether a new entry was made.
    pub fn insert(&mut self, key: &[u8], value: V) -> (&mut V, bool) {
        let (word, inserted) = self.raw.insert(key, value, false);
        // SAFETY: the engine returns the live terminator word.
        (unsafe { value::as_mut(&mut *word) }, inserted)
    }

    /// Insert `key`, overwriting the value of an existing entry. Returns
    /// the stored value and whether a new entry was made.
    pub fn insert_or_assign(&mut self, key: &[u8], value: V) -> (&mut V, bool) {
        let (word, inserted) = self.raw.insert(key, value, true);
        // SAFETY: as in `insert`.
        (unsafe { value::as_mut(&mut *word) }, inserted)
    }

    /// Remove `key`, returning its value when it was present.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        self.raw.remove(key)
    }

    fn entry(&self, raw: RawEntry) -> Entry<'_, V> {
        // SAFETY: the engine returns a live terminator word; the borrow on
        // `self` keeps it alive.
        let value = unsafe { value::as_ref(&*raw.eos) };
        Entry { key: raw.key, value }
    }

    /// Smallest key.
    pub fn first(&self) -> Option<Entry<'_, V>> {
        self.raw.first_entry().map(|e| self.entry(e))
    }

    /// Largest key.
    pub fn last(&self) -> Option<Entry<'_, V>> {
        self.raw.last_entry().map(|e| self.entry(e))
    }

    /// Smallest stored key strictly greater than `key`.
    pub fn next_after(&self, key: &[u8]) -> Option<Entry<'_, V>> {
        self.raw.seek_after(key, false).map(|e| self.entry(e))
    }

    /// Largest stored key strictly less than `key`.
    pub fn prev_before(&self, key: &[u8]) -> Option<Entry<'_, V>> {
        self.raw.seek_before(key, false).map(|e| self.entry(e))
    }

    /// Smallest stored key greater than or equal to `key`.
    pub fn lower_bound(&self, key: &[u8]) -> Option<Entry<'_, V>> {
        self.raw.seek_after(key, true).map(|e| self.entry(e))
    }

    /// Smallest stored key strictly greater than `key`.
    pub fn upper_bound(&self, key: &[u8]) -> Option<Entry<'_, V>> {
        self.next_after(key)
    }

    /// Largest stored key less than or equal to `key`.
    pub fn floor(&self, key: &[u8]) -> Option<Entry<'_, V>> {
        self.raw.seek_before(key, true).map(|e| self.entry(e))
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter { trie: self, cursor: Cursor::Start }
    }

    /// Iterate entries with keys in `[start, end)`, ascending.
    pub fn range(&self, start: &[u8], end: &[u8]) -> Range<'_, V> {
        Range {
            trie: self,
            cursor: Cursor::Start,
            start: start.to_vec(),
            end: end.to_vec(),
        }
    }

    /// Iterate entries whose key starts with `prefix`, ascending.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Prefix<'_, V> {
        Prefix { trie: self, cursor: Cursor::Start, prefix: prefix.to_vec() }
    }

    /// Keep only the entries for which `pred` returns true.
    pub fn retain(&mut self, mut pred: impl FnMut(&[u8], &V) -> bool) {
        let mut doomed = Vec::new();
        for (key, value) in self.iter() {
            if !pred(&key, value) {
                doomed.push(key);
            }
        }
        for key in doomed {
            self.remove(&key);
        }
    }

    /// Move every key absent from `self` out of `other` into `self`.
    /// Entries whose key is already present stay in `other`.
    pub fn merge(&mut self, other: &mut ByteTrie<V>) {
        let mut keys = Vec::with_capacity(other.len());
        let mut cur = other.raw.first_entry();
        while let Some(e) = cur {
            cur = other.raw.seek_after(&e.key, false);
            keys.push(e.key);
        }
        for key in keys {
            if !self.raw.contains(&key) {
                if let Some(v) = other.raw.remove(&key) {
                    self.raw.insert(&key, v, false);
                }
            }
        }
    }

    /// Constant-time exchange of contents.
    pub fn swap(&mut self, other: &mut ByteTrie<V>) {
        self.raw.swap(&mut other.raw);
    }

    pub(crate) fn raw(&self) -> &RawTrie<V> {
        &self.raw
    }
}

impl<V> Default for ByteTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for ByteTrie<V> {
    fn clone(&self) -> Self {
        let mut out = ByteTrie::new();
        for (k, v) in self.iter() {
            out.insert(&k, v.clone());
        }
        out
    }
}

impl<V: fmt::Debug> fmt::Debug for ByteTrie<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a ByteTrie<V> {
    type Item = (Vec<u8>, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

enum Cursor {
    Start,
    After(Vec<u8>),
    Done,
}

/// Ascending iterator over a [`ByteTrie`].
///
/// Holds key bytes rather than interior pointers and re-seeks each step,
/// so a step costs one descent; the borrow on the trie rules out
/// concurrent mutation.
pub struct Iter<'a, V> {
    trie: &'a ByteTrie<V>,
    cursor: Cursor,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let found = match &self.cursor {
            Cursor::Start => self.trie.raw.first_entry(),
            Cursor::After(key) => self.trie.raw.seek_after(key, false),
            Cursor::Done => None,
        };
        match found {
            Some(e) => {
                // SAFETY: live terminator word; `'a` borrows the trie.
                let value: &'a V = unsafe { value::as_ref(&*e.eos) };
                self.cursor = Cursor::After(e.key.clone());
                Some((e.key, value))
            }
            None => {
                self.cursor = Cursor::Done;
                None
            }
        }
    }
}

/// Ascending iterator over the keys of a half-open range.
pub struct Range<'a, V> {
    trie: &'a ByteTrie<V>,
    cursor: Cursor,
    start: Vec<u8>,
    end: Vec<u8>,
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let found = match &self.cursor {
            Cursor::Start => self.trie.raw.seek_after(&self.start, true),
            Cursor::After(key) => self.trie.raw.seek_after(key, false),
            Cursor::Done => None,
        };
        match found {
            Some(e) if e.key < self.end => {
                // SAFETY: live terminator word; `'a` borrows the trie.
                let value: &'a V = unsafe { value::as_ref(&*e.eos) };
                self.cursor = Cursor::After(e.key.clone());
                Some((e.key, value))
            }
            _ => {
                self.cursor = Cursor::Done;
                None
            }
        }
    }
}

/// Ascending iterator over the keys sharing a prefix.
pub struct Prefix<'a, V> {
    trie: &'a ByteTrie<V>,
    cursor: Cursor,
    prefix: Vec<u8>,
}

impl<'a, V> Iterator for Prefix<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let found = match &self.cursor {
            Cursor::Start => self.trie.raw.seek_after(&self.prefix, true),
            Cursor::After(key) => self.trie.raw.seek_after(key, false),
            Cursor::Done => None,
        };
        match found {
            Some(e) if e.key.starts_with(&self.prefix) => {
                // SAFETY: live terminator word; `'a` borrows the trie.
                let value: &'a V = unsafe { value::as_ref(&*e.eos) };
                self.cursor = Cursor::After(e.key.clone());
                Some((e.key, value))
            }
            _ => {
                self.cursor = Cursor::Done;
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
