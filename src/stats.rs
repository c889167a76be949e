//! Structural statistics.
//!
//! A read-only walk over the node arrays, counting representation choices.
//! Useful for verifying representation transitions (LIST vs POP, HOP vs
//! SKIP) and for memory accounting: `words` is the allocated word total
//! after size-class rounding, so it shrinks when keys are removed.

use crate::map::ByteTrie;
use crate::numeric::{NumTrie, OrderedBytes};
use crate::trie::{array_len, read_pop};
use crate::word::{
    alloc_size, has, pop_count, Hop, Skip, SmallList, TaggedPtr, EOS, HOP, LIST, POP, POP_WORDS,
    SKIP,
};

/// Counts of the structures making up a trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieStats {
    /// Node arrays allocated.
    pub arrays: usize,
    /// Total 8-byte words allocated, after size-class rounding.
    pub words: usize,
    /// Inline compressed runs.
    pub hop_count: usize,
    /// Key bytes held in inline runs.
    pub hop_bytes: usize,
    /// Out-of-line compressed runs.
    pub skip_count: usize,
    /// Key bytes held in out-of-line runs.
    pub skip_bytes: usize,
    /// Small (sorted-list) branches.
    pub list_count: usize,
    /// Large (bitmap) branches.
    pub pop_count: usize,
    /// Value terminators (equals the element count).
    pub terminators: usize,
    /// Deepest array, counted in arrays from the root.
    pub max_depth: usize,
}

unsafe fn collect(start: *const u64, mut flags: u8, depth: usize, s: &mut TrieStats) {
    if start.is_null() {
        return;
    }
    s.arrays += 1;
    s.max_depth = s.max_depth.max(depth);
    // SAFETY: read-only walk along the flag chain of well-formed arrays.
    unsafe {
        s.words += alloc_size(array_len(start, flags));
        let mut run = start;
        loop {
            if has(flags, EOS) {
                s.terminators += 1;
                run = run.add(1);
                flags &= !EOS;
            }
            if has(flags, HOP) {
                let hop = Hop::from_word(*run);
                s.hop_count += 1;
                s.hop_bytes += hop.len();
                flags = hop.new_flags();
                run = run.add(1);
            } else if has(flags, SKIP) {
                let sk = Skip::from_word(*run);
                s.skip_count += 1;
                s.skip_bytes += sk.len();
                flags = sk.new_flags();
                run = run.add(1 + Skip::body_words(sk.len()));
            } else {
                break;
            }
        }
        if has(flags, LIST) {
            s.list_count += 1;
            let n = SmallList::from_word(*run).len();
            run = run.add(1);
            for _ in 0..n {
                let (p, f) = TaggedPtr::from_word(*run).parts();
                collect(p, f, depth + 1, s);
                run = run.add(1);
            }
        } else if has(flags, POP) {
            s.pop_count += 1;
            let pop = read_pop(run);
            let n = pop_count(&pop);
            run = run.add(POP_WORDS);
            for _ in 0..n {
                let (p, f) = TaggedPtr::from_word(*run).parts();
                collect(p, f, depth + 1, s);
                run = run.add(1);
            }
        }
    }
}

impl<V> ByteTrie<V> {
    /// Walk the structure and count its parts.
    pub fn stats(&self) -> TrieStats {
        let mut s = TrieStats::default();
        let (p, f) = TaggedPtr::from_word(self.raw().root).parts();
        // SAFETY: the root names a live array (or is null).
        unsafe { collect(p, f, 1, &mut s) };
        s
    }
}

impl<K: OrderedBytes, V> NumTrie<K, V> {
    /// Walk the structure and count its parts.
    pub fn stats(&self) -> TrieStats {
        self.bytes().stats()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let trie: ByteTrie<u64> = ByteTrie::new();
        assert_eq!(trie.stats(), TrieStats::default());
    }

    #[test]
    fn test_single_key_layout() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        trie.insert(b"cat", 1);
        let s = trie.stats();
        assert_eq!(s.arrays, 1);
        assert_eq!(s.hop_count, 1);
        assert_eq!(s.hop_bytes, 3);
        assert_eq!(s.skip_count, 0);
        assert_eq!(s.terminators, 1);
        assert_eq!(s.words, 4); // 2 words rounded to the 4-word class
    }

    #[test]
    fn test_long_key_uses_skip() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        trie.insert(b"abcdef", 1);
        assert_eq!(trie.stats().skip_count, 0);
        let mut trie2: ByteTrie<u64> = ByteTrie::new();
        trie2.insert(b"abcdefg", 1);
        let s = trie2.stats();
        assert_eq!(s.skip_count, 1);
        assert_eq!(s.skip_bytes, 7);
        assert_eq!(s.hop_count, 0);
    }

    #[test]
    fn test_list_pop_transition() {
        // S2/S6 structural assertions: the 8th child promotes, removing
        // back to 7 demotes.
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        for c in b'a'..=b'g' {
            trie.insert(&[c], c as u64);
        }
        let s = trie.stats();
        assert_eq!((s.list_count, s.pop_count), (1, 0));

        trie.insert(b"h", 1);
        let s = trie.stats();
        assert_eq!((s.list_count, s.pop_count), (0, 1));

        trie.remove(b"a");
        let s = trie.stats();
        assert_eq!((s.list_count, s.pop_count), (1, 0));
        assert_eq!(s.terminators, 7);
    }

    #[test]
    fn test_terminators_track_len() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        for i in 0..50u64 {
            trie.insert(format!("k{:02}", i).as_bytes(), i);
        }
        assert_eq!(trie.stats().terminators, trie.len());
    }

    #[test]
    fn test_words_shrink_on_remove() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        for i in 0..100u64 {
            trie.insert(format!("prefix/{:03}", i).as_bytes(), i);
        }
        let before = trie.stats().words;
        for i in 0..50u64 {
            trie.remove(format!("prefix/{:03}", i).as_bytes());
        }
        let after = trie.stats().words;
        assert!(after < before, "{} should shrink below {}", after, before);
        trie.clear();
        assert_eq!(trie.stats().words, 0);
    }

    #[test]
    fn test_numeric_stats() {
        let mut trie: crate::NumTrie<u32, u32> = crate::NumTrie::new();
        for k in 0..16u32 {
            trie.insert(k, k);
        }
        let s = trie.stats();
        assert_eq!(s.terminators, 16);
        // dense low byte: one bitmap branch at the bottom level
        assert_eq!(s.pop_count, 1);
    }
}
