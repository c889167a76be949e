//! # bytetrie
//!
//! A memory-efficient ordered map built on a compact, cache-conscious trie.
//!
//! Every unit of storage is one 64-bit word. A tagged pointer carries five
//! flag bits over a 59-bit address and names a contiguous node array:
//! optional value terminators, compressed key runs (inline up to 6 bytes,
//! out of line beyond), and an adaptive branch (a sorted byte list up to 7
//! children, a 256-bit bitmap from 8). Shared prefixes are stored once and
//! the pointer chain stays short, so both the per-element footprint and the
//! cache-miss count are low.
//!
//! Keys are byte strings ([`ByteTrie`]) or integers mapped to an
//! order-preserving byte encoding ([`NumTrie`]); iteration is always in
//! ascending key order.
//!
//! ## Example
//!
//! ```rust
//! use bytetrie::ByteTrie;
//!
//! let mut trie: ByteTrie<u64> = ByteTrie::new();
//! trie.insert(b"hello", 1);
//! trie.insert(b"world", 2);
//!
//! assert_eq!(trie.get(b"hello"), Some(&1));
//! assert_eq!(trie.first().map(|e| e.key), Some(b"hello".to_vec()));
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

mod debug;
mod map;
mod numeric;
mod stats;
mod sync;
mod trie;
mod value;
mod word;

pub use map::{ByteTrie, Entry, Iter, KeyNotFound, Prefix, Range};
pub use numeric::{NumIter, NumTrie, OrderedBytes};
pub use stats::TrieStats;
pub use sync::SharedTrie;

#[cfg(test)]
mod proptests;
