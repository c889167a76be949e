//! Structure dump for debugging.
//!
//! Renders the node arrays as an indented tree: terminators, compressed
//! runs with their fragments, and branches with their child characters.
//! Intended for eyeballing representation choices in tests and examples;
//! values are not printed.

use std::fmt::Write;

use crate::map::ByteTrie;
use crate::numeric::{NumTrie, OrderedBytes};
use crate::trie::{read_pop, skip_body};
use crate::word::{
    has, pop_chars, Hop, Skip, SmallList, TaggedPtr, EOS, HOP, LIST, POP, POP_WORDS, SKIP,
};

fn render_byte(b: u8, out: &mut String) {
    if b.is_ascii_graphic() || b == b' ' {
        out.push(b as char);
    } else {
        let _ = write!(out, "\\x{:02x}", b);
    }
}

fn render_bytes(bytes: &[u8], out: &mut String) {
    for &b in bytes {
        render_byte(b, out);
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

unsafe fn dump_array(start: *const u64, mut flags: u8, depth: usize, out: &mut String) {
    if start.is_null() {
        indent(depth, out);
        out.push_str("(null)\n");
        return;
    }
    let mut run = start;
    // SAFETY: read-only walk along the flag chain of well-formed arrays.
    unsafe {
        loop {
            if has(flags, EOS) {
                indent(depth, out);
                out.push_str("eos\n");
                run = run.add(1);
                flags &= !EOS;
            }
            if has(flags, HOP) {
                let hop = Hop::from_word(*run);
                indent(depth, out);
                out.push_str("hop \"");
                render_bytes(&hop.bytes()[..hop.len()], out);
                out.push_str("\"\n");
                flags = hop.new_flags();
                run = run.add(1);
            } else if has(flags, SKIP) {
                let sk = Skip::from_word(*run);
                let len = sk.len();
                let body = skip_body(run.add(1), len);
                indent(depth, out);
                let _ = write!(out, "skip[{}] \"", len);
                render_bytes(&body[..len.min(24)], out);
                if len > 24 {
                    out.push_str("...");
                }
                out.push_str("\"\n");
                flags = sk.new_flags();
                run = run.add(1 + Skip::body_words(len));
            } else {
                break;
            }
        }
        let (chars, first_child) = if has(flags, LIST) {
            let list = SmallList::from_word(*run);
            let chars: Vec<u8> = (0..list.len()).map(|i| list.char_at(i)).collect();
            indent(depth, out);
            out.push_str("list {");
            render_bytes(&chars, out);
            out.push_str("}\n");
            (chars, run.add(1))
        } else if has(flags, POP) {
            let pop = read_pop(run);
            let chars = pop_chars(&pop);
            indent(depth, out);
            let _ = write!(out, "pop[{}] {{", chars.len());
            render_bytes(&chars, out);
            out.push_str("}\n");
            (chars, run.add(POP_WORDS))
        } else {
            return;
        };
        for (i, &c) in chars.iter().enumerate() {
            indent(depth + 1, out);
            out.push('\'');
            render_byte(c, out);
            out.push_str("' ->\n");
            let (p, f) = TaggedPtr::from_word(*first_child.add(i)).parts();
            dump_array(p, f, depth + 2, out);
        }
    }
}

impl<V> ByteTrie<V> {
    /// Render the node-array structure as an indented tree.
    pub fn dump_structure(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "trie len={}", self.len());
        let (p, f) = TaggedPtr::from_word(self.raw().root).parts();
        if p.is_null() {
            out.push_str("  (empty)\n");
        } else {
            // SAFETY: the root names a live array.
            unsafe { dump_array(p, f, 1, &mut out) };
        }
        out
    }
}

impl<K: OrderedBytes, V> NumTrie<K, V> {
    /// Render the node-array structure as an indented tree.
    pub fn dump_structure(&self) -> String {
        self.bytes().dump_structure()
    }
}

#[cfg(test)]
mod tests {
    use crate::ByteTrie;

    #[test]
    fn test_dump_empty() {
        let trie: ByteTrie<u64> = ByteTrie::new();
        assert_eq!(trie.dump_structure(), "trie len=0\n  (empty)\n");
    }

    #[test]
    fn test_dump_shows_structures() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        trie.insert(b"he", 1);
        trie.insert(b"hello", 2);
        trie.insert(b"help", 3);
        let dump = trie.dump_structure();
        assert!(dump.starts_with("trie len=3\n"));
        assert!(dump.contains("hop \"he\""));
        assert!(dump.contains("eos"));
        assert!(dump.contains("list {"));

        trie.insert(b"abcdefghijklmnopqrstuvwxyz0123", 4);
        let dump = trie.dump_structure();
        assert!(dump.contains("skip[29]"), "{}", dump);
        assert!(dump.contains("..."));
    }

    #[test]
    fn test_dump_shows_pop() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        for c in b'a'..=b'i' {
            trie.insert(&[c], c as u64);
        }
        let dump = trie.dump_structure();
        assert!(dump.contains("pop[9] {abcdefghi}"), "{}", dump);
    }

    #[test]
    fn test_dump_escapes_non_printable() {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        trie.insert(b"\x00\x01a", 1);
        let dump = trie.dump_structure();
        assert!(dump.contains("\\x00\\x01a"), "{}", dump);
    }
}
