//! Navigation engine: ordered seeks over the trie.
//!
//! `min_under` / `max_under` are one-sided descents of a subtree. The
//! directional seeks walk the query key like lookup while recording one
//! frame per branch taken; wherever the query diverges from the stored
//! structure the answer is either the extremum of a sibling subtree (found
//! by unwinding the frames) or, going backward, a terminator remembered on
//! the way down. Results carry the reconstructed key bytes.

use super::{read_pop, skip_body, RawTrie};
use crate::word::{
    has, pop_chars, Hop, Skip, SmallList, TaggedPtr, BRANCH, EOS, HOP, LIST, POP_WORDS, RUN, SKIP,
};

/// A located entry: full key bytes plus its terminator word.
pub(crate) struct RawEntry {
    pub(crate) key: Vec<u8>,
    pub(crate) eos: *mut u64,
}

/// Children of a branch, ascending, with their pointer slots.
unsafe fn children_of(run: *mut u64, flags: u8) -> Vec<(u8, *mut u64)> {
    // SAFETY: `run` points at a branch matching `flags`.
    unsafe {
        if has(flags, LIST) {
            let list = SmallList::from_word(*run);
            (0..list.len()).map(|i| (list.char_at(i), run.add(1 + i))).collect()
        } else {
            let pop = read_pop(run);
            pop_chars(&pop)
                .into_iter()
                .enumerate()
                .map(|(i, c)| (c, run.add(POP_WORDS + i)))
                .collect()
        }
    }
}

/// Smallest key at or below the current position. The position may be mid
/// array (after a consumed run): a terminator here is itself the minimum.
unsafe fn min_under(mut run: *mut u64, mut flags: u8, mut prefix: Vec<u8>) -> Option<RawEntry> {
    if run.is_null() {
        return None;
    }
    // SAFETY: walks well-formed arrays along the leftmost path.
    unsafe {
        loop {
            loop {
                if has(flags, EOS) {
                    return Some(RawEntry { key: prefix, eos: run });
                }
                if has(flags, HOP) {
                    let hop = Hop::from_word(*run);
                    prefix.extend_from_slice(&hop.bytes()[..hop.len()]);
                    flags = hop.new_flags();
                    run = run.add(1);
                } else if has(flags, SKIP) {
                    let sk = Skip::from_word(*run);
                    prefix.extend_from_slice(skip_body(run.add(1), sk.len()));
                    flags = sk.new_flags();
                    run = run.add(1 + Skip::body_words(sk.len()));
                } else {
                    break;
                }
            }
            if !has(flags, BRANCH) {
                return None;
            }
            let (c, slot) = if has(flags, LIST) {
                let list = SmallList::from_word(*run);
                (list.char_at(0), run.add(1))
            } else {
                let pop = read_pop(run);
                let chars = pop_chars(&pop);
                (chars[0], run.add(POP_WORDS))
            };
            let child = TaggedPtr::from_word(*slot);
            if child.is_null() {
                return None;
            }
            prefix.push(c);
            run = child.ptr();
            flags = child.flags();
        }
    }
}

/// Largest key at or below the current position. A terminator passed on the
/// way is remembered and yielded only when no branch below holds a key.
unsafe fn max_under(start: *mut u64, mut flags: u8, mut prefix: Vec<u8>) -> Option<RawEntry> {
    if start.is_null() {
        return None;
    }
    // SAFETY: walks well-formed arrays along the rightmost path.
    unsafe {
        let mut run = start;
        let mut best: Option<RawEntry> = None;
        loop {
            if has(flags, EOS) {
                best = Some(RawEntry { key: prefix.clone(), eos: run });
                run = run.add(1);
                flags &= !EOS;
            }
            if has(flags, HOP) {
                let hop = Hop::from_word(*run);
                prefix.extend_from_slice(&hop.bytes()[..hop.len()]);
                flags = hop.new_flags();
                run = run.add(1);
            } else if has(flags, SKIP) {
                let sk = Skip::from_word(*run);
                prefix.extend_from_slice(skip_body(run.add(1), sk.len()));
                flags = sk.new_flags();
                run = run.add(1 + Skip::body_words(sk.len()));
            } else {
                break;
            }
        }
        if has(flags, BRANCH) {
            let children = children_of(run, flags);
            for &(c, slot) in children.iter().rev() {
                let child = TaggedPtr::from_word(*slot);
                if child.is_null() {
                    continue;
                }
                let mut p = prefix.clone();
                p.push(c);
                if let Some(r) = max_under(child.ptr(), child.flags(), p) {
                    return Some(r);
                }
            }
        }
        best
    }
}

/// Three-way comparison of the query suffix against a run's bytes.
enum RunCmp {
    /// The query covers the whole run.
    Matched,
    /// The query ends inside the run or orders below it: every key under
    /// the run is greater than the query.
    KeyBelow,
    /// The query orders above the run: every key under it is smaller.
    KeyAbove,
}

fn cmp_run(key: &[u8], pos: usize, frag: &[u8]) -> RunCmp {
    for (i, &f) in frag.iter().enumerate() {
        match key.get(pos + i) {
            None => return RunCmp::KeyBelow,
            Some(&k) if k < f => return RunCmp::KeyBelow,
            Some(&k) if k > f => return RunCmp::KeyAbove,
            _ => {}
        }
    }
    RunCmp::Matched
}

/// Frame pushed per branch descended on the exact-match path.
struct NavFrame {
    children: Vec<(u8, *mut u64)>,
    taken: usize,
    /// Key depth at the branch (prefix length when it was reached).
    depth: usize,
}

impl<V> RawTrie<V> {
    /// Smallest key in the trie.
    pub(crate) fn first_entry(&self) -> Option<RawEntry> {
        if self.count == 0 {
            return None;
        }
        let (run, flags) = TaggedPtr::from_word(self.root).parts();
        // SAFETY: root names a live array.
        unsafe { min_under(run, flags, Vec::new()) }
    }

    /// Largest key in the trie.
    pub(crate) fn last_entry(&self) -> Option<RawEntry> {
        if self.count == 0 {
            return None;
        }
        let (run, flags) = TaggedPtr::from_word(self.root).parts();
        // SAFETY: root names a live array.
        unsafe { max_under(run, flags, Vec::new()) }
    }

    /// Smallest stored key `>= key` (`or_equal`) or `> key` (otherwise).
    pub(crate) fn seek_after(&self, key: &[u8], or_equal: bool) -> Option<RawEntry> {
        if self.count == 0 {
            return None;
        }
        // SAFETY: root names a live array; the walk stays inside it.
        unsafe { self.seek_after_impl(key, or_equal) }
    }

    unsafe fn seek_after_impl(&self, key: &[u8], or_equal: bool) -> Option<RawEntry> {
        let (mut run, mut flags) = TaggedPtr::from_word(self.root).parts();
        let mut prefix: Vec<u8> = Vec::new();
        let mut pos = 0usize;
        let mut stack: Vec<NavFrame> = Vec::new();
        // SAFETY: as per caller.
        unsafe {
            'walk: loop {
                loop {
                    if has(flags, EOS) {
                        if pos >= key.len() {
                            if or_equal {
                                return Some(RawEntry { key: prefix, eos: run });
                            }
                            // Strictly greater: anything under the
                            // continuation extends the query.
                            run = run.add(1);
                            flags &= !EOS;
                            if has(flags, RUN | BRANCH) {
                                return min_under(run, flags, prefix);
                            }
                            break 'walk;
                        }
                        run = run.add(1);
                        flags &= !EOS;
                    }
                    if has(flags, HOP) {
                        let hop = Hop::from_word(*run);
                        let frag = hop.bytes();
                        let frag = &frag[..hop.len()];
                        match cmp_run(key, pos, frag) {
                            RunCmp::Matched => {
                                prefix.extend_from_slice(frag);
                                pos += frag.len();
                                flags = hop.new_flags();
                                run = run.add(1);
                            }
                            RunCmp::KeyBelow => {
                                prefix.extend_from_slice(frag);
                                return min_under(run.add(1), hop.new_flags(), prefix);
                            }
                            RunCmp::KeyAbove => break 'walk,
                        }
                    } else if has(flags, SKIP) {
                        let sk = Skip::from_word(*run);
                        let slen = sk.len();
                        let body = skip_body(run.add(1), slen);
                        match cmp_run(key, pos, body) {
                            RunCmp::Matched => {
                                prefix.extend_from_slice(body);
                                pos += slen;
                                flags = sk.new_flags();
                                run = run.add(1 + Skip::body_words(slen));
                            }
                            RunCmp::KeyBelow => {
                                prefix.extend_from_slice(body);
                                return min_under(
                                    run.add(1 + Skip::body_words(slen)),
                                    sk.new_flags(),
                                    prefix,
                                );
                            }
                            RunCmp::KeyAbove => break 'walk,
                        }
                    } else {
                        break;
                    }
                }
                if pos >= key.len() {
                    if has(flags, BRANCH) {
                        return min_under(run, flags, prefix);
                    }
                    break 'walk;
                }
                if !has(flags, BRANCH) {
                    break 'walk;
                }
                let children = children_of(run, flags);
                let c = key[pos];
                let mut exact = None;
                let mut greater = None;
                for (i, &(cc, _)) in children.iter().enumerate() {
                    if cc == c {
                        exact = Some(i);
                        break;
                    }
                    if cc > c {
                        greater = Some(i);
                        break;
                    }
                }
                if let Some(i) = exact {
                    let child = TaggedPtr::from_word(*children[i].1);
                    stack.push(NavFrame { children, taken: i, depth: prefix.len() });
                    if child.is_null() {
                        break 'walk;
                    }
                    prefix.push(c);
                    pos += 1;
                    run = child.ptr();
                    flags = child.flags();
                    continue 'walk;
                }
                if let Some(i) = greater {
                    let (gc, slot) = children[i];
                    let child = TaggedPtr::from_word(*slot);
                    if !child.is_null() {
                        prefix.push(gc);
                        return min_under(child.ptr(), child.flags(), prefix);
                    }
                }
                break 'walk;
            }
            // Backtrack: next greater sibling, deepest frame first.
            while let Some(f) = stack.pop() {
                for &(c, slot) in &f.children[f.taken + 1..] {
                    let child = TaggedPtr::from_word(*slot);
                    if child.is_null() {
                        continue;
                    }
                    prefix.truncate(f.depth);
                    prefix.push(c);
                    return min_under(child.ptr(), child.flags(), prefix);
                }
            }
            None
        }
    }

    /// Largest stored key `<= key` (`or_equal`) or `< key` (otherwise).
    pub(crate) fn seek_before(&self, key: &[u8], or_equal: bool) -> Option<RawEntry> {
        if self.count == 0 {
            return None;
        }
        // SAFETY: root names a live array; the walk stays inside it.
        unsafe { self.seek_before_impl(key, or_equal) }
    }

    unsafe fn seek_before_impl(&self, key: &[u8], or_equal: bool) -> Option<RawEntry> {
        let (mut run, mut flags) = TaggedPtr::from_word(self.root).parts();
        let mut prefix: Vec<u8> = Vec::new();
        let mut pos = 0usize;
        let mut stack: Vec<NavFrame> = Vec::new();
        // Deepest terminator passed on the exact-match path; it beats any
        // smaller sibling found above its depth.
        let mut best: Option<RawEntry> = None;
        // SAFETY: as per caller.
        unsafe {
            'walk: loop {
                loop {
                    if has(flags, EOS) {
                        if pos >= key.len() {
                            if or_equal {
                                return Some(RawEntry { key: prefix, eos: run });
                            }
                            break 'walk;
                        }
                        best = Some(RawEntry { key: prefix.clone(), eos: run });
                        run = run.add(1);
                        flags &= !EOS;
                    }
                    if has(flags, HOP) {
                        let hop = Hop::from_word(*run);
                        let frag = hop.bytes();
                        let frag = &frag[..hop.len()];
                        match cmp_run(key, pos, frag) {
                            RunCmp::Matched => {
                                prefix.extend_from_slice(frag);
                                pos += frag.len();
                                flags = hop.new_flags();
                                run = run.add(1);
                            }
                            RunCmp::KeyBelow => break 'walk,
                            RunCmp::KeyAbove => {
                                let mut p = prefix.clone();
                                p.extend_from_slice(frag);
                                if let Some(r) = max_under(run.add(1), hop.new_flags(), p) {
                                    return Some(r);
                                }
                                break 'walk;
                            }
                        }
                    } else if has(flags, SKIP) {
                        let sk = Skip::from_word(*run);
                        let slen = sk.len();
                        let body = skip_body(run.add(1), slen);
                        match cmp_run(key, pos, body) {
                            RunCmp::Matched => {
                                prefix.extend_from_slice(body);
                                pos += slen;
                                flags = sk.new_flags();
                                run = run.add(1 + Skip::body_words(slen));
                            }
                            RunCmp::KeyBelow => break 'walk,
                            RunCmp::KeyAbove => {
                                let mut p = prefix.clone();
                                p.extend_from_slice(body);
                                if let Some(r) = max_under(
                                    run.add(1 + Skip::body_words(slen)),
                                    sk.new_flags(),
                                    p,
                                ) {
                                    return Some(r);
                                }
                                break 'walk;
                            }
                        }
                    } else {
                        break;
                    }
                }
                if pos >= key.len() || !has(flags, BRANCH) {
                    break 'walk;
                }
                let children = children_of(run, flags);
                let c = key[pos];
                let mut exact = None;
                let mut smaller = None;
                for (i, &(cc, _)) in children.iter().enumerate() {
                    if cc == c {
                        exact = Some(i);
                        break;
                    }
                    if cc < c {
                        smaller = Some(i);
                    } else {
                        break;
                    }
                }
                if let Some(i) = exact {
                    let child = TaggedPtr::from_word(*children[i].1);
                    stack.push(NavFrame { children, taken: i, depth: prefix.len() });
                    if child.is_null() {
                        break 'walk;
                    }
                    prefix.push(c);
                    pos += 1;
                    run = child.ptr();
                    flags = child.flags();
                    continue 'walk;
                }
                if let Some(i) = smaller {
                    let (sc, slot) = children[i];
                    let child = TaggedPtr::from_word(*slot);
                    if !child.is_null() {
                        let mut p = prefix.clone();
                        p.push(sc);
                        if let Some(r) = max_under(child.ptr(), child.flags(), p) {
                            return Some(r);
                        }
                    }
                }
                break 'walk;
            }
            // Backtrack: try smaller siblings deepest frame first; once the
            // next frame sits above the recorded terminator's depth, the
            // terminator wins.
            while let Some(f) = stack.pop() {
                if best.as_ref().is_some_and(|b| f.depth < b.key.len()) {
                    return best;
                }
                for i in (0..f.taken).rev() {
                    let (c, slot) = f.children[i];
                    let child = TaggedPtr::from_word(*slot);
                    if child.is_null() {
                        continue;
                    }
                    let mut p = prefix[..f.depth].to_vec();
                    p.push(c);
                    if let Some(r) = max_under(child.ptr(), child.flags(), p) {
                        return Some(r);
                    }
                }
            }
            best
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
