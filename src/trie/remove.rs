//! Remove engine.
//!
//! Descent mirrors lookup while recording one frame per branch taken. When
//! the key's terminator is found, the holding array is parsed into its
//! segment view (carrier groups of terminator + compressed run, plus the
//! optional branch), the terminator is dropped from the view, and the array
//! is re-emitted with every carrier's flag set recomputed from the kept
//! structure.
//!
//! An array must keep a terminator or a branch to justify its existence:
//! when neither survives, trailing runs are cut back to the last remaining
//! terminator, or the whole array is freed and the cascade walks one frame
//! up, shrinking the branch there, demoting POP to LIST at seven children,
//! or dropping the branch and repeating.

use std::ptr;

use super::{alloc_words, free_words, read_pop, skip_body, RawTrie};
use crate::value;
use crate::word::{
    has, pop_chars, pop_clear, pop_count, pop_offset, Hop, Skip, SmallList, TaggedPtr, BRANCH,
    EOS, HOP, LIST, POP, POP_WORDS, SKIP,
};

// =============================================================================
// Segment view
// =============================================================================

/// A compressed run inside an array.
#[derive(Clone, Copy)]
struct RunSeg {
    kind: u8,
    /// Word offset of the HOP word / SKIP header.
    pos: usize,
    /// Total word footprint (header plus body).
    words: usize,
    /// The HOP word / SKIP header as stored.
    word: u64,
}

/// One carrier group: the optional terminator cell and optional run a
/// single flag set describes, in walk order.
#[derive(Clone, Copy)]
struct Group {
    eos_pos: Option<usize>,
    run: Option<RunSeg>,
}

#[derive(Clone, Copy)]
struct BranchSeg {
    kind: u8,
    pos: usize,
    children: usize,
}

struct SegView {
    groups: Vec<Group>,
    branch: Option<BranchSeg>,
    /// Total word length of the array.
    len: usize,
}

/// Parse an array into its segment view by walking the flag chain.
unsafe fn parse(start: *const u64, mut flags: u8) -> SegView {
    let mut groups = Vec::new();
    let mut pos = 0usize;
    // SAFETY: reads follow the flag chain of a well-formed array.
    unsafe {
        loop {
            let mut g = Group { eos_pos: None, run: None };
            if has(flags, EOS) {
                g.eos_pos = Some(pos);
                pos += 1;
            }
            if has(flags, HOP) {
                let hop = Hop::from_word(*start.add(pos));
                g.run = Some(RunSeg { kind: HOP, pos, words: 1, word: hop.word() });
                flags = hop.new_flags();
                pos += 1;
                groups.push(g);
            } else if has(flags, SKIP) {
                let sk = Skip::from_word(*start.add(pos));
                let words = 1 + Skip::body_words(sk.len());
                g.run = Some(RunSeg { kind: SKIP, pos, words, word: sk.word() });
                flags = sk.new_flags();
                pos += words;
                groups.push(g);
            } else {
                if g.eos_pos.is_some() {
                    groups.push(g);
                }
                break;
            }
        }
        let branch = if has(flags, LIST) {
            let n = SmallList::from_word(*start.add(pos)).len();
            Some(BranchSeg { kind: LIST, pos, children: n })
        } else if has(flags, POP) {
            let n = pop_count(&read_pop(start.add(pos)));
            Some(BranchSeg { kind: POP, pos, children: n })
        } else {
            None
        };
        let len = pos
            + branch.map_or(0, |b| {
                if b.kind == LIST {
                    1 + b.children
                } else {
                    POP_WORDS + b.children
                }
            });
        SegView { groups, branch, len }
    }
}

/// Replacement branch content for re-emission.
struct BranchOut {
    kind: u8,
    head: [u64; POP_WORDS],
    head_words: usize,
    /// Offset of the first child pointer in the old array.
    old_children_pos: usize,
    old_children: usize,
    /// Child ordinal to leave behind, if any.
    drop_child: Option<usize>,
}

impl BranchOut {
    /// Carry the old branch over unchanged.
    unsafe fn keep(start: *const u64, seg: &BranchSeg) -> BranchOut {
        // SAFETY: seg describes a live branch in the array at `start`.
        unsafe {
            let mut head = [0u64; POP_WORDS];
            let head_words = if seg.kind == LIST { 1 } else { POP_WORDS };
            for (i, h) in head.iter_mut().enumerate().take(head_words) {
                *h = *start.add(seg.pos + i);
            }
            BranchOut {
                kind: seg.kind,
                head,
                head_words,
                old_children_pos: seg.pos + head_words,
                old_children: seg.children,
                drop_child: None,
            }
        }
    }

    fn words(&self) -> usize {
        self.head_words + self.old_children - self.drop_child.is_some() as usize
    }
}

/// Build the replacement array from the kept groups and branch, recompute
/// every carrier's flag set from that structure, install it with one parent
/// store, and free the old array.
unsafe fn emit_install(
    parent: *mut u64,
    old_start: *mut u64,
    old_len: usize,
    groups: &[Group],
    branch: Option<BranchOut>,
) {
    // Flag set i describes group i; a final set is appended when the branch
    // follows the last group's run.
    let k = groups.len();
    let mut fsets: Vec<u8> = Vec::with_capacity(k + 1);
    for g in groups {
        let mut f = 0u8;
        if g.eos_pos.is_some() {
            f |= EOS;
        }
        if let Some(r) = &g.run {
            f |= r.kind;
        }
        fsets.push(f);
    }
    if let Some(b) = &branch {
        match groups.last() {
            Some(g) if g.run.is_none() => *fsets.last_mut().expect("group present") |= b.kind,
            Some(_) => fsets.push(b.kind),
            None => fsets.push(b.kind),
        }
    }

    let group_words: usize = groups
        .iter()
        .map(|g| g.eos_pos.is_some() as usize + g.run.map_or(0, |r| r.words))
        .sum();
    let total = group_words + branch.as_ref().map_or(0, |b| b.words());
    debug_assert!(total > 0);

    // SAFETY: all source offsets lie inside the old array; nn has room for
    // exactly the words written.
    unsafe {
        let nn = alloc_words(total);
        let mut wr = 0usize;
        for (i, g) in groups.iter().enumerate() {
            if let Some(p) = g.eos_pos {
                *nn.add(wr) = *old_start.add(p);
                wr += 1;
            }
            if let Some(r) = &g.run {
                let nf = fsets[i + 1];
                if r.kind == HOP {
                    *nn.add(wr) = Hop::from_word(r.word).with_new_flags(nf).word();
                    wr += 1;
                } else {
                    let sk = Skip::from_word(r.word);
                    *nn.add(wr) = Skip::new(sk.len(), nf).word();
                    ptr::copy_nonoverlapping(old_start.add(r.pos + 1), nn.add(wr + 1), r.words - 1);
                    wr += r.words;
                }
            }
        }
        if let Some(b) = &branch {
            for i in 0..b.head_words {
                *nn.add(wr) = b.head[i];
                wr += 1;
            }
            for i in 0..b.old_children {
                if Some(i) == b.drop_child {
                    continue;
                }
                *nn.add(wr) = *old_start.add(b.old_children_pos + i);
                wr += 1;
            }
        }
        debug_assert_eq!(wr, total);
        *parent = TaggedPtr::new(nn, fsets[0]).word();
        free_words(old_start, old_len);
    }
}

/// Index of the last group still holding a terminator.
fn last_eos_group(groups: &[Group]) -> Option<usize> {
    groups.iter().rposition(|g| g.eos_pos.is_some())
}

// =============================================================================
// Removal
// =============================================================================

/// One branch decision recorded during descent.
struct Frame {
    /// Word holding the tagged pointer to this frame's array.
    parent: *mut u64,
    start: *mut u64,
    initial: u8,
    child_idx: usize,
}

impl<V> RawTrie<V> {
    /// Erase `key`, returning its value when present.
    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<V> {
        if self.count == 0 {
            return None;
        }
        // SAFETY: single mutable owner; walk and rebuild uphold the array
        // invariants.
        unsafe { self.remove_walk(key) }
    }

    unsafe fn remove_walk(&mut self, key: &[u8]) -> Option<V> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut parent = self.root_slot();
        // SAFETY: count != 0, so the root names a live array.
        unsafe {
            let (mut start, mut flags) = TaggedPtr::from_word(*parent).parts();
            let mut initial = flags;
            let mut run = start;
            let mut pos = 0usize;
            loop {
                loop {
                    if has(flags, EOS) {
                        if pos == key.len() {
                            let eos_off = run.offset_from(start) as usize;
                            let v = self.remove_at(parent, start, initial, eos_off, &mut frames);
                            self.count -= 1;
                            return Some(v);
                        }
                        run = run.add(1);
                        flags &= !EOS;
                    }
                    if has(flags, HOP) {
                        let hop = Hop::from_word(*run);
                        if !hop.matches(&key[pos..]) {
                            return None;
                        }
                        pos += hop.len();
                        flags = hop.new_flags();
                        run = run.add(1);
                    } else if has(flags, SKIP) {
                        let sk = Skip::from_word(*run);
                        let slen = sk.len();
                        if key.len() - pos < slen {
                            return None;
                        }
                        if skip_body(run.add(1), slen) != &key[pos..pos + slen] {
                            return None;
                        }
                        pos += slen;
                        flags = sk.new_flags();
                        run = run.add(1 + Skip::body_words(slen));
                    } else {
                        break;
                    }
                }
                if !has(flags, BRANCH) || pos >= key.len() {
                    return None;
                }
                let c = key[pos];
                let (off, child_idx) = if has(flags, LIST) {
                    match SmallList::from_word(*run).position(c) {
                        Some(i) => (1 + i, i),
                        None => return None,
                    }
                } else {
                    match pop_offset(&read_pop(run), c) {
                        Some(o) => (o, o - POP_WORDS),
                        None => return None,
                    }
                };
                frames.push(Frame { parent, start, initial, child_idx });
                run = run.add(off);
                parent = run;
                let child = TaggedPtr::from_word(*run);
                if child.is_null() {
                    return None;
                }
                start = child.ptr();
                run = start;
                flags = child.flags();
                initial = flags;
                pos += 1;
            }
        }
    }

    /// Phase 1: remove the terminator at `eos_off` from its array.
    unsafe fn remove_at(
        &mut self,
        parent: *mut u64,
        start: *mut u64,
        initial: u8,
        eos_off: usize,
        frames: &mut Vec<Frame>,
    ) -> V {
        // SAFETY: per caller, `eos_off` is a live terminator in the array.
        unsafe {
            let mut view = parse(start, initial);
            let value = value::take::<V>(*start.add(eos_off));
            let gi = view
                .groups
                .iter()
                .position(|g| g.eos_pos == Some(eos_off))
                .expect("descent located a terminator");
            view.groups[gi].eos_pos = None;

            match view.branch {
                Some(seg) => {
                    let keep = BranchOut::keep(start, &seg);
                    emit_install(parent, start, view.len, &view.groups, Some(keep));
                }
                None => match last_eos_group(&view.groups) {
                    Some(li) => {
                        // Runs past the last terminator led only to the
                        // removed key; cut them.
                        view.groups.truncate(li + 1);
                        view.groups[li].run = None;
                        emit_install(parent, start, view.len, &view.groups, None);
                    }
                    None => {
                        // Nothing left to justify this array.
                        free_words(start, view.len);
                        *parent = TaggedPtr::NULL.word();
                        self.cascade(frames);
                    }
                },
            }
            value
        }
    }

    /// Phase 2: the child pointer at the top frame went null; repair the
    /// branch there, cascading further up while arrays keep emptying.
    unsafe fn cascade(&mut self, frames: &mut Vec<Frame>) {
        // SAFETY: frames record live arrays on the descent path; each
        // iteration either rebuilds one array or frees it and recurs.
        unsafe {
            while let Some(f) = frames.pop() {
                let mut view = parse(f.start, f.initial);
                let seg = view.branch.expect("frames are pushed at branches");
                match seg.kind {
                    LIST => {
                        let list = SmallList::from_word(*f.start.add(seg.pos));
                        if list.len() > 1 {
                            let out = BranchOut {
                                kind: LIST,
                                head: [list.without(f.child_idx).word(), 0, 0, 0],
                                head_words: 1,
                                old_children_pos: seg.pos + 1,
                                old_children: seg.children,
                                drop_child: Some(f.child_idx),
                            };
                            emit_install(f.parent, f.start, view.len, &view.groups, Some(out));
                            return;
                        }
                    }
                    _ => {
                        let pop = read_pop(f.start.add(seg.pos));
                        let n = pop_count(&pop);
                        let chars = pop_chars(&pop);
                        let removed = chars[f.child_idx];
                        if n - 1 > SmallList::MAX {
                            let mut np = pop;
                            pop_clear(&mut np, removed);
                            let out = BranchOut {
                                kind: POP,
                                head: np,
                                head_words: POP_WORDS,
                                old_children_pos: seg.pos + POP_WORDS,
                                old_children: seg.children,
                                drop_child: Some(f.child_idx),
                            };
                            emit_install(f.parent, f.start, view.len, &view.groups, Some(out));
                            return;
                        }
                        if n > 1 {
                            // Seven children left: back to a LIST.
                            let kept: Vec<u8> = chars
                                .iter()
                                .copied()
                                .filter(|&c| c != removed)
                                .collect();
                            let out = BranchOut {
                                kind: LIST,
                                head: [SmallList::from_chars(&kept).word(), 0, 0, 0],
                                head_words: 1,
                                old_children_pos: seg.pos + POP_WORDS,
                                old_children: seg.children,
                                drop_child: Some(f.child_idx),
                            };
                            emit_install(f.parent, f.start, view.len, &view.groups, Some(out));
                            return;
                        }
                    }
                }
                // The branch's last child vanished; the branch goes too.
                match last_eos_group(&view.groups) {
                    Some(li) => {
                        view.groups.truncate(li + 1);
                        view.groups[li].run = None;
                        emit_install(f.parent, f.start, view.len, &view.groups, None);
                        return;
                    }
                    None => {
                        free_words(f.start, view.len);
                        *f.parent = TaggedPtr::NULL.word();
                        // continue one frame up
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
