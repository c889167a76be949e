//! Randomized model tests.
//!
//! Every generated action sequence runs against both a `ByteTrie` and a
//! `BTreeMap`; the two must agree after each action, and the surviving
//! structure must iterate, walk backward, and answer bound probes exactly
//! like the model.
//!
//! Key generation is biased toward the structure's seams: nested prefixes
//! whose compressed runs straddle the inline-run limit (6 bytes inline,
//! 7 forces the out-of-line form), sibling sets that push one branch across
//! the small-branch limit (7 children as a sorted list, 8 as a bitmap), and
//! long shared stems whose splits shrink a long run back under the inline
//! limit. Raw byte noise keeps the generic cases honest.

use std::collections::BTreeMap;
use std::ops::Bound;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::ByteTrie;

/// A key drawn from the seam-biased generator.
#[derive(Debug, Clone)]
struct GenKey(Vec<u8>);

impl Arbitrary for GenKey {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        // Every prefix of a 10-byte word: runs and terminators chain across
        // the 6/7-byte representation boundary as the keys split each other.
        let run_boundary = (0usize..=10).prop_map(|n| GenKey(b"abcdefghij"[..n].to_vec()));

        // Up to ten one- and two-byte siblings under one branch: the seventh
        // and eighth children cross the list/bitmap boundary, and removals
        // cross it back.
        let fan_out = (0u8..10, prop::option::of(0u8..4))
            .prop_map(|(a, b)| {
                let mut key = vec![b'A' + a];
                if let Some(b) = b {
                    key.push(b'0' + b);
                }
                GenKey(key)
            });

        // A 24-byte stem forces the out-of-line run form; short tails from a
        // three-letter alphabet make splits whose suffixes drop back under
        // the inline limit.
        let long_stem = prop::collection::vec(b'x'..=b'z', 0..6).prop_map(|tail| {
            let mut key = b"longsharedstemlongshared".to_vec();
            key.extend_from_slice(&tail);
            GenKey(key)
        });

        let noise = prop::collection::vec(any::<u8>(), 0..20).prop_map(GenKey);

        prop_oneof![
            1 => Just(GenKey(Vec::new())),
            3 => run_boundary,
            3 => fan_out,
            2 => long_stem,
            2 => noise,
        ]
        .boxed()
    }
}

/// One step of a test run, applied to the trie and the model in lockstep.
#[derive(Arbitrary, Debug, Clone)]
enum Op {
    Insert(GenKey, u64),
    Assign(GenKey, u64),
    Get(GenKey),
    Remove(GenKey),
}

fn apply(trie: &mut ByteTrie<u64>, model: &mut BTreeMap<Vec<u8>, u64>, op: &Op) {
    match op {
        Op::Insert(key, v) => {
            let (_, inserted) = trie.insert(&key.0, *v);
            let was_present = model.contains_key(&key.0);
            model.entry(key.0.clone()).or_insert(*v);
            assert_eq!(inserted, !was_present, "insert {:?}", key);
        }
        Op::Assign(key, v) => {
            let (_, inserted) = trie.insert_or_assign(&key.0, *v);
            let old = model.insert(key.0.clone(), *v);
            assert_eq!(inserted, old.is_none(), "assign {:?}", key);
        }
        Op::Get(key) => {
            assert_eq!(trie.get(&key.0), model.get(&key.0), "get {:?}", key);
        }
        Op::Remove(key) => {
            assert_eq!(trie.remove(&key.0), model.remove(&key.0), "remove {:?}", key);
        }
    }
    assert_eq!(trie.len(), model.len(), "len after {:?}", op);
    assert_eq!(trie.is_empty(), model.is_empty());
}

/// Full-structure checks run after every action sequence.
fn check_order(trie: &ByteTrie<u64>, model: &BTreeMap<Vec<u8>, u64>) {
    // Forward iteration yields exactly the model, in order.
    let got: Vec<(Vec<u8>, u64)> = trie.iter().map(|(k, v)| (k, *v)).collect();
    let want: Vec<(Vec<u8>, u64)> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(got, want, "forward iteration disagrees with model");

    // Backward walk from last via prev_before.
    let mut got_rev = Vec::new();
    let mut cur = trie.last().map(|e| e.key);
    while let Some(k) = cur {
        got_rev.push(k.clone());
        cur = trie.prev_before(&k).map(|e| e.key);
    }
    let want_rev: Vec<Vec<u8>> = model.keys().rev().cloned().collect();
    assert_eq!(got_rev, want_rev, "backward walk disagrees with model");

    // Bounds probed at and just past every stored key.
    for key in model.keys() {
        let lb = trie.lower_bound(key).map(|e| e.key);
        assert_eq!(lb.as_ref(), Some(key), "lower_bound at stored key");

        let ub = trie.upper_bound(key).map(|e| e.key);
        let want_ub = model
            .range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone());
        assert_eq!(ub, want_ub, "upper_bound at {:?}", key);

        let mut probe = key.clone();
        probe.push(0);
        let lb2 = trie.lower_bound(&probe).map(|e| e.key);
        let want_lb2 = model.range(probe.clone()..).next().map(|(k, _)| k.clone());
        assert_eq!(lb2, want_lb2, "lower_bound past {:?}", key);

        let fl = trie.floor(&probe).map(|e| e.key);
        let want_fl = model.range(..=probe.clone()).next_back().map(|(k, _)| k.clone());
        assert_eq!(fl, want_fl, "floor past {:?}", key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(ops in prop::collection::vec(any::<Op>(), 1..64)) {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        let mut model: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        for op in &ops {
            apply(&mut trie, &mut model, op);
        }
        check_order(&trie, &model);
    }

    #[test]
    fn proptest_insert_remove_all(keys in prop::collection::vec(any::<GenKey>(), 1..48)) {
        let mut trie: ByteTrie<u64> = ByteTrie::new();
        let mut model: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            trie.insert_or_assign(&key.0, i as u64);
            model.insert(key.0.clone(), i as u64);
        }
        prop_assert_eq!(trie.len(), model.len());
        for key in model.keys() {
            prop_assert_eq!(trie.get(key), model.get(key));
        }
        for (key, value) in &model {
            prop_assert_eq!(trie.remove(key), Some(*value));
        }
        prop_assert!(trie.is_empty());
        prop_assert!(trie.first().is_none());
    }
}
