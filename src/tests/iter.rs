use std::collections::BTreeSet;

use crate::{Hypertrie, HypertrieContext, SingleEntry};

#[test]
fn iter_empty() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let trie = Hypertrie::new(2, &ctx).unwrap();
    assert_eq!(trie.iter().count(), 0);
}

#[test]
fn iter_single_entry() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    trie.set(&[4_u32, 5, 6], 2_u64).unwrap();
    let entries: Vec<SingleEntry<u32, u64>> = trie.iter().collect();
    assert_eq!(entries, vec![SingleEntry::new(&[4, 5, 6], 2)]);
}

#[test]
fn iter_yields_every_entry_once() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    let mut expected = BTreeSet::new();
    for i in 0_u32..150 {
        let key = [i % 4, i % 9, i];
        trie.set(&key, true).unwrap();
        expected.insert(key.to_vec());
    }
    let seen: Vec<Vec<u32>> = trie.iter().map(|entry| entry.key.to_vec()).collect();
    assert_eq!(seen.len(), 150);
    let unique: BTreeSet<Vec<u32>> = seen.into_iter().collect();
    assert_eq!(unique, expected);
}

#[test]
fn iter_reports_values() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    for i in 1_u64..=30 {
        let k = u32::try_from(i).unwrap();
        trie.set(&[k, k * 2], i * 100).unwrap();
    }
    for entry in &trie {
        assert_eq!(entry.value, u64::from(entry.key[0]) * 100);
        assert_eq!(entry.key[1], entry.key[0] * 2);
    }
}

#[test]
fn raw_iter_is_lazy() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    for i in 0_u32..50 {
        trie.set(&[i, i + 1], true).unwrap();
    }
    let nodec = trie.node_container().unwrap();
    let raw = ctx.raw();
    let mut iter = raw.iter(&nodec);
    let first = iter.next().unwrap();
    assert_eq!(first.key[1], first.key[0] + 1);
    assert_eq!(iter.count(), 49);
}

#[test]
fn iter_of_slice_entry() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    trie.set(&[1_u32, 2, 3], 5_u64).unwrap();
    let sliced = trie
        .slice(&[Some(1), None, None])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    assert!(!sliced.is_managed());
    let entries: Vec<_> = sliced.iter().collect();
    assert_eq!(entries, vec![SingleEntry::new(&[2, 3], 5)]);
}

/// `with_iter` walks the store directly and can stop early.
#[test]
fn with_iter_is_lazy() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    trie.insert_all((0_u32..40).map(|i| ([i, i % 3], true)))
        .unwrap();
    let first = trie.with_iter(|mut iter| iter.next());
    assert!(first.is_some());
    let count = trie.with_iter(|iter| iter.count());
    assert_eq!(count, 40);
}

/// A detached slice iterates its single entry.
#[test]
fn with_iter_on_detached_slice() {
    let ctx = HypertrieContext::<u32, u64>::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    trie.set(&[1, 2], 7).unwrap();
    trie.set(&[3, 4], 8).unwrap();
    let sliced = trie.slice(&[Some(1), None]).unwrap().into_hypertrie().unwrap();
    assert!(!sliced.is_managed());
    let entries: Vec<SingleEntry<u32, u64>> = sliced.with_iter(|iter| iter.collect());
    assert_eq!(entries, vec![SingleEntry::new(&[2], 7)]);
}

/// `iter` is a snapshot: updates after the call are not observed.
#[test]
fn iter_is_a_snapshot() {
    let ctx = HypertrieContext::<u32, u64>::new();
    let mut trie = Hypertrie::new(1, &ctx).unwrap();
    trie.set(&[1], 1).unwrap();
    trie.set(&[2], 2).unwrap();
    let snapshot = trie.iter();
    trie.set(&[3], 3).unwrap();
    trie.set(&[1], 0).unwrap();
    let mut keys: Vec<u32> = snapshot.map(|entry| entry.key[0]).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2]);
}
