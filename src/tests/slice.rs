use std::collections::BTreeMap;

use crate::{Hypertrie, HypertrieContext, SliceOutcome};

use super::support::{assert_consistent, assert_matches_model, contents};

fn example(ctx: &HypertrieContext<u32, bool>) -> Hypertrie<u32, bool> {
    let mut trie = Hypertrie::new(3, ctx).unwrap();
    trie.set(&[1, 2, 3], true).unwrap();
    trie.set(&[1, 2, 4], true).unwrap();
    trie.set(&[5, 2, 3], true).unwrap();
    trie
}

#[test]
fn slice_middle_position() {
    let ctx = HypertrieContext::new();
    let mut trie = example(&ctx);
    assert_eq!(trie.size(), 3);

    let sliced = trie
        .slice(&[None, Some(2), None])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    assert_eq!(sliced.depth(), 2);
    assert_eq!(sliced.size(), 3);
    let expected: BTreeMap<Vec<u32>, bool> = [vec![1, 3], vec![1, 4], vec![5, 3]]
        .into_iter()
        .map(|key| (key, true))
        .collect();
    assert_matches_model(&sliced, &expected);
    assert_consistent(&ctx, &[&trie, &sliced]);

    trie.set(&[1, 2, 4], false).unwrap();
    assert_eq!(trie.size(), 2);
    // The earlier slice is a snapshot.
    assert_eq!(sliced.size(), 3);
    let narrowed = trie.slice(&[None, Some(2), None]).unwrap();
    assert_eq!(narrowed.into_hypertrie().unwrap().size(), 2);
    assert_consistent(&ctx, &[&trie, &sliced]);
}

#[test]
fn slice_first_position() {
    let ctx = HypertrieContext::new();
    let trie = example(&ctx);
    let sliced = trie
        .slice(&[Some(1), None, None])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    let expected: BTreeMap<Vec<u32>, bool> = [(vec![2, 3], true), (vec![2, 4], true)].into();
    assert_eq!(contents(&sliced), expected);
}

#[test]
fn slice_two_positions() {
    let ctx = HypertrieContext::new();
    let trie = example(&ctx);
    let sliced = trie
        .slice(&[None, Some(2), Some(3)])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    assert_eq!(sliced.depth(), 1);
    let expected: BTreeMap<Vec<u32>, bool> = [(vec![1], true), (vec![5], true)].into();
    assert_eq!(contents(&sliced), expected);
}

#[test]
fn slice_all_positions_is_get() {
    let ctx = HypertrieContext::new();
    let trie = example(&ctx);
    let hit = trie.slice(&[Some(1), Some(2), Some(3)]).unwrap();
    assert_eq!(hit.value(), Some(true));
    let miss = trie.slice(&[Some(1), Some(2), Some(5)]).unwrap();
    assert_eq!(miss.value(), Some(false));
    assert!(miss.is_empty());
}

#[test]
fn slice_no_positions_is_clone() {
    let ctx = HypertrieContext::new();
    let trie = example(&ctx);
    let SliceOutcome::Hypertrie(same) = trie.slice(&[None, None, None]).unwrap() else {
        panic!("expected a hypertrie");
    };
    assert_eq!(same, trie);
    assert_consistent(&ctx, &[&trie, &same]);
}

#[test]
fn slice_miss_is_empty() {
    let ctx = HypertrieContext::new();
    let trie = example(&ctx);
    let outcome = trie.slice(&[Some(9), None, None]).unwrap();
    assert!(outcome.is_empty());
    let empty = outcome.into_hypertrie().unwrap();
    assert_eq!(empty.depth(), 2);
    assert!(empty.is_empty());
}

/// Slicing into a single entry yields an unmanaged result that is adopted
/// on first mutation.
#[test]
fn unmanaged_slice_is_adopted() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    trie.set(&[1_u32, 2, 3], 4_u64).unwrap();
    let nodes = ctx.node_count();

    let mut sliced = trie
        .slice(&[Some(1), None, None])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    assert!(!sliced.is_managed());
    assert_eq!(ctx.node_count(), nodes);
    assert_eq!(sliced.get(&[2, 3]).unwrap(), 4);
    assert_eq!(sliced.get_cards(&[0, 1]).unwrap(), vec![1, 1]);
    assert!(sliced.identifier().is_sen());

    sliced.set(&[5, 6], 1).unwrap();
    assert!(sliced.is_managed());
    assert_eq!(sliced.size(), 2);
    assert_eq!(sliced.get(&[2, 3]).unwrap(), 4);
    assert_consistent(&ctx, &[&trie, &sliced]);
}

/// Slices of an unmanaged result stay unmanaged.
#[test]
fn slice_of_unmanaged() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    trie.set(&[1_u32, 2, 3], 4_u64).unwrap();
    let sliced = trie
        .slice(&[Some(1), None, None])
        .unwrap()
        .into_hypertrie()
        .unwrap();
    let deeper = sliced.slice(&[None, Some(3)]).unwrap().into_hypertrie().unwrap();
    assert_eq!(deeper.depth(), 1);
    assert_eq!(deeper.get(&[2]).unwrap(), 4);
    assert!(sliced.slice(&[Some(9), None]).unwrap().is_empty());
    assert_eq!(sliced.slice(&[Some(2), Some(3)]).unwrap().value(), Some(4));
}

/// Every slice agrees with filtering the full contents.
#[test]
fn slices_agree_with_filtering() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    for i in 0_u32..120 {
        trie.set(&[i % 4, i % 6, i % 10], u64::from(i % 7) + 1).unwrap();
    }
    let all = contents(&trie);
    for pos in 0..3 {
        for kp in 0_u32..11 {
            let mut slice_key = [None; 3];
            slice_key[pos] = Some(kp);
            let expected: BTreeMap<Vec<u32>, u64> = all
                .iter()
                .filter(|(key, _)| key[pos] == kp)
                .map(|(key, &value)| {
                    let mut rest = key.clone();
                    rest.remove(pos);
                    (rest, value)
                })
                .collect();
            let sliced = trie.slice(&slice_key).unwrap().into_hypertrie().unwrap();
            assert_matches_model(&sliced, &expected);
        }
    }
}
