use crate::{Hypertrie, HypertrieContext, HypertrieError, MAX_DEPTH};

use super::support::assert_consistent;

#[test]
fn new_is_empty() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let trie = Hypertrie::new(3, &ctx).unwrap();
    assert!(trie.is_empty());
    assert_eq!(trie.size(), 0);
    assert_eq!(trie.depth(), 3);
    assert!(trie.identifier().is_empty());
    assert!(!trie.get(&[1, 2, 3]).unwrap());
    assert_eq!(ctx.node_count(), 0);
}

#[test]
fn depth_must_be_in_range() {
    let ctx = HypertrieContext::<u32, bool>::new();
    assert!(matches!(
        Hypertrie::new(0, &ctx),
        Err(HypertrieError::DepthOutOfRange { depth: 0, .. })
    ));
    assert!(matches!(
        Hypertrie::new(MAX_DEPTH + 1, &ctx),
        Err(HypertrieError::DepthOutOfRange { .. })
    ));
    assert!(Hypertrie::new(MAX_DEPTH, &ctx).is_ok());
}

#[test]
fn key_length_is_checked() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    assert!(matches!(
        trie.set(&[1, 2, 3], true),
        Err(HypertrieError::KeyLengthMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert!(trie.get(&[1]).is_err());
    assert!(trie.contains(&[]).is_err());
    assert!(trie.slice(&[Some(1)]).is_err());
    assert!(trie.insert_all([(vec![1, 2], true), (vec![3], true)]).is_err());
    // A rejected batch changes nothing.
    assert!(trie.is_empty());
}

#[test]
fn set_then_get() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    assert!(!trie.set(&[1, 2, 3], true).unwrap());
    assert!(trie.get(&[1, 2, 3]).unwrap());
    assert!(trie.contains(&[1, 2, 3]).unwrap());
    assert!(!trie.contains(&[3, 2, 1]).unwrap());
    assert_eq!(trie.size(), 1);
    assert!(trie.identifier().is_sen());
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn set_existing_returns_old() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    assert_eq!(trie.set(&[1, 1], 5_u64).unwrap(), 0);
    assert_eq!(trie.set(&[1, 1], 7).unwrap(), 5);
    assert_eq!(trie.set(&[1, 1], 7).unwrap(), 7);
    assert_eq!(trie.get(&[1, 1]).unwrap(), 7);
    assert_eq!(trie.size(), 1);
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn set_zero_erases() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    trie.set(&[1, 2], true).unwrap();
    trie.set(&[3, 4], true).unwrap();
    assert!(trie.set(&[1, 2], false).unwrap());
    assert_eq!(trie.size(), 1);
    assert!(!trie.get(&[1, 2]).unwrap());
    assert!(trie.get(&[3, 4]).unwrap());
    assert_consistent(&ctx, &[&trie]);

    trie.set(&[3, 4], false).unwrap();
    assert!(trie.is_empty());
    assert_eq!(ctx.node_count(), 0);
}

#[test]
fn erase_absent_is_noop() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    trie.set(&[1, 2], true).unwrap();
    let before = trie.identifier();
    assert!(!trie.set(&[9, 9], false).unwrap());
    assert_eq!(trie.erase_all([[7, 7], [8, 8]]).unwrap(), 0);
    assert_eq!(trie.identifier(), before);
}

#[test]
fn depth_one_relation() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(1, &ctx).unwrap();
    for k in 0_u32..10 {
        trie.set(&[k], true).unwrap();
    }
    assert_eq!(trie.size(), 10);
    for k in 0_u32..10 {
        assert!(trie.get(&[k]).unwrap());
    }
    assert!(!trie.get(&[10]).unwrap());
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn hundred_entries_depth_three() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    for i in 0_u32..100 {
        trie.set(&[i % 7, i % 11, i], true).unwrap();
    }
    assert_eq!(trie.size(), 100);
    for i in 0_u32..100 {
        assert!(trie.get(&[i % 7, i % 11, i]).unwrap(), "missing entry {i}");
        assert!(!trie.get(&[i % 7, i % 11, i + 100]).unwrap());
    }
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn counting_values() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    for i in 0_u32..20 {
        trie.set(&[i, i + 1], u64::from(i) + 1).unwrap();
    }
    for i in 0_u32..20 {
        trie.set(&[i, i + 1], u64::from(i) * 10 + 1).unwrap();
    }
    for i in 0_u32..20 {
        assert_eq!(trie.get(&[i, i + 1]).unwrap(), u64::from(i) * 10 + 1);
    }
    assert_eq!(trie.size(), 20);
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn float_values() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    trie.set(&['a', 'b'], 0.5_f64).unwrap();
    trie.set(&['b', 'a'], 1.5).unwrap();
    assert!((trie.get(&['a', 'b']).unwrap() - 0.5).abs() < f64::EPSILON);
    assert!((trie.set(&['a', 'b'], 0.0).unwrap() - 0.5).abs() < f64::EPSILON);
    assert_eq!(trie.size(), 1);
    assert_consistent(&ctx, &[&trie]);
}

#[test]
fn get_cards() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(3, &ctx).unwrap();
    trie.insert_all([([1, 2, 3], true), ([1, 2, 4], true), ([5, 2, 3], true)])
        .unwrap();
    assert_eq!(trie.get_cards(&[0, 1, 2]).unwrap(), vec![2, 1, 2]);
    assert_eq!(trie.get_cards(&[2, 0]).unwrap(), vec![2, 2]);
    assert_eq!(trie.get_cards(&[]).unwrap(), Vec::<usize>::new());
    assert!(matches!(
        trie.get_cards(&[3]),
        Err(HypertrieError::PositionOutOfRange {
            position: 3,
            depth: 3
        })
    ));
    assert!(matches!(
        trie.get_cards(&[1, 1]),
        Err(HypertrieError::DuplicatePosition(1))
    ));
}
