use crate::{Hypertrie, HypertrieContext, SingleEntry};

#[test]
fn default_context_is_empty() {
    let ctx: HypertrieContext<u32, bool> = HypertrieContext::default();
    assert_eq!(ctx.node_count(), 0);
    assert!(ctx.ptr_eq(&ctx.clone()));
}

#[test]
fn display_format() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(2, &ctx).unwrap();
    assert_eq!(trie.to_string(), "{depth: 2, size: 0, entries: []}");
    trie.set(&[1_u32, 2], 3_u64).unwrap();
    assert_eq!(trie.to_string(), "{depth: 2, size: 1, entries: [⟨1, 2⟩ → 3]}");
    trie.set(&[4, 5], 6).unwrap();
    let shown = trie.to_string();
    assert!(shown.starts_with("{depth: 2, size: 2, entries: ["));
    assert!(shown.contains("⟨1, 2⟩ → 3"));
    assert!(shown.contains("⟨4, 5⟩ → 6"));
}

#[test]
fn debug_format() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let trie = Hypertrie::new(3, &ctx).unwrap();
    let dbg = format!("{trie:?}");
    assert!(dbg.contains("Hypertrie"));
    assert!(dbg.contains("depth: 3"));
    assert!(format!("{ctx:?}").contains("HypertrieContext"));
    assert_eq!(
        format!("{:?}", SingleEntry::new(&[1_u32, 2], true)),
        "⟨1, 2⟩ → true"
    );
}

#[test]
fn equality_needs_same_depth() {
    let ctx = HypertrieContext::<u32, bool>::new();
    let a = Hypertrie::new(2, &ctx).unwrap();
    let b = Hypertrie::new(3, &ctx).unwrap();
    let c = Hypertrie::new(2, &ctx).unwrap();
    assert_ne!(a, b);
    assert_eq!(a, c);
}

#[test]
fn into_iterator_by_ref() {
    let ctx = HypertrieContext::new();
    let mut trie = Hypertrie::new(1, &ctx).unwrap();
    trie.insert_all([([1_u32], true), ([2], true), ([3], true)])
        .unwrap();
    let mut seen = Vec::new();
    for entry in &trie {
        seen.push(entry.key[0]);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3]);
}
