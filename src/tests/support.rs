//! Store validation shared by the tests.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::identifier::Identifier;
use crate::iter::Iter;
use crate::node::{Edges, NodeContainer, NodeRef};
use crate::ops::get::node_size;
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};
use crate::{Hypertrie, HypertrieContext};

fn count_ref<K>(expected: &mut FxHashMap<(usize, Identifier), usize>, depth: usize, node: NodeRef<K>) {
    if let NodeRef::Stored(id) = node {
        *expected.entry((depth, id)).or_default() += 1;
    }
}

fn assert_present<K: KeyPart, V: Value>(store: &NodeStore<K, V>, depth: usize, node: NodeRef<K>) {
    if let NodeRef::Stored(id) = node {
        let level = store.level(depth);
        let found = if id.is_sen() {
            level.sens.contains(id)
        } else {
            level.fns.contains(id)
        };
        assert!(found, "dangling reference to {id:?} at depth {depth}");
    }
}

/// Checks every structural invariant of `store`, given the root containers
/// of all live hypertries:
///
/// - identifiers match the entries reachable from each node
/// - full nodes hold at least two entries, consistently along every position
/// - reference counts equal root references plus parent edges
/// - no node is referenced without being stored
pub fn assert_store_consistent<K, V>(store: &NodeStore<K, V>, roots: &[NodeContainer<K>])
where
    K: KeyPart,
    V: Value,
{
    let mut expected: FxHashMap<(usize, Identifier), usize> = FxHashMap::default();

    for depth in 1..=store.max_depth() {
        let level = store.level(depth);
        for (id, sen) in level.sens.iter() {
            assert!(id.is_sen(), "{id:?} stored as single-entry node");
            assert_eq!(sen.key.len(), depth);
            assert!(!sen.value.is_zero(), "zero value stored in {id:?}");
            assert!(!(V::IS_BOOL && depth == 1), "boolean depth-1 entry not inlined");
            assert_eq!(id, Identifier::of_entry(&sen.key, sen.value));
        }
        for (id, full) in level.fns.iter() {
            assert!(id.is_fn(), "{id:?} stored as full node");
            assert!(full.size >= 2, "full node {id:?} has size {}", full.size);
            match &full.edges {
                Edges::Values(values) => {
                    assert_eq!(depth, 1);
                    assert_eq!(values.len(), full.size);
                    assert!(values.values().all(|value| !value.is_zero()));
                }
                Edges::Children(children) => {
                    assert_eq!(children.len(), depth);
                    for (pos, edges) in children.iter().enumerate() {
                        let mut sum = 0;
                        for &child in edges.values() {
                            assert!(!child.is_empty(), "empty edge in {id:?}");
                            if matches!(child, NodeRef::Inline(_)) {
                                assert!(V::IS_BOOL && depth == 2, "misplaced inline edge");
                            }
                            assert_present(store, depth - 1, child);
                            sum += node_size(store, depth - 1, child);
                            count_ref(&mut expected, depth - 1, child);
                        }
                        assert_eq!(sum, full.size, "position {pos} of {id:?} disagrees on size");
                    }
                }
            }
            let nodec = NodeContainer {
                depth,
                node: NodeRef::Stored(id),
            };
            let entries: Vec<_> = Iter::new(store, nodec).collect();
            assert_eq!(entries.len(), full.size);
            let recomputed =
                Identifier::of_entries(entries.iter().map(|e| (e.key.as_slice(), e.value)));
            assert_eq!(recomputed, id, "stale identifier at depth {depth}");
        }
    }

    for root in roots {
        assert_present(store, root.depth, root.node);
        count_ref(&mut expected, root.depth, root.node);
    }

    for depth in 1..=store.max_depth() {
        let level = store.level(depth);
        let stored = level
            .sens
            .iter()
            .map(|(id, node)| (id, node.ref_count))
            .chain(level.fns.iter().map(|(id, node)| (id, node.ref_count)));
        for (id, ref_count) in stored {
            let references = expected.remove(&(depth, id)).unwrap_or(0);
            assert_eq!(ref_count, references, "refcount of {id:?} at depth {depth}");
        }
    }
    assert!(expected.is_empty(), "references to unstored nodes: {expected:?}");
}

/// [`assert_store_consistent`] over the managed hypertries in `live`.
pub fn assert_consistent<K, V>(context: &HypertrieContext<K, V>, live: &[&Hypertrie<K, V>])
where
    K: KeyPart,
    V: Value,
{
    let roots: Vec<NodeContainer<K>> = live
        .iter()
        .filter_map(|trie| trie.node_container())
        .collect();
    assert_store_consistent(context.raw().store(), &roots);
}

/// All entries of `trie`, ordered by key.
pub fn contents<K, V>(trie: &Hypertrie<K, V>) -> BTreeMap<Vec<K>, V>
where
    K: KeyPart + Ord,
    V: Value,
{
    trie.iter()
        .map(|entry| (entry.key.to_vec(), entry.value))
        .collect()
}

/// Asserts that `trie` holds exactly `model`.
pub fn assert_matches_model<K, V>(trie: &Hypertrie<K, V>, model: &BTreeMap<Vec<K>, V>)
where
    K: KeyPart + Ord,
    V: Value,
{
    assert_eq!(trie.size(), model.len());
    assert_eq!(trie.is_empty(), model.is_empty());
    for (key, &value) in model {
        assert_eq!(trie.get(key).ok(), Some(value), "wrong value at {key:?}");
    }
    assert_eq!(&contents(trie), model);
}
