//! Point lookup and size.

use crate::key::RawKey;
use crate::node::{Edges, NodeContainer, NodeRef};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

/// Looks up `key` in the node referenced by `nodec`.
///
/// At a full node, descends along the position with the fewest key parts.
/// Returns [`Value::ZERO`] if the key is absent.
pub fn get<K, V>(store: &NodeStore<K, V>, nodec: NodeContainer<K>, key: &[K]) -> V
where
    K: KeyPart,
    V: Value,
{
    debug_assert_eq!(key.len(), nodec.depth);
    let mut depth = nodec.depth;
    let mut node = nodec.node;
    let mut key = RawKey::from_slice(key);
    loop {
        match node {
            NodeRef::Empty => return V::ZERO,
            NodeRef::Inline(k) => return if key[0] == k { V::ONE } else { V::ZERO },
            NodeRef::Stored(id) if id.is_sen() => {
                let sen = store.sen(depth, id);
                return if sen.key == key { sen.value } else { V::ZERO };
            }
            NodeRef::Stored(id) => {
                let full = store.full(depth, id);
                match &full.edges {
                    Edges::Values(_) => return full.value(key[0]),
                    Edges::Children(children) => {
                        let pos = full.min_card_pos();
                        let kp = key.remove(pos);
                        match children[pos].get(&kp) {
                            Some(&child) => node = child,
                            None => return V::ZERO,
                        }
                        depth -= 1;
                    }
                }
            }
        }
    }
}

/// Number of entries of `node` at `depth`.
#[must_use]
pub fn node_size<K, V>(store: &NodeStore<K, V>, depth: usize, node: NodeRef<K>) -> usize
where
    K: KeyPart,
    V: Value,
{
    match node {
        NodeRef::Empty => 0,
        NodeRef::Inline(_) => 1,
        NodeRef::Stored(id) if id.is_sen() => 1,
        NodeRef::Stored(id) => store.full(depth, id).size,
    }
}

/// Number of distinct key parts at each of `positions`.
#[must_use]
pub fn cards<K, V>(store: &NodeStore<K, V>, nodec: NodeContainer<K>, positions: &[usize]) -> Vec<usize>
where
    K: KeyPart,
    V: Value,
{
    match nodec.node {
        NodeRef::Empty => vec![0; positions.len()],
        NodeRef::Stored(id) if id.is_fn() => {
            let full = store.full(nodec.depth, id);
            positions.iter().map(|&pos| full.cardinality(pos)).collect()
        }
        NodeRef::Inline(_) | NodeRef::Stored(_) => vec![1; positions.len()],
    }
}
