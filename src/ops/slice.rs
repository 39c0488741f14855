//! Slicing: fixing some key positions to concrete key parts.

use smallvec::SmallVec;

use crate::config::MAX_DEPTH;
use crate::key::{RawKey, SingleEntry};
use crate::node::{Edges, NodeContainer, NodeRef};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

use super::get::get;

/// Result of a slice.
pub enum SliceResult<K, V> {
    /// All positions were fixed.
    Value(V),
    /// A node of the store (or an empty or inlined node). Not counted:
    /// callers keeping it must take a reference.
    Node(NodeContainer<K>),
    /// A single entry cut out of a single-entry node. Unmanaged: it exists
    /// only in the result and is not in any store.
    Entry(SingleEntry<K, V>),
}

impl<K: KeyPart, V: Value> SliceResult<K, V> {
    /// Returns `true` if the slice holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Value(value) => value.is_zero(),
            Self::Node(nodec) => nodec.is_empty(),
            Self::Entry(_) => false,
        }
    }

    /// Number of entries in the slice; 1 for a non-zero value.
    #[must_use]
    pub fn size(&self, store: &NodeStore<K, V>) -> usize {
        match self {
            Self::Value(value) => usize::from(!value.is_zero()),
            Self::Node(nodec) => super::get::node_size(store, nodec.depth, nodec.node),
            Self::Entry(_) => 1,
        }
    }
}

type FixedPositions<K> = SmallVec<[(usize, K); MAX_DEPTH]>;

/// Slices `nodec` with `fixed` `(position, key_part)` pairs.
///
/// Positions must be distinct and below the depth. Fixing every position
/// yields a value.
pub fn slice<K, V>(
    store: &NodeStore<K, V>,
    nodec: NodeContainer<K>,
    fixed: &[(usize, K)],
) -> SliceResult<K, V>
where
    K: KeyPart,
    V: Value,
{
    debug_assert!(fixed.len() <= nodec.depth);
    debug_assert!(fixed.iter().all(|&(pos, _)| pos < nodec.depth));
    if fixed.is_empty() {
        return SliceResult::Node(nodec);
    }
    if fixed.len() == nodec.depth {
        let mut key = RawKey::from_elem(fixed[0].1, nodec.depth);
        for &(pos, kp) in fixed {
            key[pos] = kp;
        }
        return SliceResult::Value(get(store, nodec, &key));
    }

    let result_depth = nodec.depth - fixed.len();
    let mut fixed: FixedPositions<K> = SmallVec::from_slice(fixed);
    let mut depth = nodec.depth;
    let mut node = nodec.node;
    loop {
        if fixed.is_empty() {
            return SliceResult::Node(NodeContainer { depth, node });
        }
        match node {
            NodeRef::Empty => return SliceResult::Node(NodeContainer::empty(result_depth)),
            NodeRef::Inline(k) => return slice_entry(&[k], V::ONE, &fixed),
            NodeRef::Stored(id) if id.is_sen() => {
                let sen = store.sen(depth, id);
                return slice_entry(&sen.key, sen.value, &fixed);
            }
            NodeRef::Stored(id) => {
                let full = store.full(depth, id);
                let Edges::Children(children) = &full.edges else {
                    unreachable!("depth-1 node reached with positions left to fix");
                };
                let positions: SmallVec<[usize; MAX_DEPTH]> =
                    fixed.iter().map(|&(pos, _)| pos).collect();
                let (pos, kp) = fixed.remove(full.min_card_pos_of(&positions));
                let Some(&child) = children[pos].get(&kp) else {
                    return SliceResult::Node(NodeContainer::empty(result_depth));
                };
                for entry in &mut fixed {
                    if entry.0 > pos {
                        entry.0 -= 1;
                    }
                }
                node = child;
                depth -= 1;
            }
        }
    }
}

/// Slices the single entry `key → value` with `fixed` positions.
///
/// A boolean result of depth 1 is returned as an inlined node; other
/// non-empty results are unmanaged entries.
pub fn slice_entry<K, V>(key: &[K], value: V, fixed: &[(usize, K)]) -> SliceResult<K, V>
where
    K: KeyPart,
    V: Value,
{
    let result_depth = key.len() - fixed.len();
    let matches = fixed.iter().all(|&(pos, kp)| key[pos] == kp);
    if result_depth == 0 {
        return SliceResult::Value(if matches { value } else { V::ZERO });
    }
    if !matches {
        return SliceResult::Node(NodeContainer::empty(result_depth));
    }
    let rest: RawKey<K> = key
        .iter()
        .enumerate()
        .filter(|(pos, _)| !fixed.iter().any(|&(fixed_pos, _)| fixed_pos == *pos))
        .map(|(_, &kp)| kp)
        .collect();
    if V::IS_BOOL && result_depth == 1 {
        return SliceResult::Node(NodeContainer {
            depth: 1,
            node: NodeRef::Inline(rest[0]),
        });
    }
    SliceResult::Entry(SingleEntry { key: rest, value })
}
