//! Diagonals: key parts shared by several key positions.
//!
//! For a set of positions, the diagonal maps every key part `k` such that
//! some entry carries `k` at all of those positions to the slice obtained
//! by fixing them all to `k`.

use smallvec::SmallVec;

use crate::config::MAX_DEPTH;
use crate::node::{Edges, NodeContainer, NodeRef};
use crate::ops::slice::{SliceResult, slice};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

type Positions = SmallVec<[usize; MAX_DEPTH]>;

/// Key part shared by `positions` of a single entry, if any.
#[must_use]
pub fn entry_candidate<K: KeyPart>(key: &[K], positions: &[usize]) -> Option<K> {
    let first = key[*positions.first()?];
    positions.iter().all(|&pos| key[pos] == first).then_some(first)
}

/// Key parts that may lie on the diagonal of `positions`.
///
/// For a full node, these are the key parts of the constrained position
/// with the fewest key parts. A superset of the actual diagonal.
#[must_use]
pub fn candidates<K, V>(store: &NodeStore<K, V>, nodec: NodeContainer<K>, positions: &[usize]) -> Vec<K>
where
    K: KeyPart,
    V: Value,
{
    match nodec.node {
        NodeRef::Empty => Vec::new(),
        NodeRef::Inline(k) => vec![k],
        NodeRef::Stored(id) if id.is_sen() => {
            let sen = store.sen(nodec.depth, id);
            entry_candidate(&sen.key, positions).into_iter().collect()
        }
        NodeRef::Stored(id) => {
            let full = store.full(nodec.depth, id);
            match &full.edges {
                Edges::Values(values) => values.keys().copied().collect(),
                Edges::Children(children) => {
                    let pos = positions[full.min_card_pos_of(positions)];
                    children[pos].keys().copied().collect()
                }
            }
        }
    }
}

/// Slice with every one of `positions` fixed to `key_part`.
#[must_use]
pub fn diagonal_slice<K, V>(
    store: &NodeStore<K, V>,
    nodec: NodeContainer<K>,
    positions: &[usize],
    key_part: K,
) -> SliceResult<K, V>
where
    K: KeyPart,
    V: Value,
{
    let fixed: SmallVec<[(usize, K); MAX_DEPTH]> =
        positions.iter().map(|&pos| (pos, key_part)).collect();
    slice(store, nodec, &fixed)
}

/// Restartable cursor over the diagonal of a node.
///
/// Yields `(key_part, slice)` pairs; a slice is a value when every position
/// is on the diagonal.
pub struct Diagonal<'a, K, V> {
    store: &'a NodeStore<K, V>,
    nodec: NodeContainer<K>,
    positions: Positions,
    candidates: Vec<K>,
    cursor: usize,
}

impl<'a, K: KeyPart, V: Value> Diagonal<'a, K, V> {
    /// Creates a cursor over the diagonal of `positions`.
    #[must_use]
    pub fn new(store: &'a NodeStore<K, V>, nodec: NodeContainer<K>, positions: &[usize]) -> Self {
        debug_assert!(!positions.is_empty());
        Self {
            store,
            nodec,
            positions: SmallVec::from_slice(positions),
            candidates: candidates(store, nodec, positions),
            cursor: 0,
        }
    }

    /// Slice at `key_part`, or `None` if `key_part` is not on the diagonal.
    #[must_use]
    pub fn find(&self, key_part: K) -> Option<SliceResult<K, V>> {
        let result = diagonal_slice(self.store, self.nodec, &self.positions, key_part);
        (!result.is_empty()).then_some(result)
    }

    /// Restarts the cursor.
    pub const fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Upper bound on the number of key parts on the diagonal.
    #[must_use]
    pub fn size(&self) -> usize {
        self.candidates.len()
    }
}

impl<K: KeyPart, V: Value> Iterator for Diagonal<'_, K, V> {
    type Item = (K, SliceResult<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&key_part) = self.candidates.get(self.cursor) {
            self.cursor += 1;
            if let Some(result) = Diagonal::find(self, key_part) {
                return Some((key_part, result));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len() - self.cursor))
    }
}
