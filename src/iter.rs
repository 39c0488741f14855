//! Lazy depth-first iteration over all entries of a node.

use std::collections::hash_map;

use crate::key::{RawKey, SingleEntry};
use crate::node::{Edges, NodeContainer, NodeRef};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

enum Frame<'a, K, V> {
    /// Depth-1 full node: key part to value.
    Values(hash_map::Iter<'a, K, V>),
    /// Full node of `depth`, walked along its last position.
    Children {
        depth: usize,
        edges: hash_map::Iter<'a, K, NodeRef<K>>,
    },
}

enum Step<K, V> {
    Leaf(K, V),
    Child(usize, K, NodeRef<K>),
}

/// Iterator over `(key, value)` pairs of a node.
///
/// A full node of depth `d` is walked along position `d - 1`, so every
/// child covers positions `0..d - 1` of the same key buffer. Single-entry
/// nodes fill the remaining positions at once. Forward-only; create a new
/// iterator to restart.
pub struct Iter<'a, K, V> {
    store: &'a NodeStore<K, V>,
    stack: Vec<Frame<'a, K, V>>,
    key: RawKey<K>,
    pending: Option<SingleEntry<K, V>>,
}

impl<'a, K: KeyPart, V: Value> Iter<'a, K, V> {
    /// Creates an iterator over the node referenced by `nodec`.
    #[must_use]
    pub fn new(store: &'a NodeStore<K, V>, nodec: NodeContainer<K>) -> Self {
        let mut iter = Self {
            store,
            stack: Vec::new(),
            key: RawKey::new(),
            pending: None,
        };
        if let Some(entry) = iter.enter(nodec.depth, nodec.node) {
            iter.pending = Some(entry);
        }
        iter
    }

    /// Creates an iterator yielding only `entry`.
    #[must_use]
    pub fn single(store: &'a NodeStore<K, V>, entry: SingleEntry<K, V>) -> Self {
        Self {
            store,
            stack: Vec::new(),
            key: RawKey::new(),
            pending: Some(entry),
        }
    }

    /// Descends into `node`, covering `key[0..depth]`.
    ///
    /// Returns the entry directly for single-entry nodes; pushes a frame
    /// for full nodes.
    fn enter(&mut self, depth: usize, node: NodeRef<K>) -> Option<SingleEntry<K, V>> {
        let store = self.store;
        match node {
            NodeRef::Empty => None,
            NodeRef::Inline(k) => {
                self.write_key(0, k);
                Some(self.current(V::ONE))
            }
            NodeRef::Stored(id) if id.is_sen() => {
                let sen = store.sen(depth, id);
                for (pos, &kp) in sen.key.iter().enumerate() {
                    self.write_key(pos, kp);
                }
                Some(self.current(sen.value))
            }
            NodeRef::Stored(id) => {
                let full = store.full(depth, id);
                let frame = match &full.edges {
                    Edges::Values(values) => Frame::Values(values.iter()),
                    Edges::Children(children) => Frame::Children {
                        depth,
                        edges: children[depth - 1].iter(),
                    },
                };
                self.stack.push(frame);
                None
            }
        }
    }

    fn write_key(&mut self, pos: usize, kp: K) {
        if self.key.len() <= pos {
            self.key.resize(pos + 1, kp);
        }
        self.key[pos] = kp;
    }

    fn current(&self, value: V) -> SingleEntry<K, V> {
        SingleEntry {
            key: self.key.clone(),
            value,
        }
    }
}

impl<K: KeyPart, V: Value> Iterator for Iter<'_, K, V> {
    type Item = SingleEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.pending.take() {
            return Some(entry);
        }
        loop {
            let step = match self.stack.last_mut()? {
                Frame::Values(values) => values.next().map(|(&k, &v)| Step::Leaf(k, v)),
                Frame::Children { depth, edges } => {
                    edges.next().map(|(&kp, &child)| Step::Child(*depth, kp, child))
                }
            };
            match step {
                None => {
                    self.stack.pop();
                }
                Some(Step::Leaf(k, v)) => {
                    self.write_key(0, k);
                    return Some(self.current(v));
                }
                Some(Step::Child(depth, kp, child)) => {
                    self.write_key(depth - 1, kp);
                    if let Some(entry) = self.enter(depth - 1, child) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}
