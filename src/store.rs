//! Hash-consed node storage.
//!
//! Nodes are kept per depth and per kind in maps keyed by [`Identifier`].
//! The store never re-keys a node in place: a content change always means
//! erasing under the old identifier and inserting under the new one.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::identifier::Identifier;
use crate::node::{FullNode, SingleEntryNode};
use crate::value::{KeyPart, Value};

/// Nodes of one kind at one depth.
pub struct SpecificNodes<N>(FxHashMap<Identifier, N>);

impl<N> SpecificNodes<N> {
    fn new() -> Self {
        Self(FxHashMap::default())
    }

    /// Returns the node stored under `id`.
    #[must_use]
    pub fn lookup(&self, id: Identifier) -> Option<&N> {
        self.0.get(&id)
    }

    /// Returns the node stored under `id` for refcount updates.
    pub fn lookup_mut(&mut self, id: Identifier) -> Option<&mut N> {
        self.0.get_mut(&id)
    }

    /// Returns `true` if a node is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: Identifier) -> bool {
        self.0.contains_key(&id)
    }

    /// Stores a node under an identifier that must not be in use.
    pub fn insert_new(&mut self, id: Identifier, node: N) {
        let previous = self.0.insert(id, node);
        debug_assert!(previous.is_none(), "node {id:?} already stored");
    }

    /// Removes and returns the node stored under `id`.
    pub fn erase(&mut self, id: Identifier) -> Option<N> {
        self.0.remove(&id)
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no node is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(identifier, node)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Identifier, &N)> {
        self.0.iter().map(|(&id, node)| (id, node))
    }
}

/// Single-entry and full nodes of one depth.
pub struct StoreLevel<K, V> {
    /// Single-entry nodes.
    pub sens: SpecificNodes<SingleEntryNode<K, V>>,
    /// Full nodes.
    pub fns: SpecificNodes<FullNode<K, V>>,
}

/// All nodes of a context, one [`StoreLevel`] per depth `1..=max_depth`.
pub struct NodeStore<K, V> {
    levels: Vec<StoreLevel<K, V>>,
}

impl<K: KeyPart, V: Value> NodeStore<K, V> {
    /// Creates an empty store for depths `1..=max_depth`.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            levels: (0..max_depth)
                .map(|_| StoreLevel {
                    sens: SpecificNodes::new(),
                    fns: SpecificNodes::new(),
                })
                .collect(),
        }
    }

    /// Returns the level for `depth`.
    #[must_use]
    pub fn level(&self, depth: usize) -> &StoreLevel<K, V> {
        &self.levels[depth - 1]
    }

    /// Returns the level for `depth` mutably.
    pub fn level_mut(&mut self, depth: usize) -> &mut StoreLevel<K, V> {
        &mut self.levels[depth - 1]
    }

    /// Returns the single-entry node `id` at `depth`.
    ///
    /// # Panics
    ///
    /// Panics if the node is missing, which means a referenced node was
    /// released too early.
    #[must_use]
    pub fn sen(&self, depth: usize, id: Identifier) -> &SingleEntryNode<K, V> {
        self.level(depth)
            .sens
            .lookup(id)
            .unwrap_or_else(|| panic!("missing single-entry node {id:?} at depth {depth}"))
    }

    /// Returns the full node `id` at `depth`.
    ///
    /// # Panics
    ///
    /// Panics if the node is missing, which means a referenced node was
    /// released too early.
    #[must_use]
    pub fn full(&self, depth: usize, id: Identifier) -> &FullNode<K, V> {
        self.level(depth)
            .fns
            .lookup(id)
            .unwrap_or_else(|| panic!("missing full node {id:?} at depth {depth}"))
    }

    /// Total number of stored nodes over all depths and kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels
            .iter()
            .map(|level| level.sens.len() + level.fns.len())
            .sum()
    }

    /// Returns `true` if no node is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum depth this store holds nodes for.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.levels.len()
    }
}

impl<K, V> fmt::Debug for NodeStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for level in &self.levels {
            list.entry(&format_args!(
                "sens: {}, fns: {}",
                level.sens.len(),
                level.fns.len()
            ));
        }
        list.finish()
    }
}
