//! Node representations and node handles.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::identifier::Identifier;
use crate::key::{RawKey, SingleEntry};
use crate::value::{KeyPart, Value};

/// Reference from a parent edge (or a container) to a node one depth lower.
///
/// Three variants, never bit-packed:
/// - [`Empty`](Self::Empty): no entries
/// - [`Inline`](Self::Inline): a depth-1 boolean single entry holding only
///   its key part; never stored and never refcounted
/// - [`Stored`](Self::Stored): a node in the store, single-entry or full
///   according to the identifier tag
pub enum NodeRef<K> {
    /// No node.
    Empty,
    /// Depth-1 boolean single entry `⟨k⟩ → true`.
    Inline(K),
    /// A node held by the [`NodeStore`](crate::store::NodeStore).
    Stored(Identifier),
}

impl<K: KeyPart> NodeRef<K> {
    /// Returns the identifier of the referenced node.
    ///
    /// Inline entries get the identifier their single-entry node would have.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        match *self {
            Self::Empty => Identifier::EMPTY,
            Self::Inline(k) => Identifier::of_entry(&[k], true),
            Self::Stored(id) => id,
        }
    }

    /// Returns `true` for [`Empty`](Self::Empty).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` for a stored full node.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Stored(id) if id.is_fn())
    }
}

/// Non-owning view of a node at a given depth.
///
/// The unit exchanged with [`NodeContext`](crate::NodeContext). Copying a
/// container does not touch reference counts; callers that keep a copy must
/// call [`inc_ref`](crate::NodeContext::inc_ref) themselves.
pub struct NodeContainer<K> {
    /// Number of key positions of the referenced node.
    pub depth: usize,
    /// The referenced node.
    pub node: NodeRef<K>,
}

impl<K> NodeContainer<K> {
    /// An empty container of the given depth.
    #[must_use]
    pub const fn empty(depth: usize) -> Self {
        Self {
            depth,
            node: NodeRef::Empty,
        }
    }

    /// Returns `true` if the container references no node.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.node, NodeRef::Empty)
    }
}

impl<K: KeyPart> NodeContainer<K> {
    /// Identifier of the referenced node.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        self.node.identifier()
    }
}

/// Node holding exactly one entry.
pub struct SingleEntryNode<K, V> {
    /// Key of the entry.
    pub key: RawKey<K>,
    /// Value of the entry.
    pub value: V,
    /// Number of live references.
    pub ref_count: usize,
}

impl<K: KeyPart, V: Value> SingleEntryNode<K, V> {
    /// Creates a node for `entry` with the given reference count.
    #[must_use]
    pub fn new(entry: SingleEntry<K, V>, ref_count: usize) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
            ref_count,
        }
    }

    /// Copies the entry out of the node.
    #[must_use]
    pub fn entry(&self) -> SingleEntry<K, V> {
        SingleEntry {
            key: self.key.clone(),
            value: self.value,
        }
    }
}

/// Outgoing edges of a full node.
pub enum Edges<K, V> {
    /// Depth 1: key part to value. Boolean relations store `true`.
    Values(FxHashMap<K, V>),
    /// Depth > 1: one map per key position, key part to child of depth - 1.
    Children(Vec<FxHashMap<K, NodeRef<K>>>),
}

/// Node holding two or more entries.
///
/// Invariant: `size >= 2`. Every child edge in every position holds one
/// reference to its child.
pub struct FullNode<K, V> {
    /// Number of live references.
    pub ref_count: usize,
    /// Number of entries in the subtree.
    pub size: usize,
    /// Outgoing edges.
    pub edges: Edges<K, V>,
}

impl<K: KeyPart, V: Value> FullNode<K, V> {
    /// Creates a node without entries for the given depth.
    #[must_use]
    pub fn new(depth: usize, ref_count: usize) -> Self {
        let edges = if depth == 1 {
            Edges::Values(FxHashMap::default())
        } else {
            Edges::Children((0..depth).map(|_| FxHashMap::default()).collect())
        };
        Self {
            ref_count,
            size: 0,
            edges,
        }
    }

    /// Number of distinct key parts at `position`.
    #[must_use]
    pub fn cardinality(&self, position: usize) -> usize {
        match &self.edges {
            Edges::Values(values) => values.len(),
            Edges::Children(children) => children[position].len(),
        }
    }

    /// Position with the fewest distinct key parts.
    #[must_use]
    pub fn min_card_pos(&self) -> usize {
        match &self.edges {
            Edges::Values(_) => 0,
            Edges::Children(children) => (0..children.len())
                .min_by_key(|&pos| children[pos].len())
                .unwrap_or(0),
        }
    }

    /// Index into `positions` of the position with the fewest key parts.
    #[must_use]
    pub fn min_card_pos_of(&self, positions: &[usize]) -> usize {
        (0..positions.len())
            .min_by_key(|&i| self.cardinality(positions[i]))
            .unwrap_or(0)
    }

    /// Position with the most distinct key parts.
    #[must_use]
    pub fn max_card_pos(&self) -> usize {
        match &self.edges {
            Edges::Values(_) => 0,
            Edges::Children(children) => (0..children.len())
                .max_by_key(|&pos| children[pos].len())
                .unwrap_or(0),
        }
    }

    /// Child reached from `key_part` at `position`, or empty.
    #[must_use]
    pub fn child(&self, position: usize, key_part: K) -> NodeRef<K> {
        match &self.edges {
            Edges::Children(children) => children[position]
                .get(&key_part)
                .copied()
                .unwrap_or(NodeRef::Empty),
            Edges::Values(_) => unreachable!("depth-1 full node has no children"),
        }
    }

    /// Value stored for `key_part` in a depth-1 node, or zero.
    #[must_use]
    pub fn value(&self, key_part: K) -> V {
        match &self.edges {
            Edges::Values(values) => values.get(&key_part).copied().unwrap_or(V::ZERO),
            Edges::Children(_) => unreachable!("only depth-1 full nodes hold values"),
        }
    }
}

// ---------------------------------------------------------------------------
// Manual trait impls
// ---------------------------------------------------------------------------

impl<K: Copy> Clone for NodeRef<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Copy> Copy for NodeRef<K> {}

impl<K: PartialEq> PartialEq for NodeRef<K> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Inline(a), Self::Inline(b)) => a == b,
            (Self::Stored(a), Self::Stored(b)) => a == b,
            _ => false,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for NodeRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Inline(k) => f.debug_tuple("Inline").field(k).finish(),
            Self::Stored(id) => f.debug_tuple("Stored").field(id).finish(),
        }
    }
}

impl<K: Copy> Clone for NodeContainer<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Copy> Copy for NodeContainer<K> {}

impl<K: PartialEq> PartialEq for NodeContainer<K> {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.node == other.node
    }
}

impl<K: fmt::Debug> fmt::Debug for NodeContainer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContainer")
            .field("depth", &self.depth)
            .field("node", &self.node)
            .finish()
    }
}

impl<K: Copy, V: Copy> Clone for Edges<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Values(values) => Self::Values(values.clone()),
            Self::Children(children) => Self::Children(children.clone()),
        }
    }
}

impl<K: Copy, V: Copy> Clone for FullNode<K, V> {
    fn clone(&self) -> Self {
        Self {
            ref_count: self.ref_count,
            size: self.size,
            edges: self.edges.clone(),
        }
    }
}

impl<K, V> fmt::Debug for FullNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullNode")
            .field("ref_count", &self.ref_count)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SingleEntryNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleEntryNode")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("ref_count", &self.ref_count)
            .finish()
    }
}
