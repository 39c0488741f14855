//! Request collection.
//!
//! For one depth, records what every touched node must become without
//! touching the store: new nodes, entry updates of existing nodes (inserts,
//! erases and value changes in one pass), and reference count deltas. Requests
//! with equal `(source, target)` pairs are merged.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::identifier::Identifier;
use crate::key::{RawKey, SingleEntry, insert_position};
use crate::node::{Edges, FullNode, NodeRef};
use crate::ops::get::node_size;
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

/// Replacement of the value of an existing entry.
pub struct ValueChange<K, V> {
    /// Key of the entry.
    pub key: RawKey<K>,
    /// Current value.
    pub old: V,
    /// Value after the update.
    pub new: V,
}

/// Change applied to a source node to produce a target node.
///
/// Keys are disjoint across the three lists. Inserted keys are absent from
/// the source; erased and changed keys are present in it.
pub struct EntriesUpdate<K, V> {
    /// Entries absent from the source.
    pub insert: Vec<SingleEntry<K, V>>,
    /// Entries present in the source, with their current values.
    pub erase: Vec<SingleEntry<K, V>>,
    /// Value changes of entries present in the source.
    pub change: Vec<ValueChange<K, V>>,
}

impl<K, V> EntriesUpdate<K, V> {
    /// An update inserting `entries`.
    #[must_use]
    pub const fn inserting(entries: Vec<SingleEntry<K, V>>) -> Self {
        Self {
            insert: entries,
            erase: Vec::new(),
            change: Vec::new(),
        }
    }

    /// An update erasing `entries`.
    #[must_use]
    pub const fn erasing(entries: Vec<SingleEntry<K, V>>) -> Self {
        Self {
            insert: Vec::new(),
            erase: entries,
            change: Vec::new(),
        }
    }

    /// An update changing values.
    #[must_use]
    pub const fn changing(changes: Vec<ValueChange<K, V>>) -> Self {
        Self {
            insert: Vec::new(),
            erase: Vec::new(),
            change: changes,
        }
    }

    /// Number of entries touched.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.insert.len() + self.erase.len() + self.change.len()
    }

    /// Returns `true` if no entry is touched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry count of the target, given the source's.
    #[must_use]
    pub const fn size_after(&self, source_size: usize) -> usize {
        source_size + self.insert.len() - self.erase.len()
    }
}

impl<K: KeyPart, V: Value> EntriesUpdate<K, V> {
    /// Identifier of the target, derived from the source's without
    /// visiting untouched entries.
    fn target_id(&self, source: Identifier) -> Identifier {
        let id = source
            .combine(entries_id(&self.insert))
            .combine(entries_id(&self.erase));
        self.change
            .iter()
            .fold(id, |id, c| id.change_value(&c.key, c.old, c.new))
    }

    /// The one entry left in `node` after this update, given that exactly
    /// one remains.
    fn last_entry(
        &self,
        store: &NodeStore<K, V>,
        depth: usize,
        node: &FullNode<K, V>,
    ) -> SingleEntry<K, V> {
        if let Some(entry) = self.insert.first() {
            return entry.clone();
        }
        let mut entry = remaining_entry(store, depth, node, &self.erase);
        if let Some(change) = self.change.iter().find(|c| c.key == entry.key) {
            entry.value = change.new;
        }
        entry
    }
}

/// Pending reference count change of a single-entry node.
pub struct SenChange<K, V> {
    /// Net reference count delta.
    pub delta: isize,
    /// Content, needed if the node does not exist yet.
    pub entry: Option<SingleEntry<K, V>>,
}

impl<K, V> SenChange<K, V> {
    const fn new() -> Self {
        Self {
            delta: 0,
            entry: None,
        }
    }
}

/// Requests collected for one depth.
pub struct UpdateRequests<K, V> {
    depth: usize,
    pub(super) sen_changes: FxHashMap<Identifier, SenChange<K, V>>,
    /// source -> target -> update
    pub(super) fn_updates: FxHashMap<Identifier, FxHashMap<Identifier, EntriesUpdate<K, V>>>,
    pub(super) fn_creations: FxHashMap<Identifier, Vec<SingleEntry<K, V>>>,
    pub(super) fn_deltas: FxHashMap<Identifier, isize>,
    pub(super) deletion_candidates: FxHashSet<Identifier>,
    pub(super) potentially_new: FxHashSet<Identifier>,
}

fn entries_id<K: KeyPart, V: Value>(entries: &[SingleEntry<K, V>]) -> Identifier {
    Identifier::of_entries(entries.iter().map(|e| (&e.key[..], e.value)))
}

impl<K: KeyPart, V: Value> UpdateRequests<K, V> {
    /// Creates an empty request set for `depth`.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            sen_changes: FxHashMap::default(),
            fn_updates: FxHashMap::default(),
            fn_creations: FxHashMap::default(),
            fn_deltas: FxHashMap::default(),
            deletion_candidates: FxHashSet::default(),
            potentially_new: FxHashSet::default(),
        }
    }

    /// Depth the requests apply to.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sen_changes.is_empty() && self.fn_deltas.is_empty() && self.fn_updates.is_empty()
    }

    const fn inlines(&self) -> bool {
        self.depth == 1 && V::IS_BOOL
    }

    // -----------------------------------------------------------------------
    // Structural requests
    // -----------------------------------------------------------------------

    /// Requests a node holding exactly `entries` and one reference to it.
    pub fn add_node(&mut self, mut entries: Vec<SingleEntry<K, V>>) -> NodeRef<K> {
        match entries.len() {
            0 => NodeRef::Empty,
            1 => {
                let entry = entries.swap_remove(0);
                self.add_single_entry(entry)
            }
            _ => {
                let id = entries_id(&entries);
                self.fn_creations.entry(id).or_insert(entries);
                self.apply_fn_delta(id, 1);
                NodeRef::Stored(id)
            }
        }
    }

    fn add_single_entry(&mut self, entry: SingleEntry<K, V>) -> NodeRef<K> {
        if self.inlines() {
            debug_assert!(entry.value == V::ONE);
            return NodeRef::Inline(entry.key[0]);
        }
        let id = entry.identifier();
        let change = self.sen_changes.entry(id).or_insert_with(SenChange::new);
        change.delta += 1;
        if change.entry.is_none() {
            change.entry = Some(entry);
        }
        NodeRef::Stored(id)
    }

    /// Requests `source` with `update` applied.
    ///
    /// With `decrement`, the reference held on `source` is released. A full
    /// node shrinking to one entry becomes a single-entry node whose entry
    /// is recovered from the source's remaining edges.
    pub fn update_node(
        &mut self,
        store: &NodeStore<K, V>,
        source: NodeRef<K>,
        update: EntriesUpdate<K, V>,
        decrement: bool,
    ) -> NodeRef<K> {
        debug_assert!(!update.is_empty());
        match source {
            NodeRef::Empty => {
                debug_assert!(update.erase.is_empty() && update.change.is_empty());
                self.add_node(update.insert)
            }
            NodeRef::Stored(source_id) if source_id.is_fn() => {
                let node = store.full(self.depth, source_id);
                debug_assert!(update.erase.len() <= node.size);
                if decrement {
                    self.apply_fn_delta(source_id, -1);
                }
                let target = update.target_id(source_id);
                match update.size_after(node.size) {
                    0 => NodeRef::Empty,
                    1 => self.compress(store, node, target.as_single_entry(), &update),
                    _ => {
                        self.apply_fn_delta(target, 1);
                        self.fn_updates
                            .entry(source_id)
                            .or_default()
                            .entry(target)
                            .or_insert(update);
                        NodeRef::Stored(target)
                    }
                }
            }
            NodeRef::Inline(_) | NodeRef::Stored(_) => {
                let EntriesUpdate {
                    mut insert,
                    erase,
                    change,
                } = update;
                let mut entry = self.single_entry_of(store, source);
                if decrement {
                    self.apply_ref_count_delta(source, -1);
                }
                if let Some(erased) = erase.first() {
                    debug_assert!(erase.len() == 1 && erased.key == entry.key);
                } else {
                    if let Some(change) = change.first() {
                        debug_assert!(change.key == entry.key);
                        entry.value = change.new;
                    }
                    insert.push(entry);
                }
                self.add_node(insert)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reference counts
    // -----------------------------------------------------------------------

    /// Adds `delta` to the reference count of `node`. No-op for empty and
    /// inlined nodes.
    pub fn apply_ref_count_delta(&mut self, node: NodeRef<K>, delta: isize) {
        match node {
            NodeRef::Stored(id) if id.is_fn() => self.apply_fn_delta(id, delta),
            NodeRef::Stored(id) => {
                self.sen_changes
                    .entry(id)
                    .or_insert_with(SenChange::new)
                    .delta += delta;
            }
            NodeRef::Empty | NodeRef::Inline(_) => {}
        }
    }

    fn apply_fn_delta(&mut self, id: Identifier, delta: isize) {
        *self.fn_deltas.entry(id).or_insert(0) += delta;
        if delta < 0 {
            self.deletion_candidates.insert(id);
        } else {
            self.potentially_new.insert(id);
        }
    }

    // -----------------------------------------------------------------------
    // Compression to a single entry
    // -----------------------------------------------------------------------

    fn compress(
        &mut self,
        store: &NodeStore<K, V>,
        node: &FullNode<K, V>,
        target: Identifier,
        update: &EntriesUpdate<K, V>,
    ) -> NodeRef<K> {
        if self.inlines() {
            return NodeRef::Inline(update.last_entry(store, self.depth, node).key[0]);
        }
        if let Some(change) = self.sen_changes.get_mut(&target) {
            change.delta += 1;
            if change.entry.is_none() && !store.level(self.depth).sens.contains(target) {
                change.entry = Some(update.last_entry(store, self.depth, node));
            }
            return NodeRef::Stored(target);
        }
        let entry = if store.level(self.depth).sens.contains(target) {
            None
        } else {
            Some(update.last_entry(store, self.depth, node))
        };
        self.sen_changes
            .insert(target, SenChange { delta: 1, entry });
        NodeRef::Stored(target)
    }

    fn single_entry_of(&self, store: &NodeStore<K, V>, node: NodeRef<K>) -> SingleEntry<K, V> {
        match node {
            NodeRef::Inline(k) => SingleEntry::new(&[k], V::ONE),
            NodeRef::Stored(id) => store.sen(self.depth, id).entry(),
            NodeRef::Empty => unreachable!("empty node has no entry"),
        }
    }
}

/// Finds the one entry of `node` that is not in `removed`.
///
/// Walks the position with the most key parts and descends into the first
/// child that keeps more entries than are removed below it.
fn remaining_entry<K: KeyPart, V: Value>(
    store: &NodeStore<K, V>,
    depth: usize,
    node: &FullNode<K, V>,
    removed: &[SingleEntry<K, V>],
) -> SingleEntry<K, V> {
    match &node.edges {
        Edges::Values(values) => {
            let Some((&k, &v)) = values
                .iter()
                .find(|(k, _)| !removed.iter().any(|e| e.key[0] == **k))
            else {
                unreachable!("no remaining entry in depth-1 node");
            };
            SingleEntry::new(&[k], v)
        }
        Edges::Children(children) => {
            let pos = node.max_card_pos();
            for (&kp, &child) in &children[pos] {
                let below: Vec<SingleEntry<K, V>> = removed
                    .iter()
                    .filter(|e| e.key[pos] == kp)
                    .map(|e| e.without_position(pos))
                    .collect();
                if node_size(store, depth - 1, child) <= below.len() {
                    continue;
                }
                let inner = match child {
                    NodeRef::Inline(k) => SingleEntry::new(&[k], V::ONE),
                    NodeRef::Stored(id) if id.is_fn() => {
                        remaining_entry(store, depth - 1, store.full(depth - 1, id), &below)
                    }
                    NodeRef::Stored(id) => store.sen(depth - 1, id).entry(),
                    NodeRef::Empty => unreachable!("empty child edge"),
                };
                return SingleEntry {
                    key: insert_position(&inner.key, pos, kp),
                    value: inner.value,
                };
            }
            unreachable!("no remaining entry in full node")
        }
    }
}

// ---------------------------------------------------------------------------
// Manual trait impls
// ---------------------------------------------------------------------------

impl<K, V> Default for EntriesUpdate<K, V> {
    fn default() -> Self {
        Self {
            insert: Vec::new(),
            erase: Vec::new(),
            change: Vec::new(),
        }
    }
}

impl<K: Copy, V: Copy> Clone for ValueChange<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            old: self.old,
            new: self.new,
        }
    }
}
