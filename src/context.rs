//! Raw node context: the façade over the node store.
//!
//! Callers hold [`NodeContainer`]s and pass them back for every operation.
//! Mutating operations replace the caller's container; the reference the
//! container held moves to the new root. Arguments are trusted: depth and
//! key length mismatches are only debug-asserted.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::config::MAX_DEPTH;
use crate::diagonal::Diagonal;
use crate::iter::Iter;
use crate::key::{RawKey, SingleEntry};
use crate::node::{NodeContainer, NodeRef};
use crate::ops::get::{cards, get, node_size};
use crate::ops::slice::{SliceResult, slice};
use crate::ops::update::execute;
use crate::ops::update::requests::{EntriesUpdate, UpdateRequests, ValueChange};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

/// Owns the node store of all hypertries created in it.
pub struct NodeContext<K, V> {
    store: NodeStore<K, V>,
}

// ---------------------------------------------------------------------------
// Construction & reads
// ---------------------------------------------------------------------------

impl<K: KeyPart, V: Value> NodeContext<K, V> {
    /// Creates a context with an empty store for depths up to
    /// [`MAX_DEPTH`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: NodeStore::new(MAX_DEPTH),
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &NodeStore<K, V> {
        &self.store
    }

    /// An empty container of `depth`.
    #[must_use]
    pub const fn new_empty(depth: usize) -> NodeContainer<K> {
        NodeContainer::empty(depth)
    }

    /// Value stored for `key`, or [`Value::ZERO`].
    #[must_use]
    pub fn get(&self, nodec: &NodeContainer<K>, key: &[K]) -> V {
        get(&self.store, *nodec, key)
    }

    /// Number of entries.
    #[must_use]
    pub fn size(&self, nodec: &NodeContainer<K>) -> usize {
        node_size(&self.store, nodec.depth, nodec.node)
    }

    /// Distinct key parts at each of `positions`.
    #[must_use]
    pub fn cards(&self, nodec: &NodeContainer<K>, positions: &[usize]) -> Vec<usize> {
        cards(&self.store, *nodec, positions)
    }

    /// Fixes `(position, key_part)` pairs and returns what remains.
    ///
    /// A returned [`SliceResult::Node`] is not counted; see
    /// [`inc_ref`](Self::inc_ref).
    #[must_use]
    pub fn slice(&self, nodec: &NodeContainer<K>, fixed: &[(usize, K)]) -> SliceResult<K, V> {
        slice(&self.store, *nodec, fixed)
    }

    /// Lazy iterator over all entries.
    #[must_use]
    pub fn iter(&self, nodec: &NodeContainer<K>) -> Iter<'_, K, V> {
        Iter::new(&self.store, *nodec)
    }

    /// Cursor over key parts shared by all of `positions`.
    #[must_use]
    pub fn diagonal(&self, nodec: &NodeContainer<K>, positions: &[usize]) -> Diagonal<'_, K, V> {
        Diagonal::new(&self.store, *nodec, positions)
    }
}

// ---------------------------------------------------------------------------
// Reference counting
// ---------------------------------------------------------------------------

impl<K: KeyPart, V: Value> NodeContext<K, V> {
    /// Takes one more reference on the container's node.
    pub fn inc_ref(&mut self, nodec: &NodeContainer<K>) {
        let NodeRef::Stored(id) = nodec.node else {
            return;
        };
        let level = self.store.level_mut(nodec.depth);
        if id.is_sen() {
            if let Some(node) = level.sens.lookup_mut(id) {
                node.ref_count += 1;
                return;
            }
        } else if let Some(node) = level.fns.lookup_mut(id) {
            node.ref_count += 1;
            return;
        }
        unreachable!("inc_ref on missing node {id:?}");
    }

    /// Releases one reference on the container's node.
    ///
    /// A node released for the last time is deleted together with every
    /// descendant that only it referenced.
    pub fn dec_ref(&mut self, nodec: &NodeContainer<K>) {
        let NodeRef::Stored(id) = nodec.node else {
            return;
        };
        let level = self.store.level_mut(nodec.depth);
        let remaining = if id.is_sen() {
            level.sens.lookup_mut(id).map(|node| &mut node.ref_count)
        } else {
            level.fns.lookup_mut(id).map(|node| &mut node.ref_count)
        };
        let Some(ref_count) = remaining else {
            unreachable!("dec_ref on missing node {id:?}");
        };
        if *ref_count > 1 {
            *ref_count -= 1;
            return;
        }
        tracing::trace!(depth = nodec.depth, ?id, "releasing last reference");
        let mut requests = UpdateRequests::new(nodec.depth);
        requests.apply_ref_count_delta(nodec.node, -1);
        execute(&mut self.store, requests);
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

impl<K: KeyPart, V: Value> NodeContext<K, V> {
    /// Sets `key` to `value` and returns the previous value.
    ///
    /// Setting [`Value::ZERO`] erases the key. Nothing changes if the value
    /// is already stored.
    pub fn set(&mut self, nodec: &mut NodeContainer<K>, key: &[K], value: V) -> V {
        debug_assert_eq!(key.len(), nodec.depth);
        let old = self.get(nodec, key);
        if old == value {
            return old;
        }
        tracing::trace!(depth = nodec.depth, "set");
        let key = RawKey::from_slice(key);
        let update = if old.is_zero() {
            EntriesUpdate::inserting(vec![SingleEntry { key, value }])
        } else if value.is_zero() {
            EntriesUpdate::erasing(vec![SingleEntry { key, value: old }])
        } else {
            EntriesUpdate::changing(vec![ValueChange {
                key,
                old,
                new: value,
            }])
        };
        self.run_update(nodec, update);
        old
    }

    /// Sets every key of `entries` to its value in one pass.
    ///
    /// Later duplicates of a key win. Entries already stored with the same
    /// value are skipped. Absent keys are inserted, present keys change
    /// value, and [`Value::ZERO`] erases, as with [`set`](Self::set).
    /// Returns the number of entries applied.
    pub fn bulk_insert(
        &mut self,
        nodec: &mut NodeContainer<K>,
        entries: impl IntoIterator<Item = SingleEntry<K, V>>,
    ) -> usize {
        let mut latest: FxHashMap<RawKey<K>, V> = FxHashMap::default();
        for entry in entries {
            debug_assert_eq!(entry.key.len(), nodec.depth);
            latest.insert(entry.key, entry.value);
        }

        let mut update = EntriesUpdate::default();
        for (key, value) in latest {
            let old = self.get(nodec, &key);
            if old == value {
                continue;
            }
            if old.is_zero() {
                update.insert.push(SingleEntry { key, value });
            } else if value.is_zero() {
                update.erase.push(SingleEntry { key, value: old });
            } else {
                update.change.push(ValueChange {
                    key,
                    old,
                    new: value,
                });
            }
        }
        let applied = update.len();
        tracing::trace!(
            depth = nodec.depth,
            inserts = update.insert.len(),
            erases = update.erase.len(),
            changes = update.change.len(),
            "bulk insert"
        );
        if applied > 0 {
            self.run_update(nodec, update);
        }
        applied
    }

    /// Erases `keys` in one pass. Absent keys are skipped. Returns the number
    /// of entries erased.
    pub fn bulk_erase(
        &mut self,
        nodec: &mut NodeContainer<K>,
        keys: impl IntoIterator<Item = RawKey<K>>,
    ) -> usize {
        let mut present: FxHashMap<RawKey<K>, V> = FxHashMap::default();
        for key in keys {
            debug_assert_eq!(key.len(), nodec.depth);
            let value = self.get(nodec, &key);
            if !value.is_zero() {
                present.insert(key, value);
            }
        }
        if present.is_empty() {
            return 0;
        }
        let erased: Vec<SingleEntry<K, V>> = present
            .into_iter()
            .map(|(key, value)| SingleEntry { key, value })
            .collect();
        let count = erased.len();
        tracing::trace!(depth = nodec.depth, count, "bulk erase");
        self.run_update(nodec, EntriesUpdate::erasing(erased));
        count
    }

    /// Plans and executes `update` on the container's node, moving the
    /// container's reference to the result.
    fn run_update(&mut self, nodec: &mut NodeContainer<K>, update: EntriesUpdate<K, V>) {
        let mut requests = UpdateRequests::new(nodec.depth);
        nodec.node = requests.update_node(&self.store, nodec.node, update, true);
        execute(&mut self.store, requests);
    }
}

impl<K: KeyPart, V: Value> Default for NodeContext<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for NodeContext<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("store", &self.store)
            .finish()
    }
}
