//! Plan application.
//!
//! Executes the operations of one depth against the store and collects the
//! requests they imply for the depth below.

use rustc_hash::FxHashMap;

use crate::key::{SingleEntry, remove_position};
use crate::node::{Edges, FullNode, NodeRef, SingleEntryNode};
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

use super::plan::{PlannedOp, SenOp, UpdatePlan};
use super::requests::{EntriesUpdate, UpdateRequests, ValueChange};

/// How the node being updated was obtained.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Origin {
    /// Copy of a surviving node: unchanged children gain a reference.
    Copied,
    /// The source itself: replaced children lose a reference.
    Moved,
}

impl<K: KeyPart, V: Value> UpdatePlan<K, V> {
    /// Applies the plan, returning requests for `depth - 1` if any.
    pub fn apply(self, store: &mut NodeStore<K, V>) -> Option<UpdateRequests<K, V>> {
        let depth = self.depth;
        let (creates, copies, moves, deletes, deltas) = self.summary();
        tracing::debug!(
            depth,
            creates,
            copies,
            moves,
            deletes,
            deltas,
            sens = self.sen_ops.len(),
            "applying update plan"
        );

        let mut next = (depth > 1).then(|| UpdateRequests::new(depth - 1));
        for op in self.fn_ops {
            apply_fn_op(store, depth, op, next.as_mut());
        }
        for op in self.sen_ops {
            apply_sen_op(store, depth, op);
        }
        next.filter(|requests| !requests.is_empty())
    }
}

fn apply_fn_op<K: KeyPart, V: Value>(
    store: &mut NodeStore<K, V>,
    depth: usize,
    op: PlannedOp<K, V>,
    mut next: Option<&mut UpdateRequests<K, V>>,
) {
    match op {
        PlannedOp::Create {
            id,
            entries,
            ref_count,
        } => {
            let node = build_node(depth, entries, ref_count, next);
            store.level_mut(depth).fns.insert_new(id, node);
        }
        PlannedOp::CopyUpdate {
            source,
            target,
            update,
            ref_count,
        } => {
            let mut node = store.full(depth, source).clone();
            node.ref_count = ref_count;
            rewrite_node(store, depth, &mut node, update, Origin::Copied, next);
            store.level_mut(depth).fns.insert_new(target, node);
        }
        PlannedOp::MoveUpdate {
            source,
            target,
            update,
            ref_count,
        } => {
            let Some(mut node) = store.level_mut(depth).fns.erase(source) else {
                unreachable!("moved full node {source:?} is missing");
            };
            node.ref_count = ref_count;
            rewrite_node(store, depth, &mut node, update, Origin::Moved, next);
            store.level_mut(depth).fns.insert_new(target, node);
        }
        PlannedOp::Delete { id } => {
            let Some(node) = store.level_mut(depth).fns.erase(id) else {
                unreachable!("deleted full node {id:?} is missing");
            };
            if let (Edges::Children(children), Some(next)) = (&node.edges, next.as_deref_mut()) {
                for &child in children.iter().flat_map(|edges| edges.values()) {
                    next.apply_ref_count_delta(child, -1);
                }
            }
        }
        PlannedOp::RefCountDelta { id, delta } => {
            let Some(node) = store.level_mut(depth).fns.lookup_mut(id) else {
                unreachable!("full node {id:?} is missing");
            };
            node.ref_count = node
                .ref_count
                .checked_add_signed(delta)
                .unwrap_or_else(|| panic!("negative reference count on {id:?}"));
            debug_assert!(node.ref_count > 0);
        }
    }
}

fn apply_sen_op<K: KeyPart, V: Value>(store: &mut NodeStore<K, V>, depth: usize, op: SenOp<K, V>) {
    let sens = &mut store.level_mut(depth).sens;
    if let Some(node) = sens.lookup_mut(op.id) {
        node.ref_count = node
            .ref_count
            .checked_add_signed(op.delta)
            .unwrap_or_else(|| panic!("negative reference count on {:?}", op.id));
        if node.ref_count == 0 {
            sens.erase(op.id);
        }
        return;
    }
    debug_assert!(op.delta > 0, "negative delta on missing single-entry node");
    let Some(entry) = op.entry else {
        unreachable!("new single-entry node {:?} without content", op.id);
    };
    sens.insert_new(op.id, SingleEntryNode::new(entry, op.delta.cast_unsigned()));
}

// ---------------------------------------------------------------------------
// Building and updating full nodes
// ---------------------------------------------------------------------------

/// Groups `entries` by their key part at `pos`, dropping that position.
fn subsets_for_pos<K: KeyPart, V: Value>(
    entries: &[SingleEntry<K, V>],
    pos: usize,
) -> FxHashMap<K, Vec<SingleEntry<K, V>>> {
    let mut subsets: FxHashMap<K, Vec<SingleEntry<K, V>>> = FxHashMap::default();
    for entry in entries {
        subsets
            .entry(entry.key[pos])
            .or_default()
            .push(entry.without_position(pos));
    }
    subsets
}

/// Groups every part of `update` by its key part at `pos`, dropping that
/// position.
fn update_subsets_for_pos<K: KeyPart, V: Value>(
    update: &EntriesUpdate<K, V>,
    pos: usize,
) -> FxHashMap<K, EntriesUpdate<K, V>> {
    let mut subsets: FxHashMap<K, EntriesUpdate<K, V>> = FxHashMap::default();
    for entry in &update.insert {
        subsets
            .entry(entry.key[pos])
            .or_default()
            .insert
            .push(entry.without_position(pos));
    }
    for entry in &update.erase {
        subsets
            .entry(entry.key[pos])
            .or_default()
            .erase
            .push(entry.without_position(pos));
    }
    for change in &update.change {
        subsets
            .entry(change.key[pos])
            .or_default()
            .change
            .push(ValueChange {
                key: remove_position(&change.key, pos),
                old: change.old,
                new: change.new,
            });
    }
    subsets
}

fn build_node<K: KeyPart, V: Value>(
    depth: usize,
    entries: Vec<SingleEntry<K, V>>,
    ref_count: usize,
    next: Option<&mut UpdateRequests<K, V>>,
) -> FullNode<K, V> {
    let mut node = FullNode::new(depth, ref_count);
    node.size = entries.len();
    match (&mut node.edges, next) {
        (Edges::Values(values), _) => {
            values.extend(entries.iter().map(|e| (e.key[0], e.value)));
        }
        (Edges::Children(children), Some(next)) => {
            for (pos, edges) in children.iter_mut().enumerate() {
                for (kp, subset) in subsets_for_pos(&entries, pos) {
                    edges.insert(kp, next.add_node(subset));
                }
            }
        }
        (Edges::Children(_), None) => unreachable!("no requests below depth {depth}"),
    }
    node
}

fn rewrite_node<K: KeyPart, V: Value>(
    store: &NodeStore<K, V>,
    depth: usize,
    node: &mut FullNode<K, V>,
    update: EntriesUpdate<K, V>,
    origin: Origin,
    next: Option<&mut UpdateRequests<K, V>>,
) {
    let moved = origin == Origin::Moved;
    node.size = update.size_after(node.size);
    match (&mut node.edges, next) {
        (Edges::Values(values), _) => {
            for entry in &update.erase {
                values.remove(&entry.key[0]);
            }
            values.extend(update.insert.iter().map(|e| (e.key[0], e.value)));
            values.extend(update.change.iter().map(|c| (c.key[0], c.new)));
        }
        (Edges::Children(children), Some(next)) => {
            for (pos, edges) in children.iter_mut().enumerate() {
                let mut subsets = update_subsets_for_pos(&update, pos);
                if origin == Origin::Copied {
                    keep_untouched(edges, |kp| subsets.contains_key(kp), next);
                }
                for (kp, subset) in subsets.drain() {
                    let child = match edges.get(&kp) {
                        Some(&child) => next.update_node(store, child, subset, moved),
                        None => {
                            debug_assert!(subset.erase.is_empty() && subset.change.is_empty());
                            next.add_node(subset.insert)
                        }
                    };
                    match child {
                        NodeRef::Empty => {
                            edges.remove(&kp);
                        }
                        child => {
                            edges.insert(kp, child);
                        }
                    }
                }
            }
        }
        (Edges::Children(_), None) => unreachable!("no requests below depth {depth}"),
    }
}

/// A copied node references every child it does not replace once more.
fn keep_untouched<K: KeyPart, V: Value>(
    edges: &FxHashMap<K, NodeRef<K>>,
    touched: impl Fn(&K) -> bool,
    next: &mut UpdateRequests<K, V>,
) {
    for (kp, &child) in edges {
        if !touched(kp) {
            next.apply_ref_count_delta(child, 1);
        }
    }
}
