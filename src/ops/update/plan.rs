//! Plan compilation.
//!
//! Turns the requests of one depth into explicit operations, resolving net
//! reference count deltas against the store. A full node whose count drops
//! to zero is moved into the first node built from it instead of being
//! copied and deleted.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::identifier::Identifier;
use crate::key::SingleEntry;
use crate::store::NodeStore;
use crate::value::{KeyPart, Value};

use super::requests::{EntriesUpdate, UpdateRequests};

/// One operation on a full node.
pub enum PlannedOp<K, V> {
    /// Build `id` from `entries`.
    Create {
        /// New identifier.
        id: Identifier,
        /// Entries of the new node.
        entries: Vec<SingleEntry<K, V>>,
        /// Initial reference count.
        ref_count: usize,
    },
    /// Build `target` from a copy of `source`; `source` survives.
    CopyUpdate {
        /// Node copied from.
        source: Identifier,
        /// New identifier.
        target: Identifier,
        /// Change applied to the copy.
        update: EntriesUpdate<K, V>,
        /// Initial reference count of `target`.
        ref_count: usize,
    },
    /// Re-key `source` as `target` in place; `source` is gone afterwards.
    MoveUpdate {
        /// Node reused.
        source: Identifier,
        /// New identifier.
        target: Identifier,
        /// Change applied in place.
        update: EntriesUpdate<K, V>,
        /// Reference count of `target`.
        ref_count: usize,
    },
    /// Remove `id` and release its children.
    Delete {
        /// Node to remove.
        id: Identifier,
    },
    /// Adjust the reference count of an existing node that survives.
    RefCountDelta {
        /// Node to adjust.
        id: Identifier,
        /// Net change.
        delta: isize,
    },
}

/// Net reference count change of a single-entry node.
pub struct SenOp<K, V> {
    /// Node identifier.
    pub id: Identifier,
    /// Net change; never zero.
    pub delta: isize,
    /// Content if the node may need to be created.
    pub entry: Option<SingleEntry<K, V>>,
}

/// Compiled operations for one depth, in execution order.
pub struct UpdatePlan<K, V> {
    /// Depth the plan applies to.
    pub depth: usize,
    /// Creates, then copies, then moves, then deletes, then deltas.
    pub fn_ops: Vec<PlannedOp<K, V>>,
    /// Single-entry reference count changes.
    pub sen_ops: Vec<SenOp<K, V>>,
}

impl<K: KeyPart, V: Value> UpdatePlan<K, V> {
    /// Compiles `requests` against the current contents of `store`.
    #[must_use]
    pub fn compile(requests: UpdateRequests<K, V>, store: &NodeStore<K, V>) -> Self {
        let depth = requests.depth();
        let level = store.level(depth);
        let UpdateRequests {
            sen_changes,
            fn_updates,
            mut fn_creations,
            fn_deltas,
            deletion_candidates,
            potentially_new,
            ..
        } = requests;
        let delta_of = |id: &Identifier| fn_deltas.get(id).copied().unwrap_or(0);

        let mut to_create: FxHashSet<Identifier> = potentially_new
            .into_iter()
            .filter(|id| delta_of(id) > 0 && !level.fns.contains(*id))
            .collect();

        let mut to_delete: FxHashSet<Identifier> = FxHashSet::default();
        for id in deletion_candidates {
            let delta = delta_of(&id);
            if delta == 0 {
                continue;
            }
            let node = level.fns.lookup(id);
            let Some(node) = node else {
                unreachable!("reference released on missing full node {id:?}");
            };
            let remaining = node.ref_count.cast_signed() + delta;
            debug_assert!(remaining >= 0, "negative reference count on {id:?}");
            if remaining == 0 {
                to_delete.insert(id);
            }
        }

        let mut creates = Vec::new();
        let mut copies = Vec::new();
        let mut moves = Vec::new();
        let mut moved: FxHashSet<Identifier> = FxHashSet::default();

        for (source, targets) in fn_updates {
            for (target, update) in targets {
                if !to_create.remove(&target) {
                    continue;
                }
                let ref_count = delta_of(&target).cast_unsigned();
                if to_delete.remove(&source) {
                    moved.insert(source);
                    moves.push(PlannedOp::MoveUpdate {
                        source,
                        target,
                        update,
                        ref_count,
                    });
                } else {
                    copies.push(PlannedOp::CopyUpdate {
                        source,
                        target,
                        update,
                        ref_count,
                    });
                }
            }
        }

        for id in to_create {
            let Some(entries) = fn_creations.remove(&id) else {
                unreachable!("no content for new full node {id:?}");
            };
            creates.push(PlannedOp::Create {
                id,
                entries,
                ref_count: delta_of(&id).cast_unsigned(),
            });
        }

        let mut fn_ops = creates;
        fn_ops.append(&mut copies);
        fn_ops.append(&mut moves);
        fn_ops.extend(to_delete.iter().map(|&id| PlannedOp::Delete { id }));
        fn_ops.extend(
            fn_deltas
                .iter()
                .filter(|&(id, &delta)| {
                    delta != 0
                        && level.fns.contains(*id)
                        && !to_delete.contains(id)
                        && !moved.contains(id)
                })
                .map(|(&id, &delta)| PlannedOp::RefCountDelta { id, delta }),
        );

        let sen_ops = sen_changes
            .into_iter()
            .filter(|(_, change)| change.delta != 0)
            .map(|(id, change)| SenOp {
                id,
                delta: change.delta,
                entry: change.entry,
            })
            .collect();

        Self {
            depth,
            fn_ops,
            sen_ops,
        }
    }

    /// Counts of `(creates, copies, moves, deletes, deltas)`.
    #[must_use]
    pub fn summary(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for op in &self.fn_ops {
            match op {
                PlannedOp::Create { .. } => counts.0 += 1,
                PlannedOp::CopyUpdate { .. } => counts.1 += 1,
                PlannedOp::MoveUpdate { .. } => counts.2 += 1,
                PlannedOp::Delete { .. } => counts.3 += 1,
                PlannedOp::RefCountDelta { .. } => counts.4 += 1,
            }
        }
        counts
    }
}

impl<K, V> fmt::Debug for PlannedOp<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { id, ref_count, .. } => f
                .debug_struct("Create")
                .field("id", id)
                .field("ref_count", ref_count)
                .finish_non_exhaustive(),
            Self::CopyUpdate {
                source,
                target,
                ref_count,
                ..
            } => f
                .debug_struct("CopyUpdate")
                .field("source", source)
                .field("target", target)
                .field("ref_count", ref_count)
                .finish_non_exhaustive(),
            Self::MoveUpdate {
                source,
                target,
                ref_count,
                ..
            } => f
                .debug_struct("MoveUpdate")
                .field("source", source)
                .field("target", target)
                .field("ref_count", ref_count)
                .finish_non_exhaustive(),
            Self::Delete { id } => f.debug_struct("Delete").field("id", id).finish(),
            Self::RefCountDelta { id, delta } => f
                .debug_struct("RefCountDelta")
                .field("id", id)
                .field("delta", delta)
                .finish(),
        }
    }
}
