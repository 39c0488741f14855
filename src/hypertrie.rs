//! Managed hypertries.
//!
//! A [`Hypertrie`] owns one reference on its root node in a shared
//! [`HypertrieContext`]. Cloning takes another reference, dropping releases
//! it. Arguments are validated here; the raw [`NodeContext`] below trusts
//! its caller.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::vec;

use smallvec::SmallVec;

use crate::config::{self, MAX_DEPTH};
use crate::context::NodeContext;
use crate::diagonal::{self, entry_candidate};
use crate::error::HypertrieError;
use crate::identifier::Identifier;
use crate::iter::Iter;
use crate::key::{DisplayKey, RawKey, SingleEntry};
use crate::node::{NodeContainer, NodeRef};
use crate::ops::slice::{SliceResult, slice_entry};
use crate::value::{KeyPart, Value};

// ---------------------------------------------------------------------------
// Context handle
// ---------------------------------------------------------------------------

/// Shared handle to a [`NodeContext`].
///
/// Hypertries created in the same context share equal sub-relations
/// physically. Single-threaded.
pub struct HypertrieContext<K, V> {
    inner: Rc<RefCell<NodeContext<K, V>>>,
}

impl<K: KeyPart, V: Value> HypertrieContext<K, V> {
    /// Creates a context with an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeContext::new())),
        }
    }

    /// Number of nodes currently stored.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().store().len()
    }

    /// Borrows the raw context for inspection.
    ///
    /// # Panics
    ///
    /// Panics if the context is being mutated.
    #[must_use]
    pub fn raw(&self) -> Ref<'_, NodeContext<K, V>> {
        self.inner.borrow()
    }

    /// Returns `true` if both handles refer to the same context.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K: KeyPart, V: Value> Default for HypertrieContext<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for HypertrieContext<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for HypertrieContext<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HypertrieContext").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Hypertrie
// ---------------------------------------------------------------------------

enum Root<K, V> {
    /// Root node in the context store; holds one reference.
    Managed(NodeContainer<K>),
    /// Entry cut out by a slice; stored on first mutation.
    Detached(SingleEntry<K, V>),
}

/// Result of [`Hypertrie::slice`].
#[derive(Debug)]
pub enum SliceOutcome<K: KeyPart, V: Value> {
    /// Every position was fixed.
    Value(V),
    /// The sub-relation over the remaining positions.
    Hypertrie(Hypertrie<K, V>),
}

impl<K: KeyPart, V: Value> SliceOutcome<K, V> {
    /// Returns `true` for a zero value or an empty hypertrie.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Value(value) => value.is_zero(),
            Self::Hypertrie(trie) => trie.is_empty(),
        }
    }

    /// The value, if every position was fixed.
    #[must_use]
    pub const fn value(&self) -> Option<V> {
        match self {
            Self::Value(value) => Some(*value),
            Self::Hypertrie(_) => None,
        }
    }

    /// The sub-relation, if some position was left free.
    #[must_use]
    pub fn into_hypertrie(self) -> Option<Hypertrie<K, V>> {
        match self {
            Self::Value(_) => None,
            Self::Hypertrie(trie) => Some(trie),
        }
    }
}

/// Persistent sparse relation of fixed depth mapping keys to values.
pub struct Hypertrie<K: KeyPart, V: Value> {
    context: HypertrieContext<K, V>,
    root: Root<K, V>,
}

impl<K: KeyPart, V: Value> Hypertrie<K, V> {
    /// Creates an empty hypertrie of `depth` in `context`.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::DepthOutOfRange`] unless `1 <= depth <= MAX_DEPTH`.
    pub fn new(depth: usize, context: &HypertrieContext<K, V>) -> Result<Self, HypertrieError> {
        config::check_depth(depth)?;
        Ok(Self {
            context: context.clone(),
            root: Root::Managed(NodeContext::<K, V>::new_empty(depth)),
        })
    }

    /// Number of key positions.
    #[must_use]
    pub fn depth(&self) -> usize {
        match &self.root {
            Root::Managed(nodec) => nodec.depth,
            Root::Detached(entry) => entry.depth(),
        }
    }

    /// The context this hypertrie lives in.
    #[must_use]
    pub const fn context(&self) -> &HypertrieContext<K, V> {
        &self.context
    }

    /// Returns `false` for a slice result not yet stored in the context.
    #[must_use]
    pub const fn is_managed(&self) -> bool {
        matches!(self.root, Root::Managed(_))
    }

    /// The root container, if managed.
    #[must_use]
    pub const fn node_container(&self) -> Option<NodeContainer<K>> {
        match &self.root {
            Root::Managed(nodec) => Some(*nodec),
            Root::Detached(_) => None,
        }
    }

    /// Content identifier of the root.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        match &self.root {
            Root::Managed(nodec) => nodec.identifier(),
            Root::Detached(entry) => entry.identifier(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.root {
            Root::Managed(nodec) => self.context.inner.borrow().size(nodec),
            Root::Detached(_) => 1,
        }
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        match &self.root {
            Root::Managed(nodec) => nodec.is_empty(),
            Root::Detached(_) => false,
        }
    }

    /// Value stored for `key`, or [`Value::ZERO`].
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if `key.len() != depth`.
    pub fn get(&self, key: &[K]) -> Result<V, HypertrieError> {
        config::check_key_len(self.depth(), key.len())?;
        Ok(self.get_unchecked(key))
    }

    /// Returns `true` if `key` has a non-zero value.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if `key.len() != depth`.
    pub fn contains(&self, key: &[K]) -> Result<bool, HypertrieError> {
        Ok(!self.get(key)?.is_zero())
    }

    pub(crate) fn get_unchecked(&self, key: &[K]) -> V {
        match &self.root {
            Root::Managed(nodec) => self.context.inner.borrow().get(nodec, key),
            Root::Detached(entry) => {
                if entry.key.as_slice() == key {
                    entry.value
                } else {
                    V::ZERO
                }
            }
        }
    }

    /// Sets `key` to `value`, returning the previous value. Setting
    /// [`Value::ZERO`] erases.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if `key.len() != depth`.
    pub fn set(&mut self, key: &[K], value: V) -> Result<V, HypertrieError> {
        config::check_key_len(self.depth(), key.len())?;
        let (context, nodec) = self.managed_parts();
        Ok(context.inner.borrow_mut().set(nodec, key, value))
    }

    /// Sets all `(key, value)` pairs in one pass. Returns the number of
    /// entries changed.
    ///
    /// Later duplicates of a key win; [`Value::ZERO`] erases, as with
    /// [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if any key has the wrong length;
    /// nothing is inserted then.
    pub fn insert_all<I, Q>(&mut self, entries: I) -> Result<usize, HypertrieError>
    where
        I: IntoIterator<Item = (Q, V)>,
        Q: AsRef<[K]>,
    {
        let depth = self.depth();
        let entries = entries
            .into_iter()
            .map(|(key, value)| {
                let key = key.as_ref();
                config::check_key_len(depth, key.len())?;
                Ok(SingleEntry::new(key, value))
            })
            .collect::<Result<Vec<_>, HypertrieError>>()?;
        Ok(self.insert_unchecked(entries))
    }

    /// Erases all `keys` in one pass. Returns the number of entries erased.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if any key has the wrong length;
    /// nothing is erased then.
    pub fn erase_all<I, Q>(&mut self, keys: I) -> Result<usize, HypertrieError>
    where
        I: IntoIterator<Item = Q>,
        Q: AsRef<[K]>,
    {
        let depth = self.depth();
        let keys = keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref();
                config::check_key_len(depth, key.len())?;
                Ok(RawKey::from_slice(key))
            })
            .collect::<Result<Vec<_>, HypertrieError>>()?;
        Ok(self.erase_unchecked(keys))
    }

    pub(crate) fn insert_unchecked(&mut self, entries: Vec<SingleEntry<K, V>>) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let (context, nodec) = self.managed_parts();
        context.inner.borrow_mut().bulk_insert(nodec, entries)
    }

    pub(crate) fn erase_unchecked(&mut self, keys: Vec<RawKey<K>>) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let (context, nodec) = self.managed_parts();
        context.inner.borrow_mut().bulk_erase(nodec, keys)
    }

    /// Stores a detached root in the context, then splits `self` into the
    /// context and the root container.
    fn managed_parts(&mut self) -> (&HypertrieContext<K, V>, &mut NodeContainer<K>) {
        if let Root::Detached(entry) = &self.root {
            let entry = entry.clone();
            let mut nodec = NodeContext::<K, V>::new_empty(entry.depth());
            self.context
                .inner
                .borrow_mut()
                .bulk_insert(&mut nodec, [entry]);
            self.root = Root::Managed(nodec);
        }
        match &mut self.root {
            Root::Managed(nodec) => (&self.context, nodec),
            Root::Detached(_) => unreachable!("root was just adopted"),
        }
    }

    /// Fixes the positions that are `Some` in `slice_key`.
    ///
    /// Fixing no position returns a clone; fixing all returns a value.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::KeyLengthMismatch`] if `slice_key.len() != depth`.
    pub fn slice(&self, slice_key: &[Option<K>]) -> Result<SliceOutcome<K, V>, HypertrieError> {
        config::check_key_len(self.depth(), slice_key.len())?;
        let fixed: SmallVec<[(usize, K); MAX_DEPTH]> = slice_key
            .iter()
            .enumerate()
            .filter_map(|(pos, kp)| kp.map(|kp| (pos, kp)))
            .collect();
        Ok(self.slice_fixed(&fixed))
    }

    pub(crate) fn slice_fixed(&self, fixed: &[(usize, K)]) -> SliceOutcome<K, V> {
        if fixed.is_empty() {
            return SliceOutcome::Hypertrie(self.clone());
        }
        let result = match &self.root {
            Root::Managed(nodec) => self.context.inner.borrow().slice(nodec, fixed),
            Root::Detached(entry) => slice_entry(&entry.key, entry.value, fixed),
        };
        match result {
            SliceResult::Value(value) => SliceOutcome::Value(value),
            SliceResult::Node(nodec) => {
                self.context.inner.borrow_mut().inc_ref(&nodec);
                SliceOutcome::Hypertrie(Self {
                    context: self.context.clone(),
                    root: Root::Managed(nodec),
                })
            }
            SliceResult::Entry(entry) => SliceOutcome::Hypertrie(Self {
                context: self.context.clone(),
                root: Root::Detached(entry),
            }),
        }
    }

    /// Runs `f` over a lazy iterator of all entries, in unspecified order.
    ///
    /// Entries are produced straight from the store without collecting
    /// them. The context stays borrowed while `f` runs.
    ///
    /// # Panics
    ///
    /// Panics if `f` changes contents or reference counts in the same
    /// context.
    pub fn with_iter<R>(&self, f: impl for<'s> FnOnce(Iter<'s, K, V>) -> R) -> R {
        let ctx = self.context.inner.borrow();
        let iter = match &self.root {
            Root::Managed(nodec) => ctx.iter(nodec),
            Root::Detached(entry) => Iter::single(ctx.store(), entry.clone()),
        };
        f(iter)
    }

    /// All entries, in unspecified order.
    #[must_use]
    pub fn entries(&self) -> Vec<SingleEntry<K, V>> {
        self.with_iter(|iter| iter.collect())
    }

    /// Iterator over a snapshot of all entries.
    ///
    /// The entries are collected up front, so the context is free again
    /// when this returns and later updates do not affect the iterator. Use
    /// [`with_iter`](Self::with_iter) to iterate without collecting.
    #[must_use]
    pub fn iter(&self) -> vec::IntoIter<SingleEntry<K, V>> {
        self.entries().into_iter()
    }

    /// Distinct key parts at each of `positions`.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::PositionOutOfRange`] or
    /// [`HypertrieError::DuplicatePosition`].
    pub fn get_cards(&self, positions: &[usize]) -> Result<Vec<usize>, HypertrieError> {
        config::check_positions(self.depth(), positions)?;
        Ok(match &self.root {
            Root::Managed(nodec) => self.context.inner.borrow().cards(nodec, positions),
            Root::Detached(_) => vec![1; positions.len()],
        })
    }

    /// Cursor over key parts shared by all of `positions`.
    ///
    /// # Errors
    ///
    /// [`HypertrieError::EmptyDiagonal`] for no positions, otherwise as
    /// [`get_cards`](Self::get_cards).
    pub fn diagonal(&self, positions: &[usize]) -> Result<HashDiagonal<K, V>, HypertrieError> {
        if positions.is_empty() {
            return Err(HypertrieError::EmptyDiagonal);
        }
        config::check_positions(self.depth(), positions)?;
        let candidates = match &self.root {
            Root::Managed(nodec) => {
                let ctx = self.context.inner.borrow();
                diagonal::candidates(ctx.store(), *nodec, positions)
            }
            Root::Detached(entry) => entry_candidate(&entry.key, positions).into_iter().collect(),
        };
        Ok(HashDiagonal {
            trie: self.clone(),
            positions: SmallVec::from_slice(positions),
            candidates,
            cursor: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Diagonal over a managed hypertrie
// ---------------------------------------------------------------------------

/// Restartable cursor over the diagonal of a [`Hypertrie`].
///
/// Keeps the hypertrie alive while it exists.
pub struct HashDiagonal<K: KeyPart, V: Value> {
    trie: Hypertrie<K, V>,
    positions: SmallVec<[usize; MAX_DEPTH]>,
    candidates: Vec<K>,
    cursor: usize,
}

impl<K: KeyPart, V: Value> HashDiagonal<K, V> {
    /// Slice at `key_part`, or `None` if it is not on the diagonal.
    #[must_use]
    pub fn find(&self, key_part: K) -> Option<SliceOutcome<K, V>> {
        let fixed: SmallVec<[(usize, K); MAX_DEPTH]> =
            self.positions.iter().map(|&pos| (pos, key_part)).collect();
        let outcome = self.trie.slice_fixed(&fixed);
        (!outcome.is_empty()).then_some(outcome)
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

impl<K: KeyPart, V: Value> Iterator for HashDiagonal<K, V> {
    type Item = (K, SliceOutcome<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&key_part) = self.candidates.get(self.cursor) {
            self.cursor += 1;
            if let Some(outcome) = HashDiagonal::find(self, key_part) {
                return Some((key_part, outcome));
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K: KeyPart, V: Value> Clone for Hypertrie<K, V> {
    fn clone(&self) -> Self {
        let root = match &self.root {
            Root::Managed(nodec) => {
                self.context.inner.borrow_mut().inc_ref(nodec);
                Root::Managed(*nodec)
            }
            Root::Detached(entry) => Root::Detached(entry.clone()),
        };
        Self {
            context: self.context.clone(),
            root,
        }
    }
}

impl<K: KeyPart, V: Value> Drop for Hypertrie<K, V> {
    /// Releases the root reference.
    ///
    /// # Panics
    ///
    /// Panics if a stored root must be released while the context is
    /// borrowed, unless the thread is already unwinding; the reference is
    /// then leaked.
    fn drop(&mut self) {
        let Root::Managed(nodec) = &self.root else {
            return;
        };
        if !matches!(nodec.node, NodeRef::Stored(_)) {
            return;
        }
        match self.context.inner.try_borrow_mut() {
            Ok(mut ctx) => ctx.dec_ref(nodec),
            Err(_) if thread::panicking() => {}
            Err(_) => panic!("hypertrie dropped while its context is borrowed"),
        }
    }
}

impl<K: KeyPart, V: Value> PartialEq for Hypertrie<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.depth() == other.depth() && self.identifier() == other.identifier()
    }
}

impl<K: KeyPart, V: Value> Eq for Hypertrie<K, V> {}

impl<K: KeyPart, V: Value> fmt::Debug for Hypertrie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hypertrie")
            .field("depth", &self.depth())
            .field("size", &self.size())
            .field("identifier", &self.identifier())
            .field("managed", &self.is_managed())
            .finish_non_exhaustive()
    }
}

impl<K: KeyPart, V: Value> fmt::Display for Hypertrie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{depth: {}, size: {}, entries: [", self.depth(), self.size())?;
        self.with_iter(|iter| {
            for (i, entry) in iter.enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} → {}", DisplayKey(&entry.key), entry.value)?;
            }
            Ok(())
        })?;
        f.write_str("]}")
    }
}

impl<K: KeyPart, V: Value> IntoIterator for &Hypertrie<K, V> {
    type Item = SingleEntry<K, V>;
    type IntoIter = vec::IntoIter<SingleEntry<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
