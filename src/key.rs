//! Keys and single entries.

use std::fmt;

use smallvec::SmallVec;

use crate::config::MAX_DEPTH;
use crate::identifier::Identifier;
use crate::value::{KeyPart, Value};

/// A full key: one key part per position, stored inline.
pub type RawKey<K> = SmallVec<[K; MAX_DEPTH]>;

/// A single `(key, value)` pair.
///
/// Also used as the unmanaged result of slicing into a single-entry node:
/// such entries live outside any node store.
pub struct SingleEntry<K, V> {
    /// The key; its length is the depth of the relation it belongs to.
    pub key: RawKey<K>,
    /// The value, never [`Value::ZERO`] when stored.
    pub value: V,
}

impl<K: KeyPart, V: Value> SingleEntry<K, V> {
    /// Creates an entry from a key slice.
    #[must_use]
    pub fn new(key: &[K], value: V) -> Self {
        Self {
            key: RawKey::from_slice(key),
            value,
        }
    }

    /// Number of key positions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.key.len()
    }

    /// Identifier of a node holding exactly this entry.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        Identifier::of_entry(&self.key, self.value)
    }

    /// Returns the entry with `position` removed from its key.
    #[must_use]
    pub fn without_position(&self, position: usize) -> Self {
        Self {
            key: remove_position(&self.key, position),
            value: self.value,
        }
    }
}

/// Returns `key` with the part at `position` removed.
#[must_use]
pub fn remove_position<K: Copy>(key: &[K], position: usize) -> RawKey<K> {
    let mut out = RawKey::with_capacity(key.len().saturating_sub(1));
    out.extend_from_slice(&key[..position]);
    out.extend_from_slice(&key[position + 1..]);
    out
}

/// Returns `key` with `key_part` inserted at `position`.
#[must_use]
pub fn insert_position<K: Copy>(key: &[K], position: usize, key_part: K) -> RawKey<K> {
    let mut out = RawKey::with_capacity(key.len() + 1);
    out.extend_from_slice(&key[..position]);
    out.push(key_part);
    out.extend_from_slice(&key[position..]);
    out
}

/// Formats a key as `⟨k0, k1, …⟩`.
pub struct DisplayKey<'a, K>(pub &'a [K]);

impl<K: fmt::Display> fmt::Display for DisplayKey<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("⟨")?;
        for (i, part) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str("⟩")
    }
}

// ---------------------------------------------------------------------------
// Manual trait impls
// ---------------------------------------------------------------------------

impl<K: Copy, V: Copy> Clone for SingleEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value,
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for SingleEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Debug for SingleEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", DisplayKey(&self.key), self.value)
    }
}
