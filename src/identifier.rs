//! Node identifiers: incremental structural hashing.
//!
//! An identifier is the XOR of per-entry hashes over a node's entries, with
//! the top bit reserved as a tag: set for single-entry nodes, clear for full
//! nodes. XOR is commutative and self-inverse, so inserting, erasing, or
//! changing the value of an entry updates the identifier without rehashing
//! the rest of the node.
//!
//! There is no collision detection. Two different entry sets with equal
//! identifiers are treated as the same node.

use std::fmt;

use crate::value::{KeyPart, Value, hash_one};

/// Mixing seed (golden ratio constant).
const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Tag bit marking a single-entry node.
const SEN_TAG: u64 = 1 << 63;

/// Finalizes the joint hash of one entry into its contribution.
///
/// Key and value are hashed together before this call, so the XOR over a
/// node's entries cannot be split into a key sum and a value sum: permuting
/// values among keys changes the identifier.
#[must_use]
pub const fn entry_hash(joint_hash: u64) -> u64 {
    let mut h = joint_hash ^ SEED;
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (h ^ (h >> 31)) & !SEN_TAG
}

fn raw<K: KeyPart, V: Value>(key: &[K], value: V) -> u64 {
    entry_hash(hash_one(&(key, value.value_hash())))
}

/// Content hash of a node plus a single-entry/full tag. Zero is empty.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(u64);

impl Identifier {
    /// The identifier of the empty node.
    pub const EMPTY: Self = Self(0);

    /// Identifier of a node holding exactly one entry.
    #[must_use]
    pub fn of_entry<K: KeyPart, V: Value>(key: &[K], value: V) -> Self {
        Self(raw(key, value) | SEN_TAG)
    }

    /// Identifier of a node holding exactly `entries`.
    ///
    /// Tagged single-entry if there is exactly one entry.
    #[must_use]
    pub fn of_entries<'a, K, V, I>(entries: I) -> Self
    where
        K: KeyPart,
        V: Value,
        I: IntoIterator<Item = (&'a [K], V)>,
    {
        let mut hash = 0;
        let mut count = 0usize;
        for (key, value) in entries {
            hash ^= raw(key, value);
            count += 1;
        }
        match count {
            0 => Self::EMPTY,
            1 => Self(hash | SEN_TAG),
            _ => Self(hash),
        }
    }

    /// Identifier of the union of two disjoint entry sets.
    ///
    /// Combining a set with itself yields [`EMPTY`](Self::EMPTY). The result
    /// is tagged full; callers re-tag when they know a single entry remains.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self((self.0 ^ other.0) & !SEN_TAG)
    }

    /// Identifier after adding one entry.
    #[must_use]
    pub fn add_entry<K: KeyPart, V: Value>(self, key: &[K], value: V) -> Self {
        if self.is_empty() {
            return Self::of_entry(key, value);
        }
        Self((self.0 ^ raw(key, value)) & !SEN_TAG)
    }

    /// Identifier after removing one entry, leaving `remaining` entries.
    #[must_use]
    pub fn remove_entry<K: KeyPart, V: Value>(self, key: &[K], value: V, remaining: usize) -> Self {
        let hash = (self.0 ^ raw(key, value)) & !SEN_TAG;
        match remaining {
            0 => Self::EMPTY,
            1 => Self(hash | SEN_TAG),
            _ => Self(hash),
        }
    }

    /// Identifier after replacing the value of an existing entry.
    #[must_use]
    pub fn change_value<K: KeyPart, V: Value>(self, key: &[K], old: V, new: V) -> Self {
        let hash = (self.0 ^ raw(key, old) ^ raw(key, new)) & !SEN_TAG;
        Self(hash | (self.0 & SEN_TAG))
    }

    /// The same content hash tagged as a single-entry node.
    #[must_use]
    pub const fn as_single_entry(self) -> Self {
        Self(self.0 | SEN_TAG)
    }

    /// Returns `true` for the empty identifier.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this identifies a single-entry node.
    #[must_use]
    pub const fn is_sen(self) -> bool {
        self.0 & SEN_TAG != 0
    }

    /// Returns `true` if this identifies a full node.
    #[must_use]
    pub const fn is_fn(self) -> bool {
        !self.is_empty() && !self.is_sen()
    }

    /// The raw 64-bit value, including the tag bit.
    #[must_use]
    pub const fn hash(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_empty() {
            "empty"
        } else if self.is_sen() {
            "sen"
        } else {
            "fn"
        };
        write!(f, "{kind}:{:#018x}", self.0)
    }
}
