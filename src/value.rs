//! Value and key-part traits.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Computes the 64-bit hash of a value using the standard hasher.
#[must_use]
pub fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A key part: one coordinate of a hypertrie key.
pub trait KeyPart: Copy + Eq + Hash + fmt::Debug + fmt::Display + 'static {}

impl<T: Copy + Eq + Hash + fmt::Debug + fmt::Display + 'static> KeyPart for T {}

/// A value stored in a hypertrie.
///
/// [`ZERO`](Self::ZERO) marks absence: it is never stored, and setting a key
/// to it erases the key.
pub trait Value: Copy + PartialEq + fmt::Debug + fmt::Display + 'static {
    /// The absent value.
    const ZERO: Self;
    /// The unit value; the only non-zero value of a boolean relation.
    const ONE: Self;
    /// `true` for boolean relations. Enables inlined depth-1 single entries.
    const IS_BOOL: bool = false;

    /// Hash contribution of this value to node identifiers.
    fn value_hash(&self) -> u64;

    /// Returns `true` if `self` equals [`ZERO`](Self::ZERO).
    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Value for bool {
    const ZERO: Self = false;
    const ONE: Self = true;
    const IS_BOOL: bool = true;

    fn value_hash(&self) -> u64 {
        hash_one(self)
    }
}

macro_rules! integer_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl Value for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;

                fn value_hash(&self) -> u64 {
                    hash_one(self)
                }
            }
        )*
    };
}

integer_value!(u32, u64, usize, i32, i64);

impl Value for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    // -0.0 compares equal to 0.0 and is treated as absent, so only the bit
    // pattern of non-zero values matters here.
    fn value_hash(&self) -> u64 {
        hash_one(&self.to_bits())
    }
}
