//! Errors reported at the managed [`Hypertrie`](crate::Hypertrie) boundary.
//!
//! The raw [`NodeContext`](crate::NodeContext) trusts its caller and only
//! debug-asserts these conditions.

use thiserror::Error;

/// Contract violation detected by the managed API.
#[derive(Debug, Error)]
pub enum HypertrieError {
    /// Requested depth is zero or larger than [`MAX_DEPTH`](crate::MAX_DEPTH).
    #[error("depth {depth} is out of range 1..={max}")]
    DepthOutOfRange {
        /// Requested depth.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Key (or slice key) length differs from the hypertrie depth.
    #[error("key has {actual} parts, expected {expected}")]
    KeyLengthMismatch {
        /// Depth of the hypertrie.
        expected: usize,
        /// Length of the supplied key.
        actual: usize,
    },
    /// A key position is not below the hypertrie depth.
    #[error("position {position} is out of range for depth {depth}")]
    PositionOutOfRange {
        /// Offending position.
        position: usize,
        /// Depth of the hypertrie.
        depth: usize,
    },
    /// A position was given more than once.
    #[error("position {0} given more than once")]
    DuplicatePosition(usize),
    /// A diagonal needs at least one position.
    #[error("diagonal requires at least one position")]
    EmptyDiagonal,
    /// The bulk producer thread could not be spawned.
    #[error("failed to spawn bulk producer thread: {0}")]
    Spawn(#[from] std::io::Error),
}
