//! Compile-time limits and boundary checks.

use crate::error::HypertrieError;

/// Maximum number of key positions a hypertrie may have.
///
/// Keys are stored inline in fixed-capacity buffers of this size.
pub const MAX_DEPTH: usize = 5;

/// Checks that `depth` is within `1..=MAX_DEPTH`.
///
/// # Errors
///
/// Returns [`HypertrieError::DepthOutOfRange`] otherwise.
pub const fn check_depth(depth: usize) -> Result<(), HypertrieError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(HypertrieError::DepthOutOfRange {
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

/// Checks that a key or slice key has exactly `depth` parts.
///
/// # Errors
///
/// Returns [`HypertrieError::KeyLengthMismatch`] otherwise.
pub const fn check_key_len(depth: usize, actual: usize) -> Result<(), HypertrieError> {
    if depth != actual {
        return Err(HypertrieError::KeyLengthMismatch {
            expected: depth,
            actual,
        });
    }
    Ok(())
}

/// Checks that `positions` are distinct and each lies in `0..depth`.
///
/// # Errors
///
/// Returns [`HypertrieError::PositionOutOfRange`] or
/// [`HypertrieError::DuplicatePosition`].
pub fn check_positions(depth: usize, positions: &[usize]) -> Result<(), HypertrieError> {
    let mut seen = 0u32;
    for &position in positions {
        if position >= depth {
            return Err(HypertrieError::PositionOutOfRange { position, depth });
        }
        let bit = 1u32 << position;
        if seen & bit != 0 {
            return Err(HypertrieError::DuplicatePosition(position));
        }
        seen |= bit;
    }
    Ok(())
}
