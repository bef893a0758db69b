//! Errors returned by resize requests.

use thiserror::Error;

/// Reasons a resize request is refused.
///
/// All variants are recoverable: the map is left exactly as it was.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeError {
    /// A migration is already running; retry once `is_rehashing()` is false.
    #[error("a rehash is already in progress")]
    AlreadyRehashing,

    /// The target cannot hold the entries currently in the map.
    #[error("requested size {requested} is smaller than the {len} live entries")]
    SizeTooSmall { requested: usize, len: usize },

    /// No power-of-two capacity covers the target within the address space,
    /// or the allocator refused the bucket array.
    #[error("requested size {requested} exceeds the largest power-of-two capacity")]
    CapacityOverflow { requested: usize },
}
