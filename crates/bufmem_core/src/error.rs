//! # Arena Error Types
//!
//! All errors that can occur while carving up an arena.

use thiserror::Error;

/// Errors returned by [`Arena`](crate::Arena) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// No free block can hold the request.
    #[error("out of space: no free block fits {size} bytes at alignment {alignment}")]
    OutOfSpace {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },

    /// Explicit placement does not lie inside a single free block.
    #[error("invalid placement: [{offset}, {offset}+{size}) is not inside one free block")]
    InvalidPlacement {
        /// Requested offset.
        offset: usize,
        /// Requested size in bytes.
        size: usize,
    },

    /// No allocated block starts at this offset (double free or corrupted handle).
    #[error("invalid free: no allocated block starts at offset {offset}")]
    InvalidFree {
        /// Offset passed to free.
        offset: usize,
    },

    /// Zero-byte allocations are not representable.
    #[error("zero-size allocation requested")]
    ZeroSize,

    /// Alignment must be at least one byte.
    #[error("alignment must be non-zero")]
    InvalidAlignment,
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// The first broken invariant found by [`Arena::validate`](crate::Arena::validate).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A block record has zero size.
    #[error("block {index} is empty")]
    EmptyBlock {
        /// Index of the block.
        index: usize,
    },

    /// A block does not start where the previous one ended.
    #[error("block {index} starts at {offset}, expected {expected}")]
    Gap {
        /// Index of the block.
        index: usize,
        /// Actual start offset.
        offset: usize,
        /// End of the previous block.
        expected: usize,
    },

    /// Two neighbouring blocks are both free.
    #[error("block {index} and its successor are both free")]
    Uncoalesced {
        /// Index of the first free block.
        index: usize,
    },

    /// The blocks do not add up to the capacity.
    #[error("blocks cover {covered} bytes, capacity is {capacity}")]
    Coverage {
        /// Bytes covered by blocks.
        covered: usize,
        /// Arena capacity.
        capacity: usize,
    },
}
