//! # Memory Management
//!
//! Offset bookkeeping for one fixed-size region.
//!
//! ## Design Philosophy
//!
//! The region is allocated once by the owner. Afterwards:
//! - Allocations are offsets, never new backing memory
//! - Freed ranges are merged with free neighbours immediately
//! - Nothing is ever moved

mod arena;
mod block;

pub use arena::Arena;
pub use block::Block;
