//! # BUFMEM Core
//!
//! Sub-allocator over a single fixed-size contiguous region, used to carve
//! vertex, index and uniform data out of one large backing allocation.
//!
//! ## Architecture Rules
//!
//! 1. **Offsets only** - The arena never touches the memory it manages
//! 2. **First-fit by address** - Free blocks are scanned in ascending order
//! 3. **Exhaustion is a value** - `OutOfSpace` is returned, never raised
//! 4. **Bad frees are fatal** - A free that matches no allocation panics
//!
//! ## Example
//!
//! ```rust
//! use bufmem_core::{Arena, ArenaError};
//!
//! let mut arena = Arena::new(128);
//! let vertices = arena.allocate(96, 16)?;
//! let indices = arena.allocate(32, 4)?;
//! assert!(arena.allocate(1, 1).is_err());
//!
//! arena.free(vertices);
//! arena.free(indices);
//! assert_eq!(arena.num_blocks(), 1);
//! # Ok::<(), ArenaError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod memory;

pub use error::{ArenaError, ArenaResult, InvariantViolation};
pub use memory::{Arena, Block};
