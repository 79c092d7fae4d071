//! # Arena Allocator
//!
//! A first-fit sub-allocator over one fixed-size range. Hands out offsets,
//! never memory: the caller owns the backing allocation.
//!
//! ## Layout
//!
//! ```text
//!  0                                                         capacity
//!  ├──────────┬──────┬──────────────┬──────────┬──────────────────┤
//!  │ ALLOC 32 │ FREE │   ALLOC 64   │   FREE   │     ALLOC 96     │
//!  └──────────┴──────┴──────────────┴──────────┴──────────────────┘
//!      blocks[0] [1]        [2]          [3]           [4]
//! ```
//!
//! Blocks are stored in a `Vec` sorted by offset. Neighbours in the vector
//! are neighbours in address space, so coalescing on free only ever looks
//! at `index - 1` and `index + 1`.
//!
//! ## Limitations
//!
//! Allocated blocks are never moved. Under heavy fragmentation a request can
//! fail even though enough total bytes are free; callers over-provision or
//! allocate a second region.

use super::block::Block;
use crate::error::{ArenaError, ArenaResult, InvariantViolation};

/// A fixed-capacity range partitioned into free and allocated blocks.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Wrap it in a mutex or give it to a single
/// owner thread.
///
/// # Example
///
/// ```rust
/// use bufmem_core::Arena;
///
/// let mut arena = Arena::new(128);
/// let a = arena.allocate(32, 1).unwrap();
/// let b = arena.allocate(32, 1).unwrap();
/// assert_eq!((a, b), (0, 32));
///
/// arena.free(a);
/// arena.free(b);
/// assert_eq!(arena.num_blocks(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Arena {
    /// Blocks sorted by offset, covering `[0, capacity)` exactly once.
    blocks: Vec<Block>,
    /// Total size of the managed range.
    capacity: usize,
    /// Bytes currently handed out.
    used: usize,
}

impl Arena {
    /// Creates an arena managing `[0, capacity)` as one free block.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut arena = Self {
            blocks: Vec::new(),
            capacity: 0,
            used: 0,
        };
        arena.reset(capacity);
        arena
    }

    /// Discards every block and starts over with one free block of `capacity` bytes.
    ///
    /// Outstanding offsets become meaningless.
    pub fn reset(&mut self, capacity: usize) {
        self.blocks.clear();
        if capacity > 0 {
            self.blocks.push(Block::free(0, capacity));
        }
        self.capacity = capacity;
        self.used = 0;
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes currently allocated.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Returns the number of free bytes, fragmented or not.
    #[inline]
    #[must_use]
    pub const fn free_bytes(&self) -> usize {
        self.capacity - self.used
    }

    /// Returns true if nothing is allocated.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns the number of block records, free and allocated.
    #[inline]
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Iterates over the blocks in address order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }

    /// Size of the largest free block, or 0 if the arena is full.
    #[must_use]
    pub fn largest_free_block(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| block.is_free())
            .map(|block| block.size)
            .max()
            .unwrap_or(0)
    }

    /// Allocates `size` bytes at an offset that is a multiple of `alignment`.
    ///
    /// Free blocks are scanned in address order and the first one that fits
    /// wins. Padding skipped for alignment stays behind as its own free block.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::ZeroSize`] if `size` is zero.
    /// - [`ArenaError::InvalidAlignment`] if `alignment` is zero.
    /// - [`ArenaError::OutOfSpace`] if no free block fits the request.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> ArenaResult<usize> {
        if size == 0 {
            return Err(ArenaError::ZeroSize);
        }
        if alignment == 0 {
            return Err(ArenaError::InvalidAlignment);
        }

        let found = self.blocks.iter().enumerate().find_map(|(index, block)| {
            if block.allocated {
                return None;
            }
            let aligned = align_up(block.offset, alignment)?;
            block.contains_range(aligned, size).then_some((index, aligned))
        });

        match found {
            Some((index, offset)) => {
                self.carve(index, offset, size);
                Ok(offset)
            }
            None => {
                tracing::debug!(
                    "arena exhausted: size={} alignment={} free={} largest={}",
                    size,
                    alignment,
                    self.free_bytes(),
                    self.largest_free_block()
                );
                Err(ArenaError::OutOfSpace { size, alignment })
            }
        }
    }

    /// Allocates `size` bytes with no alignment constraint.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::allocate`].
    #[inline]
    pub fn allocate_default(&mut self, size: usize) -> ArenaResult<usize> {
        self.allocate(size, 1)
    }

    /// Allocates exactly `[offset, offset + size)`.
    ///
    /// The range must sit entirely inside one free block. On failure the
    /// arena is left untouched.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::ZeroSize`] if `size` is zero.
    /// - [`ArenaError::InvalidPlacement`] if the range overlaps an allocated
    ///   block, straddles two blocks, or runs past the capacity.
    pub fn allocate_at(&mut self, offset: usize, size: usize) -> ArenaResult<usize> {
        if size == 0 {
            return Err(ArenaError::ZeroSize);
        }

        let index = self
            .index_containing(offset)
            .filter(|&index| {
                let block = &self.blocks[index];
                block.is_free() && block.contains_range(offset, size)
            })
            .ok_or(ArenaError::InvalidPlacement { offset, size })?;

        self.carve(index, offset, size);
        Ok(offset)
    }

    /// Frees the allocation starting at `offset` and merges it with free neighbours.
    ///
    /// # Panics
    ///
    /// Panics if no allocated block starts at `offset`. That means a double
    /// free or a corrupted handle, and carrying on would break the partition.
    pub fn free(&mut self, offset: usize) {
        if let Err(err) = self.try_free(offset) {
            tracing::error!("{}", err);
            panic!("{err}");
        }
    }

    /// Frees the allocation starting at `offset`, reporting bad offsets instead of panicking.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidFree`] if no allocated block starts at `offset`.
    /// The arena is unchanged in that case.
    pub fn try_free(&mut self, offset: usize) -> ArenaResult<()> {
        let index = self
            .blocks
            .binary_search_by_key(&offset, |block| block.offset)
            .ok()
            .filter(|&index| self.blocks[index].allocated)
            .ok_or(ArenaError::InvalidFree { offset })?;

        self.used -= self.blocks[index].size;
        self.blocks[index].allocated = false;

        let mut first = index;
        while first > 0 && self.blocks[first - 1].is_free() {
            first -= 1;
        }
        let mut last = index;
        while last + 1 < self.blocks.len() && self.blocks[last + 1].is_free() {
            last += 1;
        }

        if first != last {
            let end = self.blocks[last].end();
            self.blocks[first].size = end - self.blocks[first].offset;
            self.blocks.drain(first + 1..=last);
        }
        Ok(())
    }

    /// Renders the partition as a run-length string.
    ///
    /// Every block becomes `ceil(size / block_size)` cells, `#` when
    /// allocated and `.` when free. Runs of equal cells collapse into
    /// `<count><cell>`, so a 128-byte arena with 32-byte allocations at 0
    /// and 64 dumps as `1#1.1#1.` for a `block_size` of 32.
    ///
    /// A `block_size` of zero is treated as one.
    #[must_use]
    pub fn debug_dump(&self, block_size: usize) -> String {
        let block_size = block_size.max(1);
        let mut out = String::new();
        let mut run: Option<(char, usize)> = None;

        for block in &self.blocks {
            let cell = if block.allocated { '#' } else { '.' };
            let cells = block.size.div_ceil(block_size);
            run = match run {
                Some((current, count)) if current == cell => Some((cell, count + cells)),
                Some((current, count)) => {
                    push_run(&mut out, current, count);
                    Some((cell, cells))
                }
                None => Some((cell, cells)),
            };
        }
        if let Some((cell, count)) = run {
            push_run(&mut out, cell, count);
        }
        out
    }

    /// Checks the partition invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, scanning in address order.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut expected = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.size == 0 {
                return Err(InvariantViolation::EmptyBlock { index });
            }
            if block.offset != expected {
                return Err(InvariantViolation::Gap {
                    index,
                    offset: block.offset,
                    expected,
                });
            }
            if block.is_free() && self.blocks.get(index + 1).is_some_and(Block::is_free) {
                return Err(InvariantViolation::Uncoalesced { index });
            }
            expected = block.end();
        }
        if expected != self.capacity {
            return Err(InvariantViolation::Coverage {
                covered: expected,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Index of the block whose range contains `offset`.
    fn index_containing(&self, offset: usize) -> Option<usize> {
        let after = self.blocks.partition_point(|block| block.offset <= offset);
        let index = after.checked_sub(1)?;
        (offset < self.blocks[index].end()).then_some(index)
    }

    /// Turns `[offset, offset + size)` inside free block `index` into an
    /// allocated block, leaving any leading and trailing slack as free blocks.
    fn carve(&mut self, index: usize, offset: usize, size: usize) {
        let block = self.blocks[index];
        debug_assert!(block.is_free() && block.contains_range(offset, size));

        let head = offset - block.offset;
        let tail = block.end() - (offset + size);

        self.blocks[index] = Block::allocated(offset, size);
        if tail > 0 {
            self.blocks.insert(index + 1, Block::free(offset + size, tail));
        }
        if head > 0 {
            self.blocks.insert(index, Block::free(block.offset, head));
        }
        self.used += size;
    }
}

/// Rounds `offset` up to a multiple of `alignment`, or `None` on overflow.
#[inline]
fn align_up(offset: usize, alignment: usize) -> Option<usize> {
    match offset % alignment {
        0 => Some(offset),
        rem => offset.checked_add(alignment - rem),
    }
}

fn push_run(out: &mut String, cell: char, count: usize) {
    out.push_str(&count.to_string());
    out.push(cell);
}
