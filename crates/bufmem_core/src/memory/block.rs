//! # Block Records
//!
//! One contiguous range of the arena, tagged free or allocated.

/// A contiguous range `[offset, offset + size)` inside an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    /// Start of the range.
    pub offset: usize,
    /// Length of the range in bytes. Never zero inside an arena.
    pub size: usize,
    /// Whether the range is handed out.
    pub allocated: bool,
}

impl Block {
    /// Creates a free block.
    #[inline]
    #[must_use]
    pub const fn free(offset: usize, size: usize) -> Self {
        Self { offset, size, allocated: false }
    }

    /// Creates an allocated block.
    #[inline]
    #[must_use]
    pub const fn allocated(offset: usize, size: usize) -> Self {
        Self { offset, size, allocated: true }
    }

    /// One past the last byte of the block.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Returns true if the block is not handed out.
    #[inline]
    #[must_use]
    pub const fn is_free(&self) -> bool {
        !self.allocated
    }

    /// Returns true if `[offset, offset + size)` lies inside this block.
    #[inline]
    #[must_use]
    pub fn contains_range(&self, offset: usize, size: usize) -> bool {
        offset >= self.offset && offset.checked_add(size).is_some_and(|end| end <= self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_range() {
        let block = Block::free(32, 96);
        assert!(block.contains_range(32, 96));
        assert!(block.contains_range(64, 32));
        assert!(!block.contains_range(0, 40));
        assert!(!block.contains_range(120, 16));
        assert!(!block.contains_range(100, usize::MAX));
    }
}
