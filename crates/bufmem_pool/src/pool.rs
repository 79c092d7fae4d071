//! # Buffer Pool
//!
//! One arena coupled to one backing allocation.
//!
//! ## Architecture
//!
//! ```text
//!   BufferPool (clone = same pool)
//!        │
//!        ▼
//!   Arc<Mutex<PoolState>> ◄──────────── SubBuffer (offset, size)
//!        │                                   │ write / read
//!        ├── Arena        (offsets)          │ drop → arena.free(offset)
//!        └── BackingStore (bytes) ◄──────────┘
//! ```
//!
//! ## Thread Safety
//!
//! The arena and backing store sit behind one `parking_lot::Mutex`. Every
//! allocation, copy and free takes the lock, so stats and dumps always see a
//! consistent partition.

use std::fmt;
use std::iter::Sum;
use std::sync::Arc;

use bufmem_core::{Arena, ArenaError};
use bytemuck::Pod;
use parking_lot::Mutex;

use crate::backing::{BackingStore, HostBacking};
use crate::config::{BufferUsage, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::upload::{self, Region};

/// Everything guarded by the pool lock.
struct PoolState<B> {
    arena: Arena,
    backing: B,
    /// Sub-buffers not yet dropped.
    live: usize,
}

/// Snapshot of a pool's occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total bytes managed.
    pub capacity: usize,
    /// Bytes handed out.
    pub used: usize,
    /// Bytes not handed out.
    pub free: usize,
    /// Largest single allocation that could succeed with alignment 1.
    pub largest_free_block: usize,
    /// Block records in the arena.
    pub blocks: usize,
    /// Sub-buffers alive.
    pub live_allocations: usize,
}

impl Sum for PoolStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, stats| Self {
            capacity: acc.capacity + stats.capacity,
            used: acc.used + stats.used,
            free: acc.free + stats.free,
            largest_free_block: acc.largest_free_block.max(stats.largest_free_block),
            blocks: acc.blocks + stats.blocks,
            live_allocations: acc.live_allocations + stats.live_allocations,
        })
    }
}

/// A backing allocation shared out as sub-buffers.
///
/// # Example
///
/// ```rust
/// use bufmem_pool::{BufferPool, BufferUsage, PoolConfig};
///
/// let pool = BufferPool::new(&PoolConfig::new("quads", BufferUsage::Index, 1024))?;
/// let indices = pool.allocate(12)?;
/// indices.write_pod(0, &[0u16, 1, 2, 2, 3, 0])?;
/// assert_eq!(pool.stats().live_allocations, 1);
///
/// drop(indices);
/// assert_eq!(pool.stats().blocks, 1);
/// # Ok::<(), bufmem_pool::PoolError>(())
/// ```
pub struct BufferPool<B: BackingStore = HostBacking> {
    state: Arc<Mutex<PoolState<B>>>,
    label: Arc<str>,
    usage: BufferUsage,
    alignment: usize,
}

impl BufferPool<HostBacking> {
    /// Creates a pool backed by zeroed host memory.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if the config is invalid.
    /// - [`PoolError::BackingAllocation`] if the host memory cannot be reserved.
    pub fn new(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Self::with_backing(config, HostBacking::try_zeroed(config.capacity)?)
    }
}

impl<B: BackingStore> BufferPool<B> {
    /// Creates a pool over an existing backing store.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] if the config is invalid.
    /// - [`PoolError::CapacityMismatch`] if the store size differs from the
    ///   configured capacity.
    pub fn with_backing(config: &PoolConfig, backing: B) -> PoolResult<Self> {
        config.validate()?;
        if backing.size() != config.capacity {
            return Err(PoolError::CapacityMismatch {
                expected: config.capacity,
                actual: backing.size(),
            });
        }

        tracing::info!(
            "Pool '{}' created: {:?}, {} bytes, alignment {}",
            config.label,
            config.usage,
            config.capacity,
            config.effective_alignment()
        );

        Ok(Self {
            state: Arc::new(Mutex::new(PoolState {
                arena: Arena::new(config.capacity),
                backing,
                live: 0,
            })),
            label: Arc::from(config.label.as_str()),
            usage: config.usage,
            alignment: config.effective_alignment(),
        })
    }

    /// Name from the config.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Usage from the config.
    #[inline]
    #[must_use]
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Alignment applied by [`BufferPool::allocate`].
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    /// Total bytes managed.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().arena.capacity()
    }

    /// Allocates `size` bytes at the pool's default alignment.
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] if the arena refuses the request.
    pub fn allocate(&self, size: usize) -> PoolResult<SubBuffer<B>> {
        self.allocate_aligned(size, self.alignment)
    }

    /// Allocates `size` bytes at an offset that is a multiple of `alignment`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] if the arena refuses the request.
    pub fn allocate_aligned(&self, size: usize, alignment: usize) -> PoolResult<SubBuffer<B>> {
        let mut state = self.state.lock();
        match state.arena.allocate(size, alignment) {
            Ok(offset) => Ok(self.hand_out(&mut state, offset, size)),
            Err(err) => {
                if let ArenaError::OutOfSpace { .. } = err {
                    tracing::warn!(
                        "Pool '{}' exhausted: wanted {} bytes, {} free, largest block {}",
                        self.label,
                        size,
                        state.arena.free_bytes(),
                        state.arena.largest_free_block()
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Allocates exactly `[offset, offset + size)`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Arena`] if the range is not inside one free block.
    pub fn allocate_at(&self, offset: usize, size: usize) -> PoolResult<SubBuffer<B>> {
        let mut state = self.state.lock();
        let offset = state.arena.allocate_at(offset, size)?;
        Ok(self.hand_out(&mut state, offset, size))
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            capacity: state.arena.capacity(),
            used: state.arena.used(),
            free: state.arena.free_bytes(),
            largest_free_block: state.arena.largest_free_block(),
            blocks: state.arena.num_blocks(),
            live_allocations: state.live,
        }
    }

    /// Run-length dump of the arena, see [`Arena::debug_dump`].
    #[must_use]
    pub fn debug_dump(&self, block_size: usize) -> String {
        self.state.lock().arena.debug_dump(block_size)
    }

    fn hand_out(&self, state: &mut PoolState<B>, offset: usize, size: usize) -> SubBuffer<B> {
        state.live += 1;
        SubBuffer {
            state: Arc::clone(&self.state),
            region: Region { offset, size },
        }
    }
}

impl<B: BackingStore> Clone for BufferPool<B> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            label: Arc::clone(&self.label),
            usage: self.usage,
            alignment: self.alignment,
        }
    }
}

impl<B: BackingStore> fmt::Debug for BufferPool<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("label", &self.label)
            .field("usage", &self.usage)
            .field("alignment", &self.alignment)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A range of a pool's backing store. Freed when dropped.
///
/// Keeps its pool alive, so sub-buffers may outlive every `BufferPool` clone.
pub struct SubBuffer<B: BackingStore = HostBacking> {
    state: Arc<Mutex<PoolState<B>>>,
    region: Region,
}

impl<B: BackingStore> SubBuffer<B> {
    /// Offset inside the backing store.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.region.offset
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.region.size
    }

    /// Offset and size together.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Copies `bytes` in at `local_offset`.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if the copy would leave this sub-buffer.
    pub fn write(&self, local_offset: usize, bytes: &[u8]) -> PoolResult<()> {
        let mut state = self.state.lock();
        upload::write_bytes(&mut state.backing, self.region, local_offset, bytes)
    }

    /// Copies a slice of plain-old-data in at `local_offset` (in bytes).
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if the copy would leave this sub-buffer.
    pub fn write_pod<T: Pod>(&self, local_offset: usize, data: &[T]) -> PoolResult<()> {
        self.write(local_offset, upload::pod_bytes(data))
    }

    /// Copies `out.len()` bytes out from `local_offset`.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if the copy would leave this sub-buffer.
    pub fn read(&self, local_offset: usize, out: &mut [u8]) -> PoolResult<()> {
        let state = self.state.lock();
        upload::read_bytes(&state.backing, self.region, local_offset, out)
    }
}

impl<B: BackingStore> Drop for SubBuffer<B> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.arena.free(self.region.offset);
        state.live -= 1;
    }
}

impl<B: BackingStore> fmt::Debug for SubBuffer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubBuffer")
            .field("offset", &self.region.offset)
            .field("size", &self.region.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> BufferPool {
        BufferPool::new(&PoolConfig::new("test", BufferUsage::Staging, capacity)).unwrap()
    }

    #[test]
    fn test_allocate_and_drop() {
        let pool = pool(128);
        let a = pool.allocate(32).unwrap();
        let b = pool.allocate(32).unwrap();
        assert_eq!((a.offset(), b.offset()), (0, 32));
        assert_eq!(pool.stats().live_allocations, 2);
        assert_eq!(pool.stats().used, 64);

        drop(a);
        drop(b);
        let stats = pool.stats();
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.free, 128);
    }

    #[test]
    fn test_default_alignment_from_usage() {
        let uniforms =
            BufferPool::new(&PoolConfig::new("ubo", BufferUsage::Uniform, 1024)).unwrap();
        let a = uniforms.allocate(16).unwrap();
        let b = uniforms.allocate(16).unwrap();
        assert_eq!(b.offset(), 256);
        assert_eq!(uniforms.debug_dump(16), "1#15.1#47.");
        drop(a);
        drop(b);
    }

    #[test]
    fn test_write_read_round_trip() {
        let pool = pool(64);
        let _pad = pool.allocate(8).unwrap();
        let sub = pool.allocate(16).unwrap();

        sub.write_pod(4, &[1.0f32, 2.0]).unwrap();
        let mut out = [0u8; 8];
        sub.read(4, &mut out).unwrap();
        assert_eq!(out, *bytemuck::bytes_of(&[1.0f32, 2.0]));

        assert_eq!(
            sub.write(12, &[0; 8]),
            Err(PoolError::OutOfBounds { local_offset: 12, len: 8, size: 16 })
        );
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let pool = pool(64);
        let _all = pool.allocate(64).unwrap();
        assert_eq!(
            pool.allocate(1).unwrap_err(),
            PoolError::Arena(ArenaError::OutOfSpace { size: 1, alignment: 1 })
        );
    }

    #[test]
    fn test_allocate_at() {
        let pool = pool(128);
        let _head = pool.allocate(32).unwrap();
        let placed = pool.allocate_at(32, 32).unwrap();
        assert_eq!(placed.offset(), 32);
        assert_eq!(pool.stats().blocks, 3);
        assert!(matches!(
            pool.allocate_at(128, 5),
            Err(PoolError::Arena(ArenaError::InvalidPlacement { .. }))
        ));
    }

    #[test]
    fn test_unreservable_capacity_is_an_error() {
        let config = PoolConfig::new("huge", BufferUsage::Staging, usize::MAX);
        assert_eq!(
            BufferPool::new(&config).unwrap_err(),
            PoolError::BackingAllocation { size: usize::MAX }
        );
    }

    #[test]
    fn test_capacity_mismatch() {
        let config = PoolConfig::new("bad", BufferUsage::Vertex, 256);
        let err = BufferPool::with_backing(&config, HostBacking::zeroed(128)).unwrap_err();
        assert_eq!(err, PoolError::CapacityMismatch { expected: 256, actual: 128 });
    }

    #[test]
    fn test_sub_buffer_outlives_pool_handle() {
        let pool = pool(64);
        let sub = pool.allocate(8).unwrap();
        let observer = pool.clone();
        drop(pool);

        sub.write(0, &[1; 8]).unwrap();
        drop(sub);
        assert_eq!(observer.stats().live_allocations, 0);
    }

    #[test]
    fn test_stats_sum() {
        let a = pool(64);
        let b = pool(128);
        let _x = a.allocate(64).unwrap();
        let total: PoolStats = [a.stats(), b.stats()].into_iter().sum();
        assert_eq!(total.capacity, 192);
        assert_eq!(total.used, 64);
        assert_eq!(total.largest_free_block, 128);
        assert_eq!(total.live_allocations, 1);
    }
}
