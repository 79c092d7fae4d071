//! # Backing Stores
//!
//! The one physical allocation a pool carves up.

use crate::error::{PoolError, PoolResult};

/// A fixed-size byte region that sub-buffers are copied into.
///
/// Implementations may assume every range they are handed lies inside
/// `[0, size())`; the pool checks bounds before calling.
pub trait BackingStore: Send + 'static {
    /// Size of the region in bytes. Must not change after creation.
    fn size(&self) -> usize;

    /// Copies `bytes` to `[offset, offset + bytes.len())`.
    fn write(&mut self, offset: usize, bytes: &[u8]);

    /// Copies `[offset, offset + out.len())` into `out`.
    fn read(&self, offset: usize, out: &mut [u8]);
}

/// Host-memory backing store, zeroed on creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostBacking {
    bytes: Box<[u8]>,
}

impl HostBacking {
    /// Allocates `size` zeroed bytes.
    ///
    /// Aborts or panics like any `Vec` allocation if the host cannot
    /// provide the memory; use [`HostBacking::try_zeroed`] for sizes that
    /// come from callers.
    #[must_use]
    pub fn zeroed(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Allocates `size` zeroed bytes, reporting failure instead of aborting.
    ///
    /// # Errors
    ///
    /// [`PoolError::BackingAllocation`] if `size` overflows the address
    /// space or the allocator refuses it.
    pub fn try_zeroed(size: usize) -> PoolResult<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| PoolError::BackingAllocation { size })?;
        bytes.resize(size, 0u8);
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// The whole region.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BackingStore for HostBacking {
    #[inline]
    fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[inline]
    fn read(&self, offset: usize, out: &mut [u8]) {
        out.copy_from_slice(&self.bytes[offset..offset + out.len()]);
    }
}
