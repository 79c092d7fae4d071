//! # Uploads
//!
//! Bounds-checked copies between a sub-buffer and its backing store.
//!
//! A sub-buffer's bytes live at `region.offset + local_offset` in the
//! backing store. Every copy is checked against `region.size` before the
//! backing store sees it, so a bad local offset can never spill into a
//! neighbouring allocation.

use bytemuck::Pod;

use crate::backing::BackingStore;
use crate::error::{PoolError, PoolResult};

/// Byte range of one sub-buffer inside its backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// Offset returned by the arena.
    pub offset: usize,
    /// Size of the allocation in bytes.
    pub size: usize,
}

impl Region {
    /// Absolute offset of `len` bytes at `local_offset`, if they fit.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfBounds`] if `[local_offset, local_offset + len)`
    /// does not lie inside the region.
    pub fn resolve(&self, local_offset: usize, len: usize) -> PoolResult<usize> {
        match local_offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(self.offset + local_offset),
            _ => Err(PoolError::OutOfBounds {
                local_offset,
                len,
                size: self.size,
            }),
        }
    }
}

/// Copies `bytes` into `region` at `local_offset`.
///
/// # Errors
///
/// [`PoolError::OutOfBounds`] if the copy would leave the region.
pub fn write_bytes<B: BackingStore>(
    backing: &mut B,
    region: Region,
    local_offset: usize,
    bytes: &[u8],
) -> PoolResult<()> {
    let at = region.resolve(local_offset, bytes.len())?;
    backing.write(at, bytes);
    Ok(())
}

/// Copies `out.len()` bytes from `region` at `local_offset` into `out`.
///
/// # Errors
///
/// [`PoolError::OutOfBounds`] if the copy would leave the region.
pub fn read_bytes<B: BackingStore>(
    backing: &B,
    region: Region,
    local_offset: usize,
    out: &mut [u8],
) -> PoolResult<()> {
    let at = region.resolve(local_offset, out.len())?;
    backing.read(at, out);
    Ok(())
}

/// Views a slice of plain-old-data as raw bytes for upload.
#[inline]
#[must_use]
pub fn pod_bytes<T: Pod>(data: &[T]) -> &[u8] {
    bytemuck::cast_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::HostBacking;

    #[test]
    fn test_resolve_bounds() {
        let region = Region { offset: 64, size: 32 };
        assert_eq!(region.resolve(0, 32), Ok(64));
        assert_eq!(region.resolve(31, 1), Ok(95));
        assert_eq!(region.resolve(32, 0), Ok(96));
        assert_eq!(
            region.resolve(16, 17),
            Err(PoolError::OutOfBounds { local_offset: 16, len: 17, size: 32 })
        );
        assert!(region.resolve(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_write_stays_inside_region() {
        let mut backing = HostBacking::zeroed(16);
        let region = Region { offset: 4, size: 4 };

        write_bytes(&mut backing, region, 1, &[9, 9, 9]).unwrap();
        assert!(write_bytes(&mut backing, region, 2, &[7, 7, 7]).is_err());
        assert_eq!(backing.as_bytes(), &[0, 0, 0, 0, 0, 9, 9, 9, 0, 0, 0, 0, 0, 0, 0, 0]);

        let mut out = [0u8; 4];
        read_bytes(&backing, region, 0, &mut out).unwrap();
        assert_eq!(out, [0, 9, 9, 9]);
    }

    #[test]
    fn test_pod_bytes() {
        let indices: [u16; 3] = [1, 2, 0x0300];
        let bytes = pod_bytes(&indices);
        assert_eq!(bytes.len(), 6);
        assert_eq!(u16::from_ne_bytes([bytes[4], bytes[5]]), 0x0300);
    }
}
