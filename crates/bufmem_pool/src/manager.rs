//! # Buffer Manager
//!
//! Pools grouped by usage. Requests go to the first pool of the right usage
//! with room; when every pool is full and the usage allows growth, a new
//! backing region is added. Nothing is ever migrated between regions.
//!
//! Added regions stay until [`BufferManager::trim`] finds them empty; a
//! burst of growth is not given back on its own.

use std::collections::HashMap;

use bufmem_core::ArenaError;

use crate::config::{BufferUsage, ManagerConfig, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::pool::{BufferPool, PoolStats, SubBuffer};

/// Host-backed pools keyed by [`BufferUsage`].
#[derive(Debug)]
pub struct BufferManager {
    config: ManagerConfig,
    pools: HashMap<BufferUsage, Vec<BufferPool>>,
    /// Regions added by growth so far, per usage. Only feeds labels.
    grown: HashMap<BufferUsage, usize>,
}

impl BufferManager {
    /// Creates every pool listed in the config.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if any pool config is invalid.
    pub fn new(config: ManagerConfig) -> PoolResult<Self> {
        config.validate()?;

        let mut pools: HashMap<BufferUsage, Vec<BufferPool>> = HashMap::new();
        for pool_config in &config.pools {
            pools
                .entry(pool_config.usage)
                .or_default()
                .push(BufferPool::new(pool_config)?);
        }

        Ok(Self {
            config,
            pools,
            grown: HashMap::new(),
        })
    }

    /// Allocates `size` bytes from a pool of `usage`.
    ///
    /// Pools are tried in creation order. If all of them are full and a
    /// config for `usage` sets `grow`, a region of
    /// `max(capacity, size + alignment)` bytes is added and used, as long
    /// as that stays within the config's `max_region_capacity`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NoPool`] if nothing is configured for `usage`.
    /// - [`PoolError::Arena`] if every pool refuses and growth is off or
    ///   capped, or the request itself is invalid.
    /// - [`PoolError::BackingAllocation`] if the host cannot provide the
    ///   new region.
    pub fn allocate(&mut self, usage: BufferUsage, size: usize) -> PoolResult<SubBuffer> {
        let pools = self.pools.get_mut(&usage).ok_or(PoolError::NoPool(usage))?;

        let mut exhausted = None;
        for pool in pools.iter() {
            match pool.allocate(size) {
                Ok(sub) => return Ok(sub),
                Err(err @ PoolError::Arena(ArenaError::OutOfSpace { .. })) => exhausted = Some(err),
                Err(err) => return Err(err),
            }
        }

        let Some(template) = self.config.pools.iter().find(|p| p.usage == usage && p.grow) else {
            return Err(exhausted.unwrap_or(PoolError::NoPool(usage)));
        };

        let alignment = template.effective_alignment();
        let limit = template.max_region_capacity.unwrap_or(usize::MAX);
        let capacity = size
            .checked_add(alignment)
            .map(|needed| template.capacity.max(needed))
            .filter(|&capacity| capacity <= limit)
            .ok_or(PoolError::Arena(ArenaError::OutOfSpace { size, alignment }))?;

        let grown = self.grown.entry(usage).or_insert(0);
        let configured = self.config.pools.iter().filter(|p| p.usage == usage).count();
        let config = PoolConfig {
            label: format!("{}#{}", template.label, configured + *grown),
            capacity,
            ..template.clone()
        };
        tracing::debug!(
            "Growing {:?} buffers: new region '{}' of {} bytes",
            usage,
            config.label,
            config.capacity
        );

        let pool = BufferPool::new(&config)?;
        let sub = pool.allocate(size)?;
        pools.push(pool);
        *grown += 1;
        Ok(sub)
    }

    /// Drops regions added by growth that hold no live sub-buffers.
    ///
    /// Pools listed in the config are always kept. Returns how many
    /// regions were released.
    pub fn trim(&mut self, usage: BufferUsage) -> usize {
        let configured = self.config.pools.iter().filter(|p| p.usage == usage).count();
        let Some(pools) = self.pools.get_mut(&usage) else {
            return 0;
        };

        let before = pools.len();
        let mut index = 0;
        pools.retain(|pool| {
            let keep = index < configured || pool.stats().live_allocations > 0;
            index += 1;
            keep
        });

        let released = before - pools.len();
        if released > 0 {
            tracing::debug!("Trimmed {:?} buffers: released {} empty regions", usage, released);
        }
        released
    }

    /// Pools for `usage`, in creation order.
    #[must_use]
    pub fn pools(&self, usage: BufferUsage) -> &[BufferPool] {
        self.pools.get(&usage).map_or(&[][..], Vec::as_slice)
    }

    /// Combined stats of every pool for `usage`.
    #[must_use]
    pub fn stats(&self, usage: BufferUsage) -> PoolStats {
        self.pools(usage).iter().map(BufferPool::stats).sum()
    }

    /// The config the manager was built from.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }
}
