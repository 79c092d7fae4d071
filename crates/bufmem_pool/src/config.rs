//! # Pool Configuration
//!
//! Pool sizes and alignments, loaded once at startup from TOML:
//!
//! ```toml
//! [[pools]]
//! label = "static-geometry"
//! usage = "vertex"
//! capacity = 67108864
//!
//! [[pools]]
//! label = "per-frame-uniforms"
//! usage = "uniform"
//! capacity = 1048576
//! grow = true
//! max_region_capacity = 16777216
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Default pool capacity (16 MiB).
pub const DEFAULT_POOL_CAPACITY: usize = 16 * 1024 * 1024;

/// What the bytes of a pool are used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferUsage {
    /// Vertex attributes.
    #[default]
    Vertex,
    /// Index lists.
    Index,
    /// Uniform/constant blocks.
    Uniform,
    /// Staging copies with no placement rules.
    Staging,
}

impl BufferUsage {
    /// Every usage, in declaration order.
    pub const ALL: [Self; 4] = [Self::Vertex, Self::Index, Self::Uniform, Self::Staging];

    /// Alignment used when the config does not set one.
    #[inline]
    #[must_use]
    pub const fn default_alignment(self) -> usize {
        match self {
            Self::Vertex | Self::Index => 4,
            Self::Uniform => 256, // common minimum uniform offset alignment
            Self::Staging => 1,
        }
    }
}

/// Configuration for a single pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name used in logs and dumps.
    pub label: String,
    /// What the pool holds.
    pub usage: BufferUsage,
    /// Size of the backing allocation in bytes.
    pub capacity: usize,
    /// Alignment for plain `allocate` calls. Falls back to the usage default.
    pub alignment: Option<usize>,
    /// Whether the buffer manager may add another region of this kind when full.
    pub grow: bool,
    /// Largest region the buffer manager may add when growing. Unlimited if unset.
    pub max_region_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            label: String::from("pool"),
            usage: BufferUsage::default(),
            capacity: DEFAULT_POOL_CAPACITY,
            alignment: None,
            grow: false,
            max_region_capacity: None,
        }
    }
}

impl PoolConfig {
    /// Creates a config with the usage's default alignment and no growth.
    #[must_use]
    pub fn new(label: impl Into<String>, usage: BufferUsage, capacity: usize) -> Self {
        Self {
            label: label.into(),
            usage,
            capacity,
            ..Self::default()
        }
    }

    /// Sets an explicit alignment.
    #[must_use]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Allows the buffer manager to add regions of this kind.
    #[must_use]
    pub fn with_grow(mut self, grow: bool) -> Self {
        self.grow = grow;
        self
    }

    /// Caps the size of regions the buffer manager adds.
    #[must_use]
    pub fn with_max_region_capacity(mut self, max: usize) -> Self {
        self.max_region_capacity = Some(max);
        self
    }

    /// Alignment applied to plain `allocate` calls.
    #[inline]
    #[must_use]
    pub fn effective_alignment(&self) -> usize {
        self.alignment.unwrap_or_else(|| self.usage.default_alignment())
    }

    /// Rejects configs no pool can be built from.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] for a zero capacity, a zero alignment, or
    /// a region cap smaller than the capacity.
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidConfig(format!(
                "pool '{}' has zero capacity",
                self.label
            )));
        }
        if self.alignment == Some(0) {
            return Err(PoolError::InvalidConfig(format!(
                "pool '{}' has zero alignment",
                self.label
            )));
        }
        if let Some(max) = self.max_region_capacity.filter(|&max| max < self.capacity) {
            return Err(PoolError::InvalidConfig(format!(
                "pool '{}' caps regions at {} bytes, below its capacity of {}",
                self.label, max, self.capacity
            )));
        }
        Ok(())
    }
}

/// Configuration for a [`BufferManager`](crate::BufferManager).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pools to create, in order. Several pools may share a usage.
    pub pools: Vec<PoolConfig>,
}

impl ManagerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the document does not parse or a pool is invalid.
    pub fn from_toml_str(text: &str) -> PoolResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PoolError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Validates every pool.
    ///
    /// # Errors
    ///
    /// The first [`PoolError::InvalidConfig`] found.
    pub fn validate(&self) -> PoolResult<()> {
        self.pools.iter().try_for_each(PoolConfig::validate)
    }

    /// The first pool config for `usage`.
    #[must_use]
    pub fn pool(&self, usage: BufferUsage) -> Option<&PoolConfig> {
        self.pools.iter().find(|pool| pool.usage == usage)
    }
}
