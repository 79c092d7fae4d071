//! # BUFMEM Pools
//!
//! Couples the `bufmem_core` arena to real backing memory.
//!
//! ## Design Principles
//!
//! 1. **One backing allocation per pool** - Sub-buffers are ranges, not allocations
//! 2. **RAII handles** - Dropping a [`SubBuffer`] frees its range
//! 3. **Checked copies** - Uploads never leave their sub-buffer
//! 4. **External configuration** - Pool sizes live in TOML files
//!
//! ## Thread Safety
//!
//! [`BufferPool`] serializes through a mutex. [`AllocatorService`] serializes
//! through a single owner thread and a request channel. Pick one per arena.
//!
//! ## Example
//!
//! ```rust
//! use bufmem_pool::{BufferManager, BufferUsage, ManagerConfig};
//!
//! let config = ManagerConfig::from_toml_str(
//!     r#"
//!     [[pools]]
//!     label = "geometry"
//!     usage = "vertex"
//!     capacity = 65536
//!     "#,
//! )?;
//! let mut manager = BufferManager::new(config)?;
//!
//! let triangle = manager.allocate(BufferUsage::Vertex, 36)?;
//! triangle.write_pod(0, &[0.0f32, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0])?;
//! # Ok::<(), bufmem_pool::PoolError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backing;
pub mod config;
pub mod error;
pub mod manager;
pub mod pool;
pub mod service;
pub mod upload;

pub use backing::{BackingStore, HostBacking};
pub use config::{BufferUsage, ManagerConfig, PoolConfig, DEFAULT_POOL_CAPACITY};
pub use error::{PoolError, PoolResult};
pub use manager::BufferManager;
pub use pool::{BufferPool, PoolStats, SubBuffer};
pub use service::{AllocatorClient, AllocatorService};
pub use upload::Region;
