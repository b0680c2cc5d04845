//! # framegraph
//!
//! Scheduling and caching core of a real-time renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`DependencyGraph`] - DAG of passes and resources with reference-count culling
//! - [`FrameGraph`] - Per-frame pass builder on top of the dependency graph
//! - [`ResourceAllocator`] - Capability-driven creation of typed GPU resources
//! - [`RenderPrimitiveFactory`] - De-duplicated, reference-counted render primitives
//! - [`PipelineLayoutCache`] - Content-addressed pipeline layouts
//! - [`LruCache`] - Bounded cache with explicit release of evicted values
//! - [`Driver`] - Backend contract, with [`DummyDriver`] for tests
//!
//! ## Example
//!
//! ```
//! use framegraph::{CacheConfig, DummyDriver, RenderCaches};
//!
//! framegraph::init();
//! let driver = DummyDriver::new();
//! let mut caches = RenderCaches::new(&CacheConfig::default());
//! // Build and execute frame graphs, create pipelines...
//! caches.terminate(&driver);
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod graph;
pub mod resources;

// Re-export main types for convenience
pub use backend::{Driver, DummyDriver};
pub use cache::{LruCache, PipelineCache, PipelineLayoutCache, RenderCaches, RenderPrimitiveFactory};
pub use error::{BackendError, BackendResult, FrameGraphError};
pub use graph::{DependencyGraph, FrameGraph, PassHandle, ResourceHandle};
pub use resources::{Resource, ResourceAllocator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library. Only logs the version.
pub fn init() {
    log::info!("framegraph v{} initialized", VERSION);
}

/// Sizing of the long-lived caches in [`RenderCaches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of compiled pipelines kept alive
    pub pipeline_cache_capacity: usize,
    /// Frames a released texture may stay unused before it is destroyed
    pub texture_cache_max_idle_frames: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pipeline_cache_capacity: 64,
            texture_cache_max_idle_frames: 3,
        }
    }
}
