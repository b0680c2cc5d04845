//! Backend object caches
//!
//! | Cache | Key | Bound |
//! |-------|-----|-------|
//! | [`RenderPrimitiveFactory`] | vertex buffer, index buffer, topology | reference counted |
//! | [`PipelineLayoutCache`] | descriptor set layouts, push constants | unbounded |
//! | [`PipelineCache`] | [`PipelineDescriptor`](crate::backend::PipelineDescriptor) | LRU, fixed capacity |
//!
//! [`RenderCaches`] owns one of each together with the
//! [`ResourceAllocator`] and tears them down in the right order.

mod lru;
mod pipeline;
mod pipeline_layout;
mod primitive;

pub use lru::{Iter, LruCache};
pub use pipeline::PipelineCache;
pub use pipeline_layout::{
    DescriptorSetLayouts, PipelineLayoutCache, PipelineLayoutKey, PushConstantKey,
};
pub use primitive::{PrimitiveKey, RenderPrimitiveFactory};

use crate::backend::Driver;
use crate::resources::ResourceAllocator;
use crate::CacheConfig;

/// All long-lived backend caches of a renderer.
#[derive(Debug)]
pub struct RenderCaches {
    pub primitives: RenderPrimitiveFactory,
    pub layouts: PipelineLayoutCache,
    pub pipelines: PipelineCache,
    pub allocator: ResourceAllocator,
}

impl RenderCaches {
    /// Create empty caches sized by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        log::debug!(
            "RenderCaches: pipeline capacity {}, texture idle limit {} frames",
            config.pipeline_cache_capacity,
            config.texture_cache_max_idle_frames
        );
        Self {
            primitives: RenderPrimitiveFactory::new(),
            layouts: PipelineLayoutCache::new(),
            pipelines: PipelineCache::new(config.pipeline_cache_capacity),
            allocator: ResourceAllocator::new(config.texture_cache_max_idle_frames),
        }
    }

    /// Destroy every cached object.
    ///
    /// Pipelines go first since they reference layouts. Primitives must all
    /// have been released by their owners already.
    pub fn terminate(&mut self, driver: &dyn Driver) {
        self.pipelines.terminate(driver);
        self.layouts.terminate(driver);
        self.primitives.terminate(driver);
        self.allocator.terminate(driver);
    }
}

impl Default for RenderCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
