//! Bounded cache of compiled graphics pipelines.
//!
//! Pipelines are keyed by their full [`PipelineDescriptor`]. The cache holds
//! at most `capacity` pipelines; the least recently used one is destroyed
//! through the driver when a new pipeline needs room.

use crate::backend::{Driver, PipelineDescriptor, PipelineHandle};
use crate::cache::lru::LruCache;
use crate::error::BackendResult;

/// LRU-bounded pipeline cache.
#[derive(Debug)]
pub struct PipelineCache {
    pipelines: LruCache<PipelineDescriptor, PipelineHandle>,
    evictions: u64,
}

impl PipelineCache {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pipeline cache capacity must be greater than zero");
        Self {
            pipelines: LruCache::new(capacity),
            evictions: 0,
        }
    }

    /// Get the pipeline for `desc`, compiling it on a miss.
    pub fn get_or_create(
        &mut self,
        driver: &dyn Driver,
        desc: &PipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        if let Some(&mut handle) = self.pipelines.get(desc) {
            return Ok(handle);
        }

        let handle = driver.create_pipeline(desc)?;
        let mut evicted = false;
        self.pipelines.put(*desc, handle, |old| {
            log::debug!("PipelineCache: evicting pipeline {:?}", old);
            driver.destroy_pipeline(old);
            evicted = true;
        });
        if evicted {
            self.evictions += 1;
        }
        Ok(handle)
    }

    /// Destroy every cached pipeline.
    pub fn terminate(&mut self, driver: &dyn Driver) {
        self.pipelines.clear(|handle| driver.destroy_pipeline(handle));
    }

    /// Number of cached pipelines.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pipelines.capacity()
    }

    /// Number of pipelines destroyed to make room since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
