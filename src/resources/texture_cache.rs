//! Texture cache
//!
//! Textures requested by the frame graph are usually identical from one
//! frame to the next. Instead of destroying a released texture right away,
//! the cache keeps it in a free bucket keyed by its descriptor and hands it
//! out again to the next request with the same descriptor.
//!
//! # Lifecycle
//!
//! ```text
//! acquire()  ──►  in use  ──► release()  ──►  free bucket
//!    ▲                                            │
//!    └──────────── descriptor match ──────────────┘
//!                                                 │
//!                end_frame(): idle > max_idle ──► driver.destroy_texture()
//! ```
//!
//! Free textures age by one frame on every [`TextureCache::end_frame`] and are
//! destroyed once they have sat unused for more than `max_idle_frames` frames.

use std::collections::HashMap;

use crate::backend::{Driver, TextureDescriptor, TextureHandle};
use crate::error::BackendResult;

#[derive(Debug)]
struct CachedTexture {
    handle: TextureHandle,
    /// Frames spent in the free bucket without being reused.
    idle_frames: u32,
}

/// Descriptor-keyed pool of backend textures.
#[derive(Debug)]
pub struct TextureCache {
    free: HashMap<TextureDescriptor, Vec<CachedTexture>>,
    in_use: HashMap<TextureHandle, TextureDescriptor>,
    max_idle_frames: u32,
    frame: u64,
}

impl TextureCache {
    /// Create a cache that keeps free textures for `max_idle_frames` frames.
    pub fn new(max_idle_frames: u32) -> Self {
        Self {
            free: HashMap::new(),
            in_use: HashMap::new(),
            max_idle_frames,
            frame: 0,
        }
    }

    /// Get a texture matching `desc`, reusing a free one when possible.
    pub fn acquire(
        &mut self,
        driver: &dyn Driver,
        name: &str,
        desc: &TextureDescriptor,
    ) -> BackendResult<TextureHandle> {
        let reused = self.free.get_mut(desc).and_then(Vec::pop);
        let handle = match reused {
            Some(cached) => {
                log::trace!(
                    "TextureCache: reusing texture {:?} for '{}'",
                    cached.handle,
                    name
                );
                cached.handle
            }
            None => driver.create_texture(name, desc)?,
        };

        self.in_use.insert(handle, *desc);
        Ok(handle)
    }

    /// Return a texture obtained from [`acquire`](Self::acquire) to the pool.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not currently in use.
    pub fn release(&mut self, handle: TextureHandle) {
        let desc = self
            .in_use
            .remove(&handle)
            .unwrap_or_else(|| panic!("releasing texture {handle:?} which is not in use"));
        self.free.entry(desc).or_default().push(CachedTexture {
            handle,
            idle_frames: 0,
        });
    }

    pub fn begin_frame(&mut self) {
        self.frame += 1;
    }

    /// Age the free textures and destroy the ones idle for too long.
    pub fn end_frame(&mut self, driver: &dyn Driver) {
        let max_idle = self.max_idle_frames;
        let mut destroyed = 0usize;
        for bucket in self.free.values_mut() {
            for cached in bucket.iter_mut() {
                cached.idle_frames += 1;
            }
            bucket.retain(|cached| {
                if cached.idle_frames > max_idle {
                    driver.destroy_texture(cached.handle);
                    destroyed += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.free.retain(|_, bucket| !bucket.is_empty());

        if destroyed > 0 {
            log::debug!(
                "TextureCache: frame {} released {} idle textures",
                self.frame,
                destroyed
            );
        }
    }

    /// Destroy every free texture.
    ///
    /// Textures still in use are left to their owners; a warning is logged
    /// since they will outlive the cache.
    pub fn terminate(&mut self, driver: &dyn Driver) {
        if !self.in_use.is_empty() {
            log::warn!(
                "TextureCache: terminating with {} textures still in use",
                self.in_use.len()
            );
        }
        for (_, bucket) in self.free.drain() {
            for cached in bucket {
                driver.destroy_texture(cached.handle);
            }
        }
    }

    /// Number of free textures waiting for reuse.
    pub fn len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.free.values().all(Vec::is_empty)
    }

    /// Number of textures currently handed out.
    pub fn in_use(&self) -> usize {
        self.in_use.len()
    }

    /// Number of frames started so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(crate::CacheConfig::default().texture_cache_max_idle_frames)
    }
}
