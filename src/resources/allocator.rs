//! Resource allocator
//!
//! One `create`/`destroy` entry point for every resource type the frame graph
//! can devirtualize. Resource types do not implement a common constructor;
//! instead each one declares, through [`Resource::CAPABILITY`], how it is
//! built:
//!
//! - [`Capability::Backend`]: the constructor needs the driver. It accepts
//!   the name, descriptor and usage, only the name and descriptor, or only
//!   the descriptor.
//! - [`Capability::SelfContained`]: the type creates whatever it needs on
//!   its own, with the same three argument shapes but no driver.
//! - [`Capability::TextureCache`]: allocation goes through the allocator's
//!   [`TextureCache`] so released textures can be recycled.
//! - [`Capability::Placeholder`]: the type has no backing object at all.
//!
//! The allocator forwards exactly the arguments the chosen shape accepts.

use crate::backend::{Driver, TextureDescriptor, TextureHandle};
use crate::error::BackendResult;
use crate::resources::texture_cache::TextureCache;

/// A type the [`ResourceAllocator`] can create and destroy.
pub trait Resource: Sized {
    type Descriptor;
    type Usage: Copy + Default;

    const CAPABILITY: Capability<Self>;
}

/// Constructor of a driver-backed resource, by accepted arguments.
pub enum BackendCreate<R: Resource> {
    Full(fn(&dyn Driver, &str, &R::Descriptor, R::Usage) -> BackendResult<R>),
    NameDescriptor(fn(&dyn Driver, &str, &R::Descriptor) -> BackendResult<R>),
    Descriptor(fn(&dyn Driver, &R::Descriptor) -> BackendResult<R>),
}

/// Constructor of a self-contained resource, by accepted arguments.
pub enum SelfCreate<R: Resource> {
    Full(fn(&str, &R::Descriptor, R::Usage) -> BackendResult<R>),
    NameDescriptor(fn(&str, &R::Descriptor) -> BackendResult<R>),
    Descriptor(fn(&R::Descriptor) -> BackendResult<R>),
}

/// Conversions between a texture-like resource and the texture cache.
pub struct TextureHooks<R: Resource> {
    /// Backend texture descriptor for a request.
    pub descriptor: fn(&R::Descriptor, R::Usage) -> TextureDescriptor,
    /// Wrap a cached texture into the resource.
    pub wrap: fn(TextureHandle, TextureDescriptor) -> R,
    /// Unwrap the resource into the texture to hand back to the cache.
    pub unwrap: fn(R) -> TextureHandle,
}

/// How a [`Resource`] is created and destroyed.
pub enum Capability<R: Resource> {
    Backend(BackendCreate<R>, fn(R, &dyn Driver)),
    SelfContained(SelfCreate<R>, fn(R)),
    TextureCache(TextureHooks<R>),
    Placeholder(fn() -> R),
}

/// Dispatches resource creation and destruction by capability.
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    textures: TextureCache,
}

impl ResourceAllocator {
    /// Create an allocator whose texture cache keeps free textures for at
    /// most `max_idle_frames` frames.
    pub fn new(max_idle_frames: u32) -> Self {
        Self {
            textures: TextureCache::new(max_idle_frames),
        }
    }

    /// Create a resource of type `R` through its capability.
    pub fn create<R: Resource>(
        &mut self,
        driver: &dyn Driver,
        name: &str,
        desc: &R::Descriptor,
        usage: R::Usage,
    ) -> BackendResult<R> {
        match R::CAPABILITY {
            Capability::Backend(create, _) => match create {
                BackendCreate::Full(create) => create(driver, name, desc, usage),
                BackendCreate::NameDescriptor(create) => create(driver, name, desc),
                BackendCreate::Descriptor(create) => create(driver, desc),
            },
            Capability::SelfContained(create, _) => match create {
                SelfCreate::Full(create) => create(name, desc, usage),
                SelfCreate::NameDescriptor(create) => create(name, desc),
                SelfCreate::Descriptor(create) => create(desc),
            },
            Capability::TextureCache(hooks) => {
                let texture_desc = (hooks.descriptor)(desc, usage);
                let handle = self.textures.acquire(driver, name, &texture_desc)?;
                Ok((hooks.wrap)(handle, texture_desc))
            }
            Capability::Placeholder(make) => Ok(make()),
        }
    }

    /// Release a resource obtained from [`create`](Self::create).
    pub fn destroy<R: Resource>(&mut self, driver: &dyn Driver, resource: R) {
        match R::CAPABILITY {
            Capability::Backend(_, destroy) => destroy(resource, driver),
            Capability::SelfContained(_, destroy) => destroy(resource),
            Capability::TextureCache(hooks) => self.textures.release((hooks.unwrap)(resource)),
            Capability::Placeholder(_) => {}
        }
    }

    /// Start a new frame.
    pub fn begin_frame(&mut self) {
        self.textures.begin_frame();
    }

    /// Garbage-collect textures that stayed unused for too long.
    pub fn end_frame(&mut self, driver: &dyn Driver) {
        self.textures.end_frame(driver);
    }

    /// Release every cached backend object. Call before the driver goes away.
    pub fn terminate(&mut self, driver: &dyn Driver) {
        self.textures.terminate(driver);
    }

    /// Texture pool backing [`Texture`](crate::resources::Texture) resources.
    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }
}
