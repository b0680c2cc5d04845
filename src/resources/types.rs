//! Built-in resource types

use crate::backend::{
    BufferDescriptor, BufferHandle, BufferUsage, Driver, RenderTargetDescriptor,
    RenderTargetHandle, SamplerDescriptor, TextureDescriptor, TextureHandle, TextureUsage,
};
use crate::error::BackendError;
use crate::resources::allocator::{BackendCreate, Capability, Resource, SelfCreate, TextureHooks};

/// A texture allocated through the texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub desc: TextureDescriptor,
}

impl Resource for Texture {
    type Descriptor = TextureDescriptor;
    type Usage = TextureUsage;

    const CAPABILITY: Capability<Self> = Capability::TextureCache(TextureHooks {
        descriptor: |desc, usage| TextureDescriptor {
            usage: desc.usage | usage,
            ..*desc
        },
        wrap: |handle, desc| Texture { handle, desc },
        unwrap: |texture| texture.handle,
    });
}

/// A GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffer {
    pub handle: BufferHandle,
    pub size: u64,
    pub usage: BufferUsage,
}

impl Buffer {
    fn create(
        driver: &dyn Driver,
        name: &str,
        desc: &BufferDescriptor,
        usage: BufferUsage,
    ) -> Result<Self, BackendError> {
        let handle = driver.create_buffer(name, desc, usage)?;
        Ok(Self {
            handle,
            size: desc.size,
            usage,
        })
    }

    fn destroy(self, driver: &dyn Driver) {
        driver.destroy_buffer(self.handle);
    }
}

impl Resource for Buffer {
    type Descriptor = BufferDescriptor;
    type Usage = BufferUsage;

    const CAPABILITY: Capability<Self> =
        Capability::Backend(BackendCreate::Full(Buffer::create), Buffer::destroy);
}

/// A render target owned by the frame graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub handle: RenderTargetHandle,
    pub width: u32,
    pub height: u32,
}

impl Resource for RenderTarget {
    type Descriptor = RenderTargetDescriptor;
    type Usage = ();

    const CAPABILITY: Capability<Self> = Capability::Backend(
        BackendCreate::NameDescriptor(|driver, name, desc| {
            let handle = driver.create_render_target(name, desc)?;
            Ok(RenderTarget {
                handle,
                width: desc.width,
                height: desc.height,
            })
        }),
        |target, driver| driver.destroy_render_target(target.handle),
    );
}

/// Describes a render target created outside the frame graph, such as the
/// swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedTargetDescriptor {
    pub target: RenderTargetHandle,
    pub width: u32,
    pub height: u32,
}

/// A render target the frame graph uses but does not own.
///
/// Creating and destroying it never reaches the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedTarget {
    pub handle: RenderTargetHandle,
    pub width: u32,
    pub height: u32,
}

impl Resource for ImportedTarget {
    type Descriptor = ImportedTargetDescriptor;
    type Usage = ();

    const CAPABILITY: Capability<Self> = Capability::SelfContained(
        SelfCreate::Descriptor(|desc: &ImportedTargetDescriptor| {
            Ok(ImportedTarget {
                handle: desc.target,
                width: desc.width,
                height: desc.height,
            })
        }),
        |_| {},
    );
}

/// Sampler state. Backends bind samplers by value, so there is no object to
/// create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sampler {
    pub name: String,
    pub desc: SamplerDescriptor,
}

impl Resource for Sampler {
    type Descriptor = SamplerDescriptor;
    type Usage = ();

    const CAPABILITY: Capability<Self> = Capability::SelfContained(
        SelfCreate::NameDescriptor(|name, desc| {
            Ok(Sampler {
                name: name.to_string(),
                desc: *desc,
            })
        }),
        |_| {},
    );
}

/// Resource with no backing object.
///
/// Used for graph nodes that only express ordering between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Empty;

impl Resource for Empty {
    type Descriptor = ();
    type Usage = ();

    const CAPABILITY: Capability<Self> = Capability::Placeholder(|| Empty);
}
