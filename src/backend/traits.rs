//! Driver contract
//!
//! The caches in this crate never talk to a GPU API directly. Every backend
//! object they manage is created and destroyed through [`Driver`], which a
//! Vulkan, Metal or OpenGL backend implements on top of its own command
//! stream. Handles are opaque dense integers.

use crate::backend::types::*;
use crate::error::BackendResult;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            pub const fn id(self) -> u32 {
                self.0
            }
        }
    };
}

define_handle!(
    /// Handle to a backend vertex buffer
    VertexBufferHandle
);
define_handle!(
    /// Handle to a backend index buffer
    IndexBufferHandle
);
define_handle!(
    /// Handle to a backend render primitive (vertex buffer + index buffer + topology)
    RenderPrimitiveHandle
);
define_handle!(
    /// Handle to a backend descriptor set layout
    DescriptorSetLayoutHandle
);
define_handle!(
    /// Handle to a backend pipeline layout
    PipelineLayoutHandle
);
define_handle!(
    /// Handle to a compiled shader program
    ProgramHandle
);
define_handle!(
    /// Handle to a backend graphics pipeline
    PipelineHandle
);
define_handle!(
    /// Handle to a backend texture
    TextureHandle
);
define_handle!(
    /// Handle to a backend buffer
    BufferHandle
);
define_handle!(
    /// Handle to a backend render target
    RenderTargetHandle
);

static_assertions::assert_impl_all!(RenderPrimitiveHandle: Copy, Send, Sync, Ord);
static_assertions::assert_impl_all!(PipelineLayoutHandle: Copy, Send, Sync, std::hash::Hash);

/// Backend object factory consumed by the caches.
///
/// Implementations are long-lived and externally owned. Caches borrow a
/// driver for the duration of a call and must be terminated before the
/// driver is torn down. Creation failures are reported through
/// [`BackendError`](crate::error::BackendError); destruction cannot fail.
pub trait Driver: Send + Sync {
    /// Human readable backend name
    fn name(&self) -> &str;

    fn create_render_primitive(
        &self,
        vbh: VertexBufferHandle,
        ibh: IndexBufferHandle,
        primitive_type: PrimitiveType,
    ) -> BackendResult<RenderPrimitiveHandle>;

    fn destroy_render_primitive(&self, handle: RenderPrimitiveHandle);

    /// Create a pipeline layout. Unused descriptor set slots are `None`.
    fn create_pipeline_layout(
        &self,
        set_layouts: &[Option<DescriptorSetLayoutHandle>],
        push_constants: &[PushConstantRange],
    ) -> BackendResult<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&self, handle: PipelineLayoutHandle);

    fn create_pipeline(&self, desc: &PipelineDescriptor) -> BackendResult<PipelineHandle>;

    fn destroy_pipeline(&self, handle: PipelineHandle);

    fn create_texture(&self, name: &str, desc: &TextureDescriptor)
        -> BackendResult<TextureHandle>;

    fn destroy_texture(&self, handle: TextureHandle);

    fn create_buffer(
        &self,
        name: &str,
        desc: &BufferDescriptor,
        usage: BufferUsage,
    ) -> BackendResult<BufferHandle>;

    fn destroy_buffer(&self, handle: BufferHandle);

    fn create_render_target(
        &self,
        name: &str,
        desc: &RenderTargetDescriptor,
    ) -> BackendResult<RenderTargetHandle>;

    fn destroy_render_target(&self, handle: RenderTargetHandle);
}
