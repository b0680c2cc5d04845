//! Dummy driver for testing and development.
//!
//! This driver doesn't talk to a GPU. It hands out dense ids, keeps track of
//! which objects are alive and counts every call, so tests can assert exactly
//! how many backend objects the caches created and destroyed.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{BackendError, BackendResult};

/// Kind of backend object tracked by the [`DummyDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ObjectKind {
    RenderPrimitive = 0,
    PipelineLayout = 1,
    Pipeline = 2,
    Texture = 3,
    Buffer = 4,
    RenderTarget = 5,
}

const OBJECT_KIND_COUNT: usize = 6;

/// Per-kind call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverStats {
    created: [usize; OBJECT_KIND_COUNT],
    destroyed: [usize; OBJECT_KIND_COUNT],
}

impl DriverStats {
    /// Number of successful create calls for `kind`.
    pub fn created(&self, kind: ObjectKind) -> usize {
        self.created[kind as usize]
    }

    /// Number of destroy calls for `kind`.
    pub fn destroyed(&self, kind: ObjectKind) -> usize {
        self.destroyed[kind as usize]
    }

    /// Number of objects of `kind` currently alive.
    pub fn live(&self, kind: ObjectKind) -> usize {
        self.created(kind) - self.destroyed(kind)
    }
}

#[derive(Debug, Default)]
struct DummyState {
    next_id: u32,
    live: [HashSet<u32>; OBJECT_KIND_COUNT],
    stats: DriverStats,
    fail_next: Option<BackendError>,
}

impl DummyState {
    fn allocate(&mut self, kind: ObjectKind) -> BackendResult<u32> {
        if let Some(err) = self.fail_next.take() {
            log::trace!("DummyDriver: failing {:?} allocation with {}", kind, err);
            return Err(err);
        }
        self.next_id += 1;
        let id = self.next_id;
        self.live[kind as usize].insert(id);
        self.stats.created[kind as usize] += 1;
        Ok(id)
    }

    fn release(&mut self, kind: ObjectKind, id: u32) {
        assert!(
            self.live[kind as usize].remove(&id),
            "DummyDriver: destroying {kind:?} #{id} which is not alive"
        );
        self.stats.destroyed[kind as usize] += 1;
    }
}

/// Dummy driver.
#[derive(Debug, Default)]
pub struct DummyDriver {
    state: Mutex<DummyState>,
}

impl DummyDriver {
    /// Create a new dummy driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> DriverStats {
        self.state.lock().stats
    }

    /// Number of objects of `kind` currently alive.
    pub fn live(&self, kind: ObjectKind) -> usize {
        self.state.lock().live[kind as usize].len()
    }

    /// Whether the object with the given raw id is alive.
    pub fn is_alive(&self, kind: ObjectKind, id: u32) -> bool {
        self.state.lock().live[kind as usize].contains(&id)
    }

    /// Make the next allocation, of any kind, fail with `error`.
    pub fn fail_next_allocation(&self, error: BackendError) {
        self.state.lock().fail_next = Some(error);
    }
}

impl Driver for DummyDriver {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn create_render_primitive(
        &self,
        vbh: VertexBufferHandle,
        ibh: IndexBufferHandle,
        primitive_type: PrimitiveType,
    ) -> BackendResult<RenderPrimitiveHandle> {
        let id = self.state.lock().allocate(ObjectKind::RenderPrimitive)?;
        log::trace!(
            "DummyDriver: creating render primitive #{} ({:?}, {:?}, {:?})",
            id,
            vbh,
            ibh,
            primitive_type
        );
        Ok(RenderPrimitiveHandle::new(id))
    }

    fn destroy_render_primitive(&self, handle: RenderPrimitiveHandle) {
        log::trace!("DummyDriver: destroying render primitive #{}", handle.id());
        self.state
            .lock()
            .release(ObjectKind::RenderPrimitive, handle.id());
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[Option<DescriptorSetLayoutHandle>],
        push_constants: &[PushConstantRange],
    ) -> BackendResult<PipelineLayoutHandle> {
        let id = self.state.lock().allocate(ObjectKind::PipelineLayout)?;
        log::trace!(
            "DummyDriver: creating pipeline layout #{} ({} sets, {} push constant ranges)",
            id,
            set_layouts.iter().flatten().count(),
            push_constants.len()
        );
        Ok(PipelineLayoutHandle::new(id))
    }

    fn destroy_pipeline_layout(&self, handle: PipelineLayoutHandle) {
        log::trace!("DummyDriver: destroying pipeline layout #{}", handle.id());
        self.state
            .lock()
            .release(ObjectKind::PipelineLayout, handle.id());
    }

    fn create_pipeline(&self, desc: &PipelineDescriptor) -> BackendResult<PipelineHandle> {
        let id = self.state.lock().allocate(ObjectKind::Pipeline)?;
        log::trace!(
            "DummyDriver: creating pipeline #{} (program {:?}, layout {:?})",
            id,
            desc.program,
            desc.layout
        );
        Ok(PipelineHandle::new(id))
    }

    fn destroy_pipeline(&self, handle: PipelineHandle) {
        log::trace!("DummyDriver: destroying pipeline #{}", handle.id());
        self.state.lock().release(ObjectKind::Pipeline, handle.id());
    }

    fn create_texture(
        &self,
        name: &str,
        desc: &TextureDescriptor,
    ) -> BackendResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "texture '{name}' has zero extent"
            )));
        }
        let id = self.state.lock().allocate(ObjectKind::Texture)?;
        log::trace!(
            "DummyDriver: creating texture #{} '{}' ({}x{} {:?})",
            id,
            name,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(TextureHandle::new(id))
    }

    fn destroy_texture(&self, handle: TextureHandle) {
        log::trace!("DummyDriver: destroying texture #{}", handle.id());
        self.state.lock().release(ObjectKind::Texture, handle.id());
    }

    fn create_buffer(
        &self,
        name: &str,
        desc: &BufferDescriptor,
        usage: BufferUsage,
    ) -> BackendResult<BufferHandle> {
        if desc.size == 0 {
            return Err(BackendError::InvalidParameter(format!(
                "buffer '{name}' has zero size"
            )));
        }
        let id = self.state.lock().allocate(ObjectKind::Buffer)?;
        log::trace!(
            "DummyDriver: creating buffer #{} '{}' (size: {}, usage: {:?})",
            id,
            name,
            desc.size,
            usage
        );
        Ok(BufferHandle::new(id))
    }

    fn destroy_buffer(&self, handle: BufferHandle) {
        log::trace!("DummyDriver: destroying buffer #{}", handle.id());
        self.state.lock().release(ObjectKind::Buffer, handle.id());
    }

    fn create_render_target(
        &self,
        name: &str,
        desc: &RenderTargetDescriptor,
    ) -> BackendResult<RenderTargetHandle> {
        let id = self.state.lock().allocate(ObjectKind::RenderTarget)?;
        log::trace!(
            "DummyDriver: creating render target #{} '{}' ({}x{}, {} color attachments)",
            id,
            name,
            desc.width,
            desc.height,
            desc.color.len()
        );
        Ok(RenderTargetHandle::new(id))
    }

    fn destroy_render_target(&self, handle: RenderTargetHandle) {
        log::trace!("DummyDriver: destroying render target #{}", handle.id());
        self.state
            .lock()
            .release(ObjectKind::RenderTarget, handle.id());
    }
}

static_assertions::assert_impl_all!(DummyDriver: Send, Sync);
