//! Common types shared between the caches and driver implementations

use bitflags::bitflags;

/// Topology of a render primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// Number of shader stages a program can carry (vertex, fragment, compute).
pub const MAX_SHADER_STAGES: usize = 3;

/// Number of descriptor set slots in a pipeline layout.
pub const MAX_DESCRIPTOR_SET_COUNT: usize = 4;

bitflags! {
    /// Shader stages a push-constant range or binding is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStage: u8 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl Default for ShaderStage {
    fn default() -> Self {
        Self::empty()
    }
}

/// A push-constant range declared by a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PushConstantRange {
    pub stages: ShaderStage,
    pub size: u32,
    pub offset: u32,
}

impl PushConstantRange {
    /// Range of `size` bytes at offset zero.
    pub fn new(stages: ShaderStage, size: u32) -> Self {
        Self {
            stages,
            size,
            offset: 0,
        }
    }
}

/// Shader reflection data needed to build a pipeline layout.
///
/// Programs are compiled elsewhere; the caches only need the push-constant
/// ranges, at most one per shader stage.
pub trait ProgramReflection {
    fn push_constant_ranges(&self) -> &[PushConstantRange];

    fn push_constant_range_count(&self) -> usize {
        self.push_constant_ranges().len()
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_ATTACHMENT = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const COPY_SRC = 1 << 4;
        const COPY_DST = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Texture descriptor
///
/// Also serves as the reuse key of the texture cache, so it carries no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub levels: u8,
    pub samples: u8,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            levels: 1,
            samples: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::SAMPLED,
        }
    }
}

impl TextureDescriptor {
    /// Single-mip 2D texture.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            width,
            height,
            format,
            usage,
            ..Default::default()
        }
    }

    /// Approximate memory footprint of the base level, in bytes.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.width)
            * u64::from(self.height)
            * u64::from(self.depth)
            * u64::from(self.samples)
            * u64::from(self.format.bytes_per_pixel())
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    pub size: u64,
}

impl BufferDescriptor {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

/// Render target descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderTargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub samples: u8,
    pub color: Vec<super::TextureHandle>,
    pub depth: Option<super::TextureHandle>,
}

/// Sampler filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Sampler address mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Sampler descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

/// Graphics pipeline state. Doubles as the pipeline cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub layout: super::PipelineLayoutHandle,
    pub program: super::ProgramHandle,
    pub primitive: PrimitiveType,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    pub depth_write: bool,
}
