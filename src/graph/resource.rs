//! Resource descriptions and access modes used in the frame graph.

/// Type of a resource in the frame graph.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ResourceType {
    /// Texture resource
    #[default]
    Texture,
    /// Buffer resource
    Buffer,
}

/// The ways a pass can access a resource during one step of the frame.
///
/// Access modes are compared to decide whether a transition barrier is needed. Moving to or from
/// [`AccessMode::None`] never needs one, staying in the same read-only mode never needs one, and
/// anything that touches a write does.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum AccessMode {
    /// Not accessed, or contents are undefined.
    #[default]
    None,
    /// Sampled from a shader.
    SampledRead,
    /// Read as a storage image or storage buffer.
    StorageRead,
    /// Written as a storage image or storage buffer.
    StorageWrite,
    /// Read and written as a storage image or storage buffer.
    StorageReadWrite,
    /// Bound as a read-only attachment, for example a depth buffer used for testing only.
    AttachmentRead,
    /// Written as a color or depth attachment.
    AttachmentWrite,
    /// Read and written as an attachment, for example with blending.
    AttachmentReadWrite,
    /// Source of a copy.
    TransferSource,
    /// Destination of a copy.
    TransferDestination,
    /// Read as vertex, index or indirect data.
    VertexRead,
    /// Handed to the presentation engine.
    Present,
}

impl AccessMode {
    /// Whether this access writes to the resource.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            AccessMode::StorageWrite
                | AccessMode::StorageReadWrite
                | AccessMode::AttachmentWrite
                | AccessMode::AttachmentReadWrite
                | AccessMode::TransferDestination
        )
    }

    /// Whether this access only reads from the resource.
    pub fn is_read_only(&self) -> bool {
        !self.is_write() && *self != AccessMode::None
    }

    /// Whether this access can be used on a resource of the given type.
    pub fn supports(&self, ty: ResourceType) -> bool {
        match self {
            AccessMode::SampledRead
            | AccessMode::AttachmentRead
            | AccessMode::AttachmentWrite
            | AccessMode::AttachmentReadWrite
            | AccessMode::Present => ty == ResourceType::Texture,
            AccessMode::VertexRead => ty == ResourceType::Buffer,
            _ => true,
        }
    }

    /// Returns true if moving a resource from `self` to `next` requires a barrier.
    pub fn needs_barrier_to(&self, next: AccessMode) -> bool {
        if *self == AccessMode::None || next == AccessMode::None {
            return false;
        }
        if *self == next && next.is_read_only() {
            return false;
        }
        true
    }
}

/// Texture formats the graph needs to know about. The graph never interprets these, they are
/// only used as part of the transient pool key and passed through to the allocator.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Format {
    /// 8 bit normalized RGBA
    #[default]
    Rgba8Unorm,
    /// 8 bit sRGB RGBA
    Rgba8Srgb,
    /// 16 bit float RGBA
    Rgba16Float,
    /// 32 bit float RGBA
    Rgba32Float,
    /// Single channel 8 bit normalized
    R8Unorm,
    /// Single channel 32 bit float
    R32Float,
    /// 32 bit float depth
    Depth32Float,
    /// 24 bit depth with 8 bit stencil
    Depth24Stencil8,
}

impl Format {
    /// Whether this is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, Format::Depth32Float | Format::Depth24Stencil8)
    }
}

/// Describes a transient texture.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub format: Format,
}

impl TextureDescription {
    /// Create a description for a simple 2D texture with a single mip level.
    pub fn new_2d(width: u32, height: u32, format: Format) -> Self {
        Self {
            width,
            height,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format,
        }
    }
}

/// Describes a transient buffer.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct BufferDescription {
    /// Size in bytes
    pub size: u64,
}

/// Description of a resource whose physical backing is owned by the graph.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ResourceDescription {
    Texture(TextureDescription),
    Buffer(BufferDescription),
}

impl ResourceDescription {
    /// Get the resource type this description creates
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceDescription::Texture(_) => ResourceType::Texture,
            ResourceDescription::Buffer(_) => ResourceType::Buffer,
        }
    }
}

impl From<TextureDescription> for ResourceDescription {
    fn from(value: TextureDescription) -> Self {
        ResourceDescription::Texture(value)
    }
}

impl From<BufferDescription> for ResourceDescription {
    fn from(value: BufferDescription) -> Self {
        ResourceDescription::Buffer(value)
    }
}
