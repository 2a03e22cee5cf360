use crate::graph::pass::{LoadOp, StoreOp};
use crate::graph::physical_resource::PhysicalResource;

/// Viewport transform, in pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle, in pixels.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl From<Rect2D> for Viewport {
    fn from(area: Rect2D) -> Self {
        Viewport {
            x: area.x as f32,
            y: area.y as f32,
            width: area.width as f32,
            height: area.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Index type for indexed draws.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum IndexType {
    U16,
    #[default]
    U32,
}

/// Attachment of a framebuffer after its handle was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingAttachmentInfo {
    pub resource: PhysicalResource,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Everything a backend needs to begin a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingInfo {
    pub render_area: Rect2D,
    pub color_attachments: Vec<RenderingAttachmentInfo>,
    pub depth_attachment: Option<RenderingAttachmentInfo>,
}
