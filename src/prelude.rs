//! Re-exports all important types.

pub use crate::core::context::{GraphContext, FRAMES_IN_FLIGHT};
pub use crate::core::error::Error;

pub use crate::command_buffer::state::{IndexType, Rect2D, RenderingAttachmentInfo, RenderingInfo, Viewport};
pub use crate::command_buffer::{Command, CommandList, IncompleteCommandList};

pub use crate::graph::pass::{
    AttachmentInfo, ClearColor, ClearDepthStencil, ClearValue, EmptyPassExecutor, FramebufferInfo, LoadOp, Pass, PassBuilder, PassContext,
    PassExecutor, PassKind, PassResource, StoreOp,
};
pub use crate::graph::pass_graph::{CompiledGraph, GraphViz, PassResourceBarrier, RenderGraph};
pub use crate::graph::physical_resource::{BufferId, PhysicalResource, ResourceEntry, ResourceTable, TextureId};
pub use crate::graph::record::FrameStats;
pub use crate::graph::resource::{AccessMode, BufferDescription, Format, ResourceDescription, ResourceType, TextureDescription};
pub use crate::graph::task_graph::TaskGraph;
pub use crate::graph::virtual_resource::ResourceHandle;

pub use crate::resource::pool::{TransientAllocator, TransientPool};

pub use crate::sync::recording::Recording;
pub use crate::sync::submission::{BackendExecutor, Submission, SubmittedPass};
