use anyhow::Result;

use crate::command_buffer::state::{IndexType, Rect2D, Viewport};
use crate::command_buffer::{Command, CommandList, IncompleteCommandList};
use crate::core::error::Error;
use crate::graph::pass::PassKind;
use crate::graph::physical_resource::ResourceTable;
use crate::graph::virtual_resource::ResourceHandle;

impl<'r> IncompleteCommandList<'r> {
    pub(crate) fn new(kind: PassKind, render_area: Option<Rect2D>, resources: &'r ResourceTable) -> Self {
        Self {
            commands: CommandList::new(),
            kind,
            render_area,
            resources,
        }
    }

    fn push(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    fn require_graphics(&self) -> Result<()> {
        match self.kind {
            PassKind::Graphics => Ok(()),
            PassKind::Compute => Err(Error::NoRenderpass.into()),
        }
    }

    fn require_compute(&self) -> Result<()> {
        match self.kind {
            PassKind::Compute => Ok(()),
            PassKind::Graphics => Err(Error::NoComputePass.into()),
        }
    }

    /// Get the kind of pass this list is recorded for
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Get the render area of the current render pass, if this is a graphics pass.
    pub fn render_area(&self) -> Option<Rect2D> {
        self.render_area
    }

    /// Automatically set viewport and scissor region to the entire render area.
    /// # Errors
    /// - Fails if this is not a graphics pass with a framebuffer.
    pub fn full_viewport_scissor(self) -> Result<Self> {
        let Some(area) = self.render_area else { return Err(Error::NoRenderpass.into()) };
        Ok(self.viewport(area.into()).scissor(area))
    }

    /// Sets the viewport.
    pub fn viewport(self, viewport: Viewport) -> Self {
        self.push(Command::SetViewport(viewport))
    }

    /// Sets the scissor region.
    pub fn scissor(self, scissor: Rect2D) -> Self {
        self.push(Command::SetScissor(scissor))
    }

    /// Bind a graphics pipeline by name. The backend resolves the name.
    /// # Errors
    /// - Fails if this is not a graphics pass.
    pub fn bind_graphics_pipeline(self, name: &str) -> Result<Self> {
        self.require_graphics()?;
        Ok(self.push(Command::BindGraphicsPipeline(name.to_owned())))
    }

    /// Bind a compute pipeline by name. The backend resolves the name.
    /// # Errors
    /// - Fails if this is not a compute pass.
    pub fn bind_compute_pipeline(self, name: &str) -> Result<Self> {
        self.require_compute()?;
        Ok(self.push(Command::BindComputePipeline(name.to_owned())))
    }

    /// Resolve a graph resource and bind it to a descriptor slot.
    /// # Errors
    /// - Fails with [`Error::InvalidHandle`] if the handle does not belong to this frame.
    pub fn bind_resource(self, set: u32, binding: u32, resource: ResourceHandle) -> Result<Self> {
        let resource = self.resources.resolve(resource)?;
        Ok(self.push(Command::BindResource {
            set,
            binding,
            resource,
        }))
    }

    /// Bind a graph buffer to the given vertex input binding.
    pub fn bind_vertex_buffer(self, binding: u32, buffer: ResourceHandle) -> Result<Self> {
        self.require_graphics()?;
        let buffer = self.resources.resolve(buffer)?;
        Ok(self.push(Command::BindVertexBuffer {
            binding,
            buffer,
        }))
    }

    /// Bind a graph buffer as the index buffer.
    pub fn bind_index_buffer(self, buffer: ResourceHandle, ty: IndexType) -> Result<Self> {
        self.require_graphics()?;
        let buffer = self.resources.resolve(buffer)?;
        Ok(self.push(Command::BindIndexBuffer {
            buffer,
            ty,
        }))
    }

    /// Upload push constants.
    pub fn push_constants(self, offset: u32, data: &[u8]) -> Self {
        self.push(Command::PushConstants {
            offset,
            data: data.to_vec(),
        })
    }

    /// Record a single drawcall.
    pub fn draw(self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<Self> {
        self.require_graphics()?;
        Ok(self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        }))
    }

    /// Record a single indexed drawcall.
    pub fn draw_indexed(self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) -> Result<Self> {
        self.require_graphics()?;
        Ok(self.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        }))
    }

    /// Dispatch a compute shader.
    pub fn dispatch(self, x: u32, y: u32, z: u32) -> Result<Self> {
        self.require_compute()?;
        Ok(self.push(Command::Dispatch {
            x,
            y,
            z,
        }))
    }

    /// Copy the contents of one graph resource into another.
    pub fn copy(self, src: ResourceHandle, dst: ResourceHandle) -> Result<Self> {
        let src = self.resources.resolve(src)?;
        let dst = self.resources.resolve(dst)?;
        Ok(self.push(Command::Copy {
            src,
            dst,
        }))
    }

    /// Finish recording and obtain the command list.
    pub fn finish(self) -> CommandList {
        self.commands
    }
}
