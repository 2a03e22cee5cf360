//! This module mainly exposes the [`PassBuilder`] struct, used for correctly defining passes in a
//! [`RenderGraph`](crate::RenderGraph).
//!
//! Each pass declares the resources it consumes and the resources it produces, together with the access mode
//! it needs for each of them. Nothing is inferred: a graphics pass that renders to an attachment must list that
//! attachment as a producer as well, otherwise adding the pass to the graph fails.
//!
//! # Example
//!
//! In this example we define two passes: one that renders to an offscreen texture, and one that samples from this
//! texture while rendering to the backbuffer.
//! ```
//! use framegraph::prelude::*;
//!
//! let mut ctx = GraphContext::default();
//! let mut graph = ctx.begin_frame::<()>();
//! let offscreen = graph.create_transient("offscreen", TextureDescription::new_2d(1280, 720, Format::Rgba16Float));
//! let backbuffer = graph.import_texture("backbuffer", TextureId(0), 1280, 720, AccessMode::Present);
//!
//! let offscreen_pass = PassBuilder::graphics("offscreen")
//!     .color([1.0, 0.0, 0.0, 1.0])
//!     .clear_color_attachment(offscreen, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))?
//!     .produce(offscreen, AccessMode::AttachmentWrite)
//!     .execute_fn(|cmd, _ctx, _| {
//!         cmd.full_viewport_scissor()?
//!            .bind_graphics_pipeline("scene")?
//!            .draw(3, 1, 0, 0)
//!     })
//!     .build();
//!
//! let sample_pass = PassBuilder::graphics("sample")
//!     .load_color_attachment(backbuffer)?
//!     .consume(offscreen, AccessMode::SampledRead)
//!     .produce(backbuffer, AccessMode::AttachmentWrite)
//!     .execute_fn(move |cmd, _ctx, _| {
//!         cmd.bind_graphics_pipeline("fullscreen_sample")?
//!            .bind_resource(0, 0, offscreen)?
//!            .draw(6, 1, 0, 0)
//!     })
//!     .build();
//!
//! graph.add_pass(offscreen_pass)?;
//! graph.add_pass(sample_pass)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;

use crate::command_buffer::state::Rect2D;
use crate::command_buffer::IncompleteCommandList;
use crate::core::error::Error;
use crate::graph::physical_resource::{PhysicalResource, ResourceTable};
use crate::graph::resource::AccessMode;
use crate::graph::virtual_resource::ResourceHandle;

/// The kind of work a pass does. Only graphics passes can have a framebuffer.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PassKind {
    #[default]
    Graphics,
    Compute,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearColor {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct ClearDepthStencil {
    pub depth: f32,
    pub stencil: u32,
}

/// Clear value of an attachment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearValue {
    Color(ClearColor),
    DepthStencil(ClearDepthStencil),
}

/// What happens to the contents of an attachment when the render pass begins.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LoadOp {
    Load,
    Clear(ClearValue),
    DontCare,
}

/// What happens to the contents of an attachment when the render pass ends.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

/// One attachment of a framebuffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttachmentInfo {
    pub resource: ResourceHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

impl AttachmentInfo {
    /// An attachment is written when its contents are stored or cleared.
    pub fn is_written(&self) -> bool {
        self.store_op == StoreOp::Store || matches!(self.load_op, LoadOp::Clear(_))
    }
}

/// Framebuffer description of a graphics pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramebufferInfo {
    pub color_attachments: Vec<AttachmentInfo>,
    pub depth_attachment: Option<AttachmentInfo>,
    /// Explicit render area. If not set, it is derived from the first attachment with a known extent.
    pub render_area: Option<Rect2D>,
}

impl FramebufferInfo {
    /// Iterate over all attachments, color attachments first.
    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentInfo> {
        self.color_attachments.iter().chain(self.depth_attachment.iter())
    }

    pub(crate) fn resolve_render_area(&self, resources: &ResourceTable) -> Option<Rect2D> {
        if self.render_area.is_some() {
            return self.render_area;
        }
        self.attachments().find_map(|attachment| {
            let (width, height) = resources.entry(attachment.resource).ok()?.extent()?;
            Some(Rect2D {
                x: 0,
                y: 0,
                width,
                height,
            })
        })
    }
}

/// A resource declared by a pass, together with the access mode the pass needs.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct PassResource {
    pub resource: ResourceHandle,
    pub access: AccessMode,
}

/// Read-only view on the frame that a pass callback receives while recording.
#[derive(Debug, Copy, Clone)]
pub struct PassContext<'r> {
    pub(crate) name: &'r str,
    pub(crate) kind: PassKind,
    pub(crate) resources: &'r ResourceTable,
}

impl<'r> PassContext<'r> {
    /// Name of the pass being recorded
    pub fn name(&self) -> &str {
        self.name
    }

    /// Kind of the pass being recorded
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Get the frame's resource table.
    pub fn resources(&self) -> &'r ResourceTable {
        self.resources
    }

    /// Resolve a handle to its physical resource.
    /// # Errors
    /// - Fails with [`Error::InvalidHandle`] if the handle does not belong to this frame.
    pub fn physical_resource(&self, handle: ResourceHandle) -> Result<PhysicalResource> {
        self.resources.resolve(handle)
    }
}

/// The returned value from a pass callback function.
pub type PassFnResult<'r> = Result<IncompleteCommandList<'r>>;

/// Defines a pass executor that is called exactly once when the pass is recorded.
pub trait PassExecutor<U> {
    /// Record this pass to a command list.
    fn execute<'r>(&mut self, cmd: IncompleteCommandList<'r>, ctx: &PassContext<'r>, user_data: &U) -> PassFnResult<'r>;
}

impl<U, F> PassExecutor<U> for F
where
    F: for<'r> FnMut(IncompleteCommandList<'r>, &PassContext<'r>, &U) -> PassFnResult<'r>,
{
    /// Record this pass to a command list by calling the given function.
    fn execute<'r>(&mut self, cmd: IncompleteCommandList<'r>, ctx: &PassContext<'r>, user_data: &U) -> PassFnResult<'r> {
        self(cmd, ctx, user_data)
    }
}

pub(crate) type BoxedPassFn<'cb, U> = Box<dyn PassExecutor<U> + Send + 'cb>;

/// An empty pass executor that does nothing
pub struct EmptyPassExecutor;

impl EmptyPassExecutor {
    /// Creates an empty pass executor
    pub fn new() -> Self {
        Self {}
    }

    /// Create a new empty pass executor in a [`Box`]
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self::new())
    }
}

impl Default for EmptyPassExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> PassExecutor<U> for EmptyPassExecutor {
    /// Execute the empty pass executor by just returning the command list.
    fn execute<'r>(&mut self, cmd: IncompleteCommandList<'r>, _ctx: &PassContext<'r>, _user_data: &U) -> PassFnResult<'r> {
        Ok(cmd)
    }
}

/// Represents one pass in a frame graph. You can obtain one using a [`PassBuilder`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Pass<'cb, U = ()> {
    pub(crate) name: String,
    pub(crate) kind: PassKind,
    pub(crate) color: Option<[f32; 4]>,
    pub(crate) consumers: Vec<PassResource>,
    pub(crate) producers: Vec<PassResource>,
    pub(crate) framebuffer: Option<FramebufferInfo>,
    #[derivative(Debug = "ignore")]
    pub(crate) execute: BoxedPassFn<'cb, U>,
}

impl<'cb, U> Pass<'cb, U> {
    /// Get the pass name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass kind
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Resources this pass reads, in declaration order
    pub fn consumers(&self) -> &[PassResource] {
        &self.consumers
    }

    /// Resources this pass writes, in declaration order
    pub fn producers(&self) -> &[PassResource] {
        &self.producers
    }

    /// Framebuffer of this pass, if any
    pub fn framebuffer(&self) -> Option<&FramebufferInfo> {
        self.framebuffer.as_ref()
    }

    /// Whether this pass produces the given resource.
    pub fn produces(&self, resource: ResourceHandle) -> bool {
        self.producers.iter().any(|p| p.resource == resource)
    }

    /// Whether this pass consumes the given resource.
    pub fn consumes(&self, resource: ResourceHandle) -> bool {
        self.consumers.iter().any(|c| c.resource == resource)
    }

    /// The access this pass needs for a resource as seen by later passes. Producing wins over consuming.
    pub fn net_access(&self, resource: ResourceHandle) -> Option<AccessMode> {
        self.producers
            .iter()
            .chain(self.consumers.iter())
            .find(|usage| usage.resource == resource)
            .map(|usage| usage.access)
    }
}

/// Find a resource that a declaration list uses with two different access modes.
pub(crate) fn find_ambiguous(declarations: &[PassResource]) -> Option<ResourceHandle> {
    declarations.iter().enumerate().find_map(|(i, usage)| {
        declarations[i + 1..]
            .iter()
            .any(|other| other.resource == usage.resource && other.access != usage.access)
            .then_some(usage.resource)
    })
}

/// Used to create [`Pass`] objects correctly.
/// # Example
/// See the [`pass`](crate::graph::pass) module level documentation.
pub struct PassBuilder<'cb, U = ()> {
    inner: Pass<'cb, U>,
}

impl<'cb, U> PassBuilder<'cb, U> {
    fn new(name: impl Into<String>, kind: PassKind) -> Self {
        PassBuilder {
            inner: Pass {
                name: name.into(),
                kind,
                color: None,
                consumers: vec![],
                producers: vec![],
                framebuffer: None,
                execute: Box::new(EmptyPassExecutor::new()),
            },
        }
    }

    /// Create a new graphics pass. This constructor is required for passes that render to any attachments.
    pub fn graphics(name: impl Into<String>) -> Self {
        Self::new(name, PassKind::Graphics)
    }

    /// Create a new compute pass. Compute passes cannot have attachments.
    pub fn compute(name: impl Into<String>) -> Self {
        Self::new(name, PassKind::Compute)
    }

    /// Set the color of this pass. This shows up in the debug labels emitted with the `debug-markers` feature.
    pub fn color(mut self, color: [f32; 4]) -> Self {
        self.inner.color = Some(color);
        self
    }

    fn declare(list: &mut Vec<PassResource>, resource: ResourceHandle, access: AccessMode) {
        let usage = PassResource {
            resource,
            access,
        };
        if !list.contains(&usage) {
            list.push(usage);
        }
    }

    /// Declare that this pass reads `resource` with the given access. Declaring the same pair twice has no effect.
    pub fn consume(mut self, resource: ResourceHandle, access: AccessMode) -> Self {
        Self::declare(&mut self.inner.consumers, resource, access);
        self
    }

    /// Declare that this pass writes `resource` with the given access. Declaring the same pair twice has no effect.
    pub fn produce(mut self, resource: ResourceHandle, access: AccessMode) -> Self {
        Self::declare(&mut self.inner.producers, resource, access);
        self
    }

    /// Set the complete framebuffer description.
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn framebuffer(mut self, info: FramebufferInfo) -> Result<Self> {
        if self.inner.kind != PassKind::Graphics {
            return Err(Error::NotAGraphicsPass(self.inner.name.clone()).into());
        }
        self.inner.framebuffer = Some(info);
        Ok(self)
    }

    fn framebuffer_mut(&mut self) -> Result<&mut FramebufferInfo> {
        if self.inner.kind != PassKind::Graphics {
            return Err(Error::NotAGraphicsPass(self.inner.name.clone()).into());
        }
        Ok(self.inner.framebuffer.get_or_insert_with(FramebufferInfo::default))
    }

    /// Adds a color attachment to this pass. The attachment must also be declared as a producer.
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn color_attachment(mut self, resource: ResourceHandle, load_op: LoadOp, store_op: StoreOp) -> Result<Self> {
        self.framebuffer_mut()?.color_attachments.push(AttachmentInfo {
            resource,
            load_op,
            store_op,
        });
        Ok(self)
    }

    /// Clear a color attachment with the specified clear color
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn clear_color_attachment(self, resource: ResourceHandle, color: ClearColor) -> Result<Self> {
        self.color_attachment(resource, LoadOp::Clear(ClearValue::Color(color)), StoreOp::Store)
    }

    /// Load a color attachment
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn load_color_attachment(self, resource: ResourceHandle) -> Result<Self> {
        self.color_attachment(resource, LoadOp::Load, StoreOp::Store)
    }

    /// Sets the depth attachment of this pass.
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn depth_attachment(mut self, resource: ResourceHandle, load_op: LoadOp, store_op: StoreOp) -> Result<Self> {
        self.framebuffer_mut()?.depth_attachment = Some(AttachmentInfo {
            resource,
            load_op,
            store_op,
        });
        Ok(self)
    }

    /// Clear the depth attachment with the specified clear values
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn clear_depth_attachment(self, resource: ResourceHandle, clear: ClearDepthStencil) -> Result<Self> {
        self.depth_attachment(resource, LoadOp::Clear(ClearValue::DepthStencil(clear)), StoreOp::Store)
    }

    /// Override the render area of this pass.
    /// # Errors
    /// * Fails if this pass was not created using [`PassBuilder::graphics()`]
    pub fn render_area(mut self, area: Rect2D) -> Result<Self> {
        self.framebuffer_mut()?.render_area = Some(area);
        Ok(self)
    }

    /// Set the executor to be called when recording this pass.
    pub fn executor(mut self, exec: impl PassExecutor<U> + Send + 'cb) -> Self {
        self.inner.execute = Box::new(exec);
        self
    }

    /// Set the executor to be called when recording this pass. This method can be used to deduce types
    /// when a closure is used as a pass executor.
    pub fn execute_fn<F>(mut self, exec: F) -> Self
    where
        F: for<'r> FnMut(IncompleteCommandList<'r>, &PassContext<'r>, &U) -> PassFnResult<'r> + Send + 'cb, {
        self.inner.execute = Box::new(exec);
        self
    }

    /// Obtain a built [`Pass`] object.
    pub fn build(self) -> Pass<'cb, U> {
        self.inner
    }
}

static_assertions::assert_impl_all!(Pass<'static, ()>: Send);
