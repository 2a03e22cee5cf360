//! The pass graph module holds the render graph implementation.
//!
//! A [`RenderGraph`] is the description of a single frame. It is obtained from
//! [`GraphContext::begin_frame`](crate::GraphContext::begin_frame), filled with resources and passes, and then
//! compiled into a [`CompiledGraph`]. Compiling consumes the description, so nothing can be added to a frame
//! after its order and barriers are fixed.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use anyhow::Result;
use petgraph::dot::Dot;

use crate::core::context::GraphContext;
use crate::core::error::Error;
use crate::graph::pass::{find_ambiguous, Pass};
use crate::graph::physical_resource::{PhysicalResource, ResourceTable, TextureId};
use crate::graph::resource::{AccessMode, ResourceDescription, ResourceType};
use crate::graph::task_graph::{TaskEdge, TaskGraph, TaskNode};
use crate::graph::virtual_resource::ResourceHandle;
use crate::resource::pool::TransientAllocator;

/// Access transition of one resource, executed right before a pass.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct PassResourceBarrier {
    pub resource: ResourceHandle,
    pub from: AccessMode,
    pub to: AccessMode,
}

/// Frame graph description. Register resources and passes, then call [`RenderGraph::compile`].
#[derive(Debug)]
pub struct RenderGraph<'cb, U = ()> {
    resources: ResourceTable,
    passes: Vec<Pass<'cb, U>>,
}

/// A compiled frame graph. Passes are stored in execution order together with the barriers to emit before each of
/// them. Record and submit it with [`CompiledGraph::execute`].
#[derive(Debug)]
pub struct CompiledGraph<'cb, U = ()> {
    pub(crate) resources: ResourceTable,
    pub(crate) passes: Vec<Pass<'cb, U>>,
    pub(crate) order: Vec<usize>,
    pub(crate) barriers: Vec<Vec<PassResourceBarrier>>,
    pub(crate) final_states: Vec<(PhysicalResource, AccessMode)>,
}

impl<'cb, U> RenderGraph<'cb, U> {
    pub(crate) fn new(frame: u64, known_states: HashMap<PhysicalResource, AccessMode>) -> Self {
        Self {
            resources: ResourceTable::new(frame, known_states),
            passes: vec![],
        }
    }

    /// Get the frame this graph describes
    pub fn frame(&self) -> u64 {
        self.resources.frame()
    }

    /// Get the resource table of this frame
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Get all passes in registration order
    pub fn passes(&self) -> &[Pass<'cb, U>] {
        &self.passes
    }

    /// Number of passes in the graph
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    /// Register an externally owned resource in its current access mode. See [`ResourceTable::import`].
    pub fn import(&mut self, name: impl Into<String>, physical: PhysicalResource, access: AccessMode) -> ResourceHandle {
        self.resources.import(name, physical, access)
    }

    /// Register an externally owned texture of known size. See [`ResourceTable::import_texture`].
    pub fn import_texture(
        &mut self,
        name: impl Into<String>,
        texture: TextureId,
        width: u32,
        height: u32,
        access: AccessMode,
    ) -> ResourceHandle {
        self.resources.import_texture(name, texture, width, height, access)
    }

    /// Register an externally owned resource in the access mode the previous frame left it in.
    /// See [`ResourceTable::import_tracked`].
    pub fn import_tracked(&mut self, name: impl Into<String>, physical: PhysicalResource) -> ResourceHandle {
        self.resources.import_tracked(name, physical)
    }

    /// Reserve a graph-owned resource for this frame. See [`ResourceTable::create_transient`].
    pub fn create_transient(&mut self, name: impl Into<String>, description: impl Into<ResourceDescription>) -> ResourceHandle {
        self.resources.create_transient(name, description)
    }

    fn validate(&self, pass: &Pass<'cb, U>) -> Result<()> {
        for usage in pass.consumers().iter().chain(pass.producers()) {
            let entry = self.resources.entry(usage.resource)?;
            if !usage.access.supports(entry.resource_type()) {
                return Err(Error::IncompatibleAccess {
                    pass: pass.name().to_owned(),
                    resource: entry.name().to_owned(),
                    access: usage.access,
                }
                .into());
            }
        }

        let ambiguous = find_ambiguous(pass.consumers()).or_else(|| find_ambiguous(pass.producers()));
        if let Some(resource) = ambiguous {
            return Err(Error::AmbiguousAccess {
                pass: pass.name().to_owned(),
                resource: self.resources.name(resource).to_owned(),
            }
            .into());
        }

        let Some(framebuffer) = pass.framebuffer() else { return Ok(()) };
        for attachment in framebuffer.attachments() {
            let entry = self.resources.entry(attachment.resource)?;
            if entry.resource_type() != ResourceType::Texture {
                return Err(Error::IncompatibleAccess {
                    pass: pass.name().to_owned(),
                    resource: entry.name().to_owned(),
                    access: AccessMode::AttachmentWrite,
                }
                .into());
            }
            if attachment.is_written() && !pass.produces(attachment.resource) {
                return Err(Error::MissingProducer {
                    pass: pass.name().to_owned(),
                    resource: entry.name().to_owned(),
                }
                .into());
            }
        }
        if framebuffer.resolve_render_area(&self.resources).is_none() {
            return Err(Error::UnknownRenderArea(pass.name().to_owned()).into());
        }
        Ok(())
    }

    /// Add a pass to the graph. Passes are scheduled by their declared resources, registration order only breaks ties.
    /// # Errors
    /// - Fails with [`Error::InvalidHandle`] if the pass uses a handle from another frame.
    /// - Fails with [`Error::IncompatibleAccess`] if an access mode does not fit the resource type.
    /// - Fails with [`Error::AmbiguousAccess`] if one declaration list uses a resource with two different modes.
    /// - Fails with [`Error::MissingProducer`] if a written attachment is not declared as a producer.
    /// - Fails with [`Error::UnknownRenderArea`] if the framebuffer has no render area and no attachment of known size.
    pub fn add_pass(&mut self, pass: Pass<'cb, U>) -> Result<()> {
        self.validate(&pass)?;
        trace!(
            "Adding pass `{}` with {} consumer(s) and {} producer(s)",
            pass.name(),
            pass.consumers().len(),
            pass.producers().len()
        );
        self.passes.push(pass);
        Ok(())
    }

    /// Build the dependency graph of the passes currently in this graph.
    pub fn task_graph(&self) -> TaskGraph {
        TaskGraph::new(&self.passes, |handle| self.resources.name(handle).to_owned())
    }

    /// Order the passes, synthesize barriers and bind transient resources.
    /// Transients are only allocated after ordering succeeded, so a cyclic graph allocates nothing.
    /// # Errors
    /// - Fails with [`Error::FrameMismatch`] if the context moved on to another frame.
    /// - Fails with [`Error::CyclicDependency`] if the passes cannot be ordered.
    /// - Fails if the allocator fails. Transients acquired so far are returned to the pool.
    pub fn compile(self, ctx: &mut GraphContext, allocator: &mut dyn TransientAllocator) -> Result<CompiledGraph<'cb, U>> {
        let frame = self.frame();
        ctx.check_frame(frame)?;

        let order = match self.task_graph().execution_order() {
            Ok(order) => order,
            Err(err) => {
                error!("Failed to order frame {}: {}", frame, err);
                return Err(err);
            }
        };

        let RenderGraph {
            mut resources,
            passes,
        } = self;

        let mut slots = passes.into_iter().map(Some).collect::<Vec<_>>();
        let passes = order.iter().filter_map(|&index| slots[index].take()).collect::<Vec<_>>();
        let (barriers, final_states) = synthesize_barriers(&resources, &passes);
        for (pass, barriers) in passes.iter().zip(&barriers) {
            for barrier in barriers {
                trace!(
                    "Barrier before `{}`: `{}` {:?} -> {:?}",
                    pass.name(),
                    resources.name(barrier.resource),
                    barrier.from,
                    barrier.to
                );
            }
        }

        let transients = resources
            .iter()
            .filter(|(handle, _)| passes.iter().any(|pass| uses(pass, *handle)))
            .filter_map(|(handle, entry)| entry.description().map(|description| (handle, *description)))
            .collect::<Vec<_>>();
        for (handle, description) in transients {
            match ctx.pool_mut().acquire(frame, &description, allocator) {
                Ok(physical) => resources.bind_transient(handle, physical),
                Err(err) => {
                    ctx.pool_mut().reclaim(frame);
                    return Err(err);
                }
            }
        }

        let final_states = final_states
            .into_iter()
            .filter_map(|(handle, access)| resources.entry(handle).ok()?.physical().map(|physical| (physical, access)))
            .collect();

        debug!(
            "Compiled frame {}: {} pass(es), {} barrier(s)",
            frame,
            passes.len(),
            barriers.iter().map(Vec::len).sum::<usize>()
        );

        Ok(CompiledGraph {
            resources,
            passes,
            order,
            barriers,
            final_states,
        })
    }
}

fn uses<U>(pass: &Pass<'_, U>, handle: ResourceHandle) -> bool {
    pass.consumes(handle)
        || pass.produces(handle)
        || pass
            .framebuffer()
            .map_or(false, |framebuffer| framebuffer.attachments().any(|attachment| attachment.resource == handle))
}

/// Walk the passes in execution order and track the access mode of every resource. A barrier is emitted whenever
/// the mode a pass needs differs from the tracked mode in a way that requires synchronization.
///
/// Returns the barriers per pass, and the final access mode of every imported resource.
pub(crate) fn synthesize_barriers<U>(
    resources: &ResourceTable,
    passes: &[Pass<'_, U>],
) -> (Vec<Vec<PassResourceBarrier>>, Vec<(ResourceHandle, AccessMode)>) {
    let mut current = resources.iter().map(|(_, entry)| entry.initial_access()).collect::<Vec<_>>();

    let barriers = passes
        .iter()
        .map(|pass| {
            let consumed = pass.consumers().iter().filter(|usage| !pass.produces(usage.resource));
            consumed
                .chain(pass.producers())
                .filter(|usage| usage.access != AccessMode::None)
                .filter_map(|usage| {
                    let state = &mut current[usage.resource.index as usize];
                    let from = *state;
                    *state = usage.access;
                    from.needs_barrier_to(usage.access).then_some(PassResourceBarrier {
                        resource: usage.resource,
                        from,
                        to: usage.access,
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let final_states = resources
        .iter()
        .filter(|(_, entry)| entry.is_imported())
        .map(|(handle, _)| (handle, current[handle.index as usize]))
        .collect();

    (barriers, final_states)
}

impl<'cb, U> CompiledGraph<'cb, U> {
    /// Get the frame this graph was compiled for
    pub fn frame(&self) -> u64 {
        self.resources.frame()
    }

    /// Get the resource table, with all transients bound.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Number of passes in the graph
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    /// Pass names in execution order
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|pass| pass.name())
    }

    /// Registration indices of the passes, in execution order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Barriers emitted before the pass at position `index` of the execution order
    pub fn barriers(&self, index: usize) -> &[PassResourceBarrier] {
        self.barriers.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of barriers in this frame
    pub fn num_barriers(&self) -> usize {
        self.barriers.iter().map(Vec::len).sum()
    }

    /// Access mode each imported resource is left in after this frame
    pub fn final_states(&self) -> &[(PhysicalResource, AccessMode)] {
        &self.final_states
    }
}

/// Trait that allows outputting a graph in graphviz format.
pub trait GraphViz {
    /// Get the string representation of this graph in `dot` format.
    fn dot(&self) -> Result<String>;
}

impl GraphViz for TaskGraph {
    fn dot(&self) -> Result<String> {
        Ok(format!(
            "{}",
            Dot::with_attr_getters(&self.graph, &[], &Self::get_edge_attributes, &Self::get_node_attributes)
        ))
    }
}

impl<U> GraphViz for RenderGraph<'_, U> {
    fn dot(&self) -> Result<String> {
        self.task_graph().dot()
    }
}

impl Display for TaskNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Pass: {}", &self.name))
    }
}

impl Display for TaskEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
