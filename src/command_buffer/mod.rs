//! Backend-agnostic command lists.
//!
//! Pass callbacks never talk to a graphics API directly. Instead they record [`Command`]s into an
//! [`IncompleteCommandList`], which is turned into a [`CommandList`] once the callback returns. The graph
//! then splices the lists of all passes together, in execution order and interleaved with the synthesized
//! barriers, into a single stream for the backend executor.
//!
//! A [`CommandList`] is a linked list, so splicing a pass onto the frame stream is O(1) no matter how many
//! commands the pass recorded.

use std::collections::linked_list;
use std::collections::LinkedList;

use crate::command_buffer::state::{IndexType, Rect2D, RenderingInfo, Viewport};
use crate::graph::pass::PassKind;
use crate::graph::physical_resource::{PhysicalResource, ResourceTable};
use crate::graph::resource::AccessMode;

pub mod incomplete;
pub mod state;

/// A single backend-agnostic command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Marks the start of a pass. The index refers to the pass list of the submission.
    BeginPass { index: usize, kind: PassKind },
    /// Marks the end of a pass.
    EndPass { index: usize },
    /// Begin rendering to the framebuffer of a graphics pass.
    BeginRenderPass(RenderingInfo),
    EndRenderPass,
    /// Debug label, only emitted with the `debug-markers` feature.
    BeginLabel { name: String, color: [f32; 4] },
    EndLabel,
    /// Transition a resource from one access mode to another.
    Barrier {
        resource: PhysicalResource,
        from: AccessMode,
        to: AccessMode,
    },
    BindGraphicsPipeline(String),
    BindComputePipeline(String),
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindResource {
        set: u32,
        binding: u32,
        resource: PhysicalResource,
    },
    BindVertexBuffer { binding: u32, buffer: PhysicalResource },
    BindIndexBuffer { buffer: PhysicalResource, ty: IndexType },
    PushConstants { offset: u32, data: Vec<u8> },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch { x: u32, y: u32, z: u32 },
    Copy { src: PhysicalResource, dst: PhysicalResource },
}

/// Append-only list of commands.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandList {
    commands: LinkedList<Command>,
}

impl CommandList {
    /// Create an empty command list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single command.
    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Move all commands of `other` to the end of this list, leaving `other` empty. This is O(1).
    pub fn append(&mut self, other: &mut CommandList) {
        self.commands.append(&mut other.commands);
    }

    /// Number of commands in the list
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over the commands in recording order
    pub fn iter(&self) -> linked_list::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Drop all commands.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl IntoIterator for CommandList {
    type Item = Command;
    type IntoIter = linked_list::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = linked_list::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl FromIterator<Command> for CommandList {
    fn from_iter<T: IntoIterator<Item = Command>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

/// Command list that is still being recorded by a pass callback. Obtain the finished list with
/// [`IncompleteCommandList::finish`].
#[derive(Debug)]
pub struct IncompleteCommandList<'r> {
    pub(crate) commands: CommandList,
    pub(crate) kind: PassKind,
    pub(crate) render_area: Option<Rect2D>,
    pub(crate) resources: &'r ResourceTable,
}

static_assertions::assert_impl_all!(CommandList: Send, Sync);
