//! The contract between a compiled frame and the backend that runs it.

use anyhow::Result;

use crate::command_buffer::state::RenderingInfo;
use crate::command_buffer::CommandList;
use crate::graph::pass::PassKind;

/// Describes one pass of a submission. Passes are listed in execution order, the `index` of the
/// [`Command::BeginPass`](crate::command_buffer::Command::BeginPass) markers in the stream refers to this list.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedPass {
    pub name: String,
    pub kind: PassKind,
    /// Resolved framebuffer, only set for graphics passes that render to attachments.
    pub framebuffer: Option<RenderingInfo>,
    /// Number of barriers emitted in front of this pass.
    pub num_barriers: usize,
}

/// A fully recorded frame, ready to be handed to a GPU queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub frame: u64,
    pub passes: Vec<SubmittedPass>,
    /// Single command stream with barriers, pass markers and recorded commands in execution order.
    pub stream: CommandList,
}

/// Backend that translates submissions into real GPU work.
pub trait BackendExecutor {
    /// Submit a recorded frame. Returning an error means nothing of this frame was executed.
    fn submit(&mut self, submission: Submission) -> Result<()>;

    /// The most recent frame whose work has fully completed on the GPU, if any.
    /// Checked after every submission to recycle transient resources.
    fn retired_frame(&self) -> Option<u64> {
        None
    }
}

impl<F> BackendExecutor for F
where
    F: FnMut(Submission) -> Result<()>,
{
    fn submit(&mut self, submission: Submission) -> Result<()> {
        self(submission)
    }
}
