//! Exposes the framegraph error type

use thiserror::Error;

use crate::graph::resource::AccessMode;
use crate::graph::virtual_resource::ResourceHandle;

/// Error type that framegraph can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle was created by another frame's graph, or was never issued.
    #[error("Invalid resource handle `{0:?}`. Handles are only valid within the frame that created them.")]
    InvalidHandle(ResourceHandle),
    /// The same pass declared two different access modes for one resource in the same declaration list.
    #[error("Pass `{pass}` declares conflicting access modes for resource `{resource}`.")]
    AmbiguousAccess {
        /// Name of the offending pass
        pass: String,
        /// Name of the resource
        resource: String,
    },
    /// The dependency graph contains a cycle and is impossible to order.
    #[error("Dependency cycle between passes `{first}` and `{second}`.")]
    CyclicDependency {
        /// First pass on the cycle
        first: String,
        /// Pass that `first` depends on through the cycle
        second: String,
    },
    /// A pass callback reported failure while recording.
    #[error("Recording pass `{pass}` failed: {message}")]
    RecordingFailure {
        /// Name of the failing pass
        pass: String,
        /// Reported failure
        message: String,
    },
    /// The backend executor rejected the finished command stream.
    #[error("Backend rejected the command stream: {0}")]
    SubmissionFailure(String),
    /// A framebuffer attachment is written, but the pass does not declare it as a producer.
    #[error("Pass `{pass}` writes attachment `{resource}` without declaring it as a producer.")]
    MissingProducer {
        /// Name of the offending pass
        pass: String,
        /// Name of the attachment resource
        resource: String,
    },
    /// A framebuffer has no explicit render area and none of its attachments has a known extent.
    #[error("Cannot derive the render area of pass `{0}`. Set it explicitly or import an attachment with its size.")]
    UnknownRenderArea(String),
    /// Framebuffer information was given to a pass that is not a graphics pass.
    #[error("Pass `{0}` is not a graphics pass.")]
    NotAGraphicsPass(String),
    /// Access mode cannot be used on this kind of resource.
    #[error("Pass `{pass}` uses resource `{resource}` as {access:?}, which is not valid for its resource type.")]
    IncompatibleAccess {
        /// Name of the offending pass
        pass: String,
        /// Name of the resource
        resource: String,
        /// Declared access
        access: AccessMode,
    },
    /// Draw commands can only be recorded inside a graphics pass.
    #[error("Tried to record a draw command outside of a graphics pass.")]
    NoRenderpass,
    /// Dispatch commands can only be recorded inside a compute pass.
    #[error("Tried to record a dispatch outside of a compute pass.")]
    NoComputePass,
    /// A graph was handed to a frame context that is on a different frame.
    #[error("Graph belongs to frame {found}, but the context is on frame {expected}.")]
    FrameMismatch {
        /// Frame the context is currently on
        expected: u64,
        /// Frame the graph was created for
        found: u64,
    },
}
