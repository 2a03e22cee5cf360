//! The sync module deals with everything between a compiled frame and the GPU.
//!
//! - The [`submission`] module defines what a finished frame looks like, and the [`BackendExecutor`](submission::BackendExecutor)
//! trait that consumes it.
//! - The [`recording`] module selects whether pass callbacks are recorded serially or on a thread pool.

pub mod recording;
pub mod submission;
