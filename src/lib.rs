//! Backend-agnostic frame graph
//!
//! `framegraph` schedules the work of a single rendered frame. Instead of ordering GPU passes and inserting
//! synchronization by hand, each pass declares the resources it reads and writes. The graph derives a valid execution
//! order, synthesizes the minimal set of access transitions (barriers) between passes, records every pass into its
//! own command list, possibly in parallel, and hands one spliced command stream to a backend.
//!
//! The crate never talks to a graphics API. Physical resources are opaque ids, commands are plain data, and the
//! backend is anything implementing [`BackendExecutor`].
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import types under a namespace.
//! use framegraph::prelude as fg;
//!
//! // Or, if you dont care about using the types under a namespace
//! use framegraph::prelude::*;
//! ```
//!
//! See the [`graph`] module for a complete example.
//!
//! # Features
//!
//! - `debug-markers` (default): wrap the commands of every pass in debug labels.
//! - `rayon` (default): allow recording passes in parallel with [`Recording::Parallel`].
//! - `log-objects`: trace every transient resource allocation, reuse and release.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod command_buffer;
pub mod core;
pub mod graph;
pub mod resource;
pub mod sync;
