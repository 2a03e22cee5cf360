//! The frame graph derives pass order and synchronization from declared resource usage.
//!
//! Each frame starts with a [`RenderGraph`](pass_graph::RenderGraph) obtained from a [`GraphContext`](crate::GraphContext).
//! Resources are registered on it first, either imported from outside with the access mode they are currently in, or
//! created as transients that the graph backs with pooled memory. Passes then declare which of these handles they
//! consume and which they produce, and with which [`AccessMode`](resource::AccessMode).
//!
//! Compiling the graph orders the passes so that every producer runs before its consumers, and computes the barriers
//! needed between them. Executing the compiled graph records all pass callbacks, splices their commands into one stream
//! and hands it to a [`BackendExecutor`](crate::BackendExecutor).
//!
//! Through the [`GraphViz`](pass_graph::GraphViz) trait, it's possible to export a graphviz-compatible dot file to display the
//! dependency graph.
//!
//! # Example
//!
//! ```
//! use framegraph::prelude::*;
//!
//! let mut ctx = GraphContext::default();
//! let mut graph = ctx.begin_frame::<()>();
//! let backbuffer = graph.import("backbuffer", PhysicalResource::Texture(TextureId(0)), AccessMode::None);
//! let particles = graph.create_transient("particles", BufferDescription { size: 4096 });
//!
//! graph.add_pass(
//!     PassBuilder::compute("simulate")
//!         .produce(particles, AccessMode::StorageWrite)
//!         .execute_fn(move |cmd, _, _| {
//!             cmd.bind_compute_pipeline("simulate")?
//!                .bind_resource(0, 0, particles)?
//!                .dispatch(64, 1, 1)
//!         })
//!         .build(),
//! )?;
//! graph.add_pass(
//!     PassBuilder::graphics("draw")
//!         .load_color_attachment(backbuffer)?
//!         .consume(particles, AccessMode::VertexRead)
//!         .produce(backbuffer, AccessMode::AttachmentWrite)
//!         .render_area(Rect2D { x: 0, y: 0, width: 800, height: 600 })?
//!         .execute_fn(move |cmd, _, _| {
//!             cmd.full_viewport_scissor()?
//!                .bind_graphics_pipeline("particles")?
//!                .bind_vertex_buffer(0, particles)?
//!                .draw(4, 1024, 0, 0)
//!         })
//!         .build(),
//! )?;
//!
//! let mut next_id = 100;
//! let mut allocator = |_: &ResourceDescription| -> anyhow::Result<PhysicalResource> {
//!     next_id += 1;
//!     Ok(PhysicalResource::Buffer(BufferId(next_id)))
//! };
//! let compiled = graph.compile(&mut ctx, &mut allocator)?;
//! assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["simulate", "draw"]);
//!
//! let mut backend = |_: Submission| -> anyhow::Result<()> { Ok(()) };
//! let stats = compiled.execute(&mut ctx, &mut backend, Recording::Serial, &())?;
//! assert_eq!(stats.passes, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For more complex passes, see the [`pass`] module documentation.

pub mod pass;
pub mod pass_graph;
pub mod physical_resource;
pub mod record;
pub mod resource;
pub mod task_graph;
pub mod virtual_resource;
