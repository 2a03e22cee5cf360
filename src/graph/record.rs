//! Recording and submitting a compiled graph.
//!
//! Every pass records into its own [`CommandList`], either serially or on a thread pool. Once all passes are
//! recorded, the lists are spliced together in execution order, each preceded by its barriers and wrapped in pass
//! markers. The resulting stream is handed to the backend as a single [`Submission`].

use anyhow::Result;

use crate::command_buffer::state::{RenderingAttachmentInfo, RenderingInfo};
use crate::command_buffer::{Command, CommandList, IncompleteCommandList};
use crate::core::context::GraphContext;
use crate::core::error::Error;
use crate::graph::pass::{AttachmentInfo, Pass, PassContext, PassKind};
use crate::graph::pass_graph::CompiledGraph;
use crate::graph::physical_resource::ResourceTable;
use crate::sync::recording::Recording;
use crate::sync::submission::{BackendExecutor, SubmittedPass, Submission};

/// Summary of a successfully submitted frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub passes: usize,
    pub barriers: usize,
    /// Number of commands in the submitted stream, including barriers and markers.
    pub commands: usize,
}

fn resolve_attachment(attachment: &AttachmentInfo, resources: &ResourceTable) -> Result<RenderingAttachmentInfo> {
    Ok(RenderingAttachmentInfo {
        resource: resources.resolve(attachment.resource)?,
        load_op: attachment.load_op,
        store_op: attachment.store_op,
    })
}

fn rendering_info<U>(pass: &Pass<'_, U>, resources: &ResourceTable) -> Result<Option<RenderingInfo>> {
    if pass.kind() != PassKind::Graphics {
        return Ok(None);
    }
    let Some(framebuffer) = pass.framebuffer() else { return Ok(None) };
    let render_area = framebuffer
        .resolve_render_area(resources)
        .ok_or_else(|| Error::UnknownRenderArea(pass.name().to_owned()))?;
    Ok(Some(RenderingInfo {
        render_area,
        color_attachments: framebuffer
            .color_attachments
            .iter()
            .map(|attachment| resolve_attachment(attachment, resources))
            .collect::<Result<Vec<_>>>()?,
        depth_attachment: framebuffer
            .depth_attachment
            .as_ref()
            .map(|attachment| resolve_attachment(attachment, resources))
            .transpose()?,
    }))
}

fn record_pass<U>(pass: &mut Pass<'_, U>, resources: &ResourceTable, user_data: &U) -> Result<CommandList> {
    let render_area = match pass.kind() {
        PassKind::Graphics => pass.framebuffer().and_then(|fb| fb.resolve_render_area(resources)),
        PassKind::Compute => None,
    };
    let cmd = IncompleteCommandList::new(pass.kind, render_area, resources);
    let ctx = PassContext {
        name: &pass.name,
        kind: pass.kind,
        resources,
    };
    pass.execute
        .execute(cmd, &ctx, user_data)
        .map(IncompleteCommandList::finish)
        .map_err(|err| {
            anyhow::Error::from(Error::RecordingFailure {
                pass: pass.name.clone(),
                message: format!("{err:#}"),
            })
        })
}

fn record_serial<U>(passes: &mut [Pass<'_, U>], resources: &ResourceTable, user_data: &U) -> Result<Vec<CommandList>> {
    passes
        .iter_mut()
        .map(|pass| record_pass(pass, resources, user_data))
        .collect()
}

#[cfg(feature = "rayon")]
fn record_parallel<U: Sync>(
    passes: &mut [Pass<'_, U>],
    resources: &ResourceTable,
    user_data: &U,
    pool: &rayon::ThreadPool,
) -> Result<Vec<CommandList>> {
    use rayon::prelude::*;

    // Every pass is recorded even if an earlier one fails, the first failure in execution order is reported.
    let lists = pool.install(|| {
        passes
            .par_iter_mut()
            .map(|pass| record_pass(pass, resources, user_data))
            .collect::<Vec<_>>()
    });
    lists.into_iter().collect()
}

#[cfg(feature = "debug-markers")]
fn annotate_pass<U>(pass: &Pass<'_, U>, stream: &mut CommandList) {
    stream.push(Command::BeginLabel {
        name: pass.name().to_owned(),
        color: pass.color.unwrap_or([1.0, 1.0, 1.0, 1.0]),
    });
}

#[cfg(not(feature = "debug-markers"))]
fn annotate_pass<U>(_: &Pass<'_, U>, _: &mut CommandList) {}

#[cfg(feature = "debug-markers")]
fn end_annotation(stream: &mut CommandList) {
    stream.push(Command::EndLabel);
}

#[cfg(not(feature = "debug-markers"))]
fn end_annotation(_: &mut CommandList) {}

impl<'cb, U: Sync> CompiledGraph<'cb, U> {
    fn record(&mut self, recording: Recording<'_>, user_data: &U) -> Result<Vec<CommandList>> {
        match recording {
            #[cfg(feature = "rayon")]
            Recording::Parallel(pool) => record_parallel(&mut self.passes, &self.resources, user_data, pool),
            _ => record_serial(&mut self.passes, &self.resources, user_data),
        }
    }

    fn build_submission(&self, lists: Vec<CommandList>) -> Result<Submission> {
        let mut stream = CommandList::new();
        let mut passes = Vec::with_capacity(self.passes.len());
        for (index, (pass, mut commands)) in self.passes.iter().zip(lists).enumerate() {
            let framebuffer = rendering_info(pass, &self.resources)?;
            let barriers = &self.barriers[index];

            stream.push(Command::BeginPass {
                index,
                kind: pass.kind(),
            });
            annotate_pass(pass, &mut stream);
            for barrier in barriers {
                stream.push(Command::Barrier {
                    resource: self.resources.resolve(barrier.resource)?,
                    from: barrier.from,
                    to: barrier.to,
                });
            }
            if let Some(info) = &framebuffer {
                stream.push(Command::BeginRenderPass(info.clone()));
            }
            stream.append(&mut commands);
            if framebuffer.is_some() {
                stream.push(Command::EndRenderPass);
            }
            end_annotation(&mut stream);
            stream.push(Command::EndPass {
                index,
            });

            passes.push(SubmittedPass {
                name: pass.name().to_owned(),
                kind: pass.kind(),
                framebuffer,
                num_barriers: barriers.len(),
            });
        }

        Ok(Submission {
            frame: self.frame(),
            passes,
            stream,
        })
    }

    fn submit_frame(
        &mut self,
        ctx: &mut GraphContext,
        executor: &mut dyn BackendExecutor,
        recording: Recording<'_>,
        user_data: &U,
    ) -> Result<FrameStats> {
        let frame = self.frame();
        ctx.check_frame(frame)?;

        let submission = self
            .record(recording, user_data)
            .and_then(|lists| self.build_submission(lists));
        let submission = match submission {
            Ok(submission) => submission,
            Err(err) => {
                error!("Frame {} was not submitted: {}", frame, err);
                ctx.end_frame(frame, None);
                return Err(err);
            }
        };

        let stats = FrameStats {
            frame,
            passes: submission.passes.len(),
            barriers: self.num_barriers(),
            commands: submission.stream.len(),
        };

        if let Err(err) = executor.submit(submission) {
            error!("Backend rejected frame {}: {:#}", frame, err);
            ctx.end_frame(frame, None);
            return Err(Error::SubmissionFailure(format!("{err:#}")).into());
        }

        ctx.end_frame(frame, Some(&self.final_states));
        info!(
            "Submitted frame {}: {} pass(es), {} barrier(s), {} command(s)",
            stats.frame, stats.passes, stats.barriers, stats.commands
        );
        Ok(stats)
    }

    /// Record every pass, splice the results into one command stream and hand it to the backend.
    ///
    /// Whatever the outcome, the transient resources of this frame are released to the pool afterwards, and the
    /// frames the backend reports as finished are retired. The access modes of imported resources are only
    /// committed to the context if the backend accepted the frame.
    /// # Errors
    /// - Fails with [`Error::FrameMismatch`] if the context moved on to another frame.
    /// - Fails with [`Error::RecordingFailure`] if a pass callback fails. Nothing is submitted in that case.
    /// - Fails with [`Error::SubmissionFailure`] if the backend rejects the stream.
    pub fn execute(
        mut self,
        ctx: &mut GraphContext,
        executor: &mut dyn BackendExecutor,
        recording: Recording<'_>,
        user_data: &U,
    ) -> Result<FrameStats> {
        let result = self.submit_frame(ctx, executor, recording, user_data);
        if let Some(retired) = executor.retired_frame() {
            ctx.retire_frame(retired);
        }
        result
    }
}
