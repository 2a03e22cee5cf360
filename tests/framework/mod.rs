#![allow(dead_code)]

use anyhow::{bail, Result};

use framegraph::prelude::*;

/// Install a logger so `RUST_LOG=trace cargo test` shows what the graph does
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Backend that keeps every submission so tests can inspect the command stream
#[derive(Debug, Default)]
pub struct MockBackend {
    pub submissions: Vec<Submission>,
    pub reject: bool,
    pub retired: Option<u64>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn last(&self) -> &Submission {
        self.submissions.last().expect("test framework: nothing was submitted")
    }
}

impl BackendExecutor for MockBackend {
    fn submit(&mut self, submission: Submission) -> Result<()> {
        if self.reject {
            bail!("device lost");
        }
        self.submissions.push(submission);
        Ok(())
    }

    fn retired_frame(&self) -> Option<u64> {
        self.retired
    }
}

/// Allocator handing out fresh ids, optionally failing after a number of allocations
#[derive(Debug, Default)]
pub struct MockAllocator {
    pub allocations: Vec<ResourceDescription>,
    pub fail_after: Option<usize>,
}

impl MockAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransientAllocator for MockAllocator {
    fn allocate(&mut self, description: &ResourceDescription) -> Result<PhysicalResource> {
        if self.fail_after.map_or(false, |limit| self.allocations.len() >= limit) {
            bail!("out of device memory");
        }
        self.allocations.push(*description);
        let id = 1000 + self.allocations.len() as u64;
        Ok(match description {
            ResourceDescription::Texture(_) => PhysicalResource::Texture(TextureId(id)),
            ResourceDescription::Buffer(_) => PhysicalResource::Buffer(BufferId(id)),
        })
    }
}

/// All barriers in a command stream, in order
pub fn stream_barriers(stream: &CommandList) -> Vec<(PhysicalResource, AccessMode, AccessMode)> {
    stream
        .iter()
        .filter_map(|cmd| match cmd {
            Command::Barrier {
                resource,
                from,
                to,
            } => Some((*resource, *from, *to)),
            _ => None,
        })
        .collect()
}

/// Names of the submitted passes, in execution order
pub fn pass_names(submission: &Submission) -> Vec<&str> {
    submission.passes.iter().map(|pass| pass.name.as_str()).collect()
}

/// A compute pass that only records a dispatch
pub fn dispatch_pass<'cb>(name: &str) -> PassBuilder<'cb, ()> {
    PassBuilder::compute(name).execute_fn(|cmd, _, _| cmd.dispatch(1, 1, 1))
}
