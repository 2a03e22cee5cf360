//! Long-lived state shared by all frames.
//!
//! A [`GraphContext`] hands out one [`RenderGraph`] per frame and remembers everything that has to survive
//! between frames: the access mode each tracked imported resource was left in, and the pool of transient resources
//! along with the frames still holding on to them.

use std::collections::HashMap;

use anyhow::Result;

use crate::core::error::Error;
use crate::graph::pass_graph::RenderGraph;
use crate::graph::physical_resource::PhysicalResource;
use crate::graph::resource::AccessMode;
use crate::resource::pool::TransientPool;

/// The default number of frames that may be submitted without having retired.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Frame counter, cross-frame resource states and the transient resource pool.
#[derive(Debug)]
pub struct GraphContext {
    frame: u64,
    frames_in_flight: usize,
    last_retired: Option<u64>,
    states: HashMap<PhysicalResource, AccessMode>,
    pool: TransientPool,
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new(FRAMES_IN_FLIGHT)
    }
}

impl GraphContext {
    /// Create a new context. `frames_in_flight` is the number of submitted frames that are expected to be
    /// unretired at the same time. Going over it is not an error, but is logged since transient resources
    /// cannot be reused in that case.
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frame: 0,
            frames_in_flight,
            last_retired: None,
            states: HashMap::new(),
            pool: TransientPool::new(),
        }
    }

    /// Start a new frame and get an empty graph for it. Handles of previous frames are invalid in this graph.
    pub fn begin_frame<'cb, U>(&mut self) -> RenderGraph<'cb, U> {
        // Transients of a frame that was compiled but never executed are released here.
        self.pool.release_before(self.frame + 1);
        self.frame += 1;
        let pending = (self.frame - 1).saturating_sub(self.last_retired.unwrap_or(0));
        if pending as usize > self.frames_in_flight {
            warn!(
                "Starting frame {} with {} unretired frames in flight (expected at most {}).",
                self.frame, pending, self.frames_in_flight
            );
        }
        RenderGraph::new(self.frame, self.states.clone())
    }

    /// Get the frame number of the graph handed out last. This is zero before the first frame.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Get the access mode a tracked resource was left in by the last successfully submitted frame.
    pub fn tracked_access(&self, resource: PhysicalResource) -> AccessMode {
        self.states.get(&resource).copied().unwrap_or_default()
    }

    /// Stop tracking a resource, for example because it was destroyed.
    pub fn forget(&mut self, resource: PhysicalResource) {
        self.states.remove(&resource);
    }

    /// Notify the context that the GPU finished all work of `frame` and every frame before it.
    /// Transient resources released by those frames become available for reuse.
    pub fn retire_frame(&mut self, frame: u64) {
        if self.last_retired.map_or(false, |last| last >= frame) {
            return;
        }
        trace!("Frame {} retired", frame);
        self.last_retired = Some(frame);
        self.pool.retire(frame);
    }

    /// Last frame reported as retired
    pub fn last_retired(&self) -> Option<u64> {
        self.last_retired
    }

    /// Number of frames expected to be in flight
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Get the transient resource pool
    pub fn pool(&self) -> &TransientPool {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut TransientPool {
        &mut self.pool
    }

    pub(crate) fn check_frame(&self, frame: u64) -> Result<()> {
        if frame != self.frame {
            return Err(Error::FrameMismatch {
                expected: self.frame,
                found: frame,
            }
            .into());
        }
        Ok(())
    }

    /// Finish the bookkeeping of a frame. Transient resources are always released. Final states are only
    /// committed when the frame was actually submitted.
    pub(crate) fn end_frame(&mut self, frame: u64, final_states: Option<&[(PhysicalResource, AccessMode)]>) {
        self.pool.release(frame);
        if let Some(states) = final_states {
            for (resource, access) in states {
                self.states.insert(*resource, *access);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::physical_resource::TextureId;

    #[test]
    fn frames_count_up() {
        let mut ctx = GraphContext::default();
        assert_eq!(ctx.current_frame(), 0);
        let graph = ctx.begin_frame::<()>();
        assert_eq!(graph.frame(), 1);
        let _ = ctx.begin_frame::<()>();
        assert_eq!(ctx.current_frame(), 2);
    }

    #[test]
    fn states_commit_only_on_success() {
        let mut ctx = GraphContext::default();
        let texture = PhysicalResource::Texture(TextureId(3));
        ctx.end_frame(1, None);
        assert_eq!(ctx.tracked_access(texture), AccessMode::None);
        ctx.end_frame(1, Some(&[(texture, AccessMode::SampledRead)]));
        assert_eq!(ctx.tracked_access(texture), AccessMode::SampledRead);
        ctx.forget(texture);
        assert_eq!(ctx.tracked_access(texture), AccessMode::None);
    }

    #[test]
    fn stale_frame_is_rejected() {
        let mut ctx = GraphContext::default();
        let _ = ctx.begin_frame::<()>();
        let err = ctx.check_frame(7).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::FrameMismatch {
                expected: 1,
                found: 7,
            })
        );
    }
}
