//! Selects how pass callbacks are run while recording a frame.

use std::marker::PhantomData;

/// Recording strategy for [`CompiledGraph::execute`](crate::CompiledGraph::execute).
///
/// Recording order never affects the final command stream: each pass records into its own list, and the lists are
/// spliced together in execution order afterwards.
#[derive(Debug, Default, Copy, Clone)]
pub enum Recording<'p> {
    /// Record every pass on the calling thread, in execution order. Stops at the first failing pass.
    #[default]
    Serial,
    /// Record all passes concurrently on a rayon thread pool.
    #[cfg(feature = "rayon")]
    Parallel(&'p rayon::ThreadPool),
    /// Dummy variant to allow the lifetime parameter without the `rayon` feature
    #[doc(hidden)]
    _Unreachable(PhantomData<&'p ()>),
}

impl<'p> Recording<'p> {
    /// Whether pass callbacks may run concurrently
    pub fn is_parallel(&self) -> bool {
        match self {
            Recording::Serial => false,
            #[cfg(feature = "rayon")]
            Recording::Parallel(_) => true,
            Recording::_Unreachable(_) => false,
        }
    }
}
