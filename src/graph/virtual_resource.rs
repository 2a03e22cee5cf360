use std::fmt;

/// Identifies a logical resource inside one frame's graph.
///
/// Handles are small integers handed out in registration order, stamped with the frame that issued
/// them. The index is reused by the next frame, the frame stamp is what makes a stale handle detectable.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceHandle {
    pub(crate) frame: u64,
    pub(crate) index: u32,
}

impl ResourceHandle {
    pub(crate) fn new(frame: u64, index: u32) -> Self {
        Self {
            frame,
            index,
        }
    }

    /// Get the index of this handle in the resource table
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the frame that issued this handle
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({}@frame{})", self.index, self.frame)
    }
}
