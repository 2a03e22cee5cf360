//! Management of graph-owned resources.

pub mod pool;
