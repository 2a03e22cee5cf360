//! Pool of transient resources, reused across frames.
//!
//! A transient resource is acquired while compiling a frame and released again once that frame has been
//! submitted. Released resources are not handed out right away: the GPU may still be using them. They only become
//! available again after the backend reports that the frame which released them has retired.

use anyhow::Result;
use multimap::MultiMap;

use crate::graph::physical_resource::PhysicalResource;
use crate::graph::resource::ResourceDescription;

/// Backend hook used to create the physical resource behind a transient description.
pub trait TransientAllocator {
    /// Allocate a new physical resource matching the description.
    fn allocate(&mut self, description: &ResourceDescription) -> Result<PhysicalResource>;
}

impl<F> TransientAllocator for F
where
    F: FnMut(&ResourceDescription) -> Result<PhysicalResource>,
{
    fn allocate(&mut self, description: &ResourceDescription) -> Result<PhysicalResource> {
        self(description)
    }
}

/// Transient resource pool. Resources are keyed by their exact description.
#[derive(Debug, Default)]
pub struct TransientPool {
    free: MultiMap<ResourceDescription, PhysicalResource>,
    in_use: MultiMap<u64, (ResourceDescription, PhysicalResource)>,
    retiring: MultiMap<u64, (ResourceDescription, PhysicalResource)>,
    allocated: usize,
}

impl TransientPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a resource for `frame`, reusing a free one with an identical description if possible.
    pub fn acquire(&mut self, frame: u64, description: &ResourceDescription, allocator: &mut dyn TransientAllocator) -> Result<PhysicalResource> {
        let reused = self.free.get_vec_mut(description).and_then(|list| list.pop());
        if self.free.get_vec(description).map_or(false, |list| list.is_empty()) {
            self.free.remove(description);
        }

        let resource = match reused {
            Some(resource) => {
                #[cfg(feature = "log-objects")]
                trace!("Reusing transient {:?} for {:?}", resource, description);
                resource
            }
            None => {
                let resource = allocator.allocate(description)?;
                self.allocated += 1;
                #[cfg(feature = "log-objects")]
                trace!("Allocated new transient {:?} for {:?}", resource, description);
                resource
            }
        };

        self.in_use.insert(frame, (*description, resource));
        Ok(resource)
    }

    /// Release every resource acquired for `frame`. They become reusable after [`TransientPool::retire`] is
    /// called with this frame or a later one.
    pub fn release(&mut self, frame: u64) {
        if let Some(entries) = self.in_use.remove(&frame) {
            #[cfg(feature = "log-objects")]
            trace!("Releasing {} transient resource(s) of frame {}", entries.len(), frame);
            self.retiring.insert_many(frame, entries);
        }
    }

    /// Return the resources acquired for `frame` straight to the free list. Only valid when nothing was
    /// submitted that uses them.
    pub fn reclaim(&mut self, frame: u64) {
        if let Some(entries) = self.in_use.remove(&frame) {
            for (description, resource) in entries {
                self.free.insert(description, resource);
            }
        }
    }

    /// Make all resources released by `frame` or any earlier frame available again.
    pub fn retire(&mut self, frame: u64) {
        let retired = self
            .retiring
            .keys()
            .copied()
            .filter(|&released| released <= frame)
            .collect::<Vec<_>>();
        for released in retired {
            for (description, resource) in self.retiring.remove(&released).into_iter().flatten() {
                #[cfg(feature = "log-objects")]
                trace!("Transient {:?} retired with frame {}", resource, released);
                self.free.insert(description, resource);
            }
        }
    }

    /// Release resources held by any frame before `frame`. Used when a compiled graph was dropped without
    /// being executed.
    pub(crate) fn release_before(&mut self, frame: u64) {
        let stale = self
            .in_use
            .keys()
            .copied()
            .filter(|&acquired| acquired < frame)
            .collect::<Vec<_>>();
        for acquired in stale {
            self.release(acquired);
        }
    }

    /// Number of resources ready to be reused
    pub fn num_free(&self) -> usize {
        self.free.iter_all().map(|(_, list)| list.len()).sum()
    }

    /// Number of resources owned by frames that have not been submitted yet
    pub fn num_in_use(&self) -> usize {
        self.in_use.iter_all().map(|(_, list)| list.len()).sum()
    }

    /// Number of resources waiting for their frame to retire
    pub fn num_retiring(&self) -> usize {
        self.retiring.iter_all().map(|(_, list)| list.len()).sum()
    }

    /// Total number of resources this pool ever requested from an allocator
    pub fn num_allocated(&self) -> usize {
        self.allocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::physical_resource::BufferId;
    use crate::graph::resource::BufferDescription;

    fn counting_allocator(counter: &mut u64) -> impl FnMut(&ResourceDescription) -> Result<PhysicalResource> + '_ {
        move |_: &ResourceDescription| {
            *counter += 1;
            Ok(PhysicalResource::Buffer(BufferId(*counter)))
        }
    }

    #[test]
    fn released_resource_waits_for_retirement() -> Result<()> {
        let mut counter = 0;
        let mut alloc = counting_allocator(&mut counter);
        let mut pool = TransientPool::new();
        let desc = ResourceDescription::Buffer(BufferDescription {
            size: 256,
        });

        let first = pool.acquire(1, &desc, &mut alloc)?;
        pool.release(1);
        assert_eq!(pool.num_retiring(), 1);

        let second = pool.acquire(2, &desc, &mut alloc)?;
        assert_ne!(first, second);
        pool.release(2);

        pool.retire(1);
        let third = pool.acquire(3, &desc, &mut alloc)?;
        assert_eq!(first, third);
        assert_eq!(pool.num_allocated(), 2);
        Ok(())
    }

    #[test]
    fn descriptions_must_match() -> Result<()> {
        let mut counter = 0;
        let mut alloc = counting_allocator(&mut counter);
        let mut pool = TransientPool::new();
        let small = ResourceDescription::Buffer(BufferDescription {
            size: 16,
        });
        let large = ResourceDescription::Buffer(BufferDescription {
            size: 1024,
        });
        pool.acquire(1, &small, &mut alloc)?;
        pool.release(1);
        pool.retire(1);
        pool.acquire(2, &large, &mut alloc)?;
        assert_eq!(pool.num_free(), 1);
        assert_eq!(pool.num_allocated(), 2);
        Ok(())
    }

    #[test]
    fn reclaimed_resources_are_free_immediately() -> Result<()> {
        let mut counter = 0;
        let mut alloc = counting_allocator(&mut counter);
        let mut pool = TransientPool::new();
        let desc = ResourceDescription::Buffer(BufferDescription {
            size: 64,
        });
        pool.acquire(5, &desc, &mut alloc)?;
        pool.reclaim(5);
        assert_eq!(pool.num_in_use(), 0);
        assert_eq!(pool.num_free(), 1);
        Ok(())
    }
}
