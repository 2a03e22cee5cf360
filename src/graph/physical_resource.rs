//! The resource handle table of a single frame.
//!
//! Every resource a pass touches must be registered here first, either by importing an externally owned
//! resource with its current access mode, or by creating a transient resource that the graph allocates
//! for the duration of the frame.

use std::collections::HashMap;

use anyhow::Result;

use crate::core::error::Error;
use crate::graph::resource::{AccessMode, ResourceDescription, ResourceType};
use crate::graph::virtual_resource::ResourceHandle;

/// Opaque id of a backend texture.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Opaque id of a backend buffer.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Describes any physical resource handle on the GPU. The graph never looks inside these.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PhysicalResource {
    Texture(TextureId),
    Buffer(BufferId),
}

impl PhysicalResource {
    /// Get the resource type of this physical resource
    pub fn resource_type(&self) -> ResourceType {
        match self {
            PhysicalResource::Texture(_) => ResourceType::Texture,
            PhysicalResource::Buffer(_) => ResourceType::Buffer,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ResourceOrigin {
    Imported {
        physical: PhysicalResource,
        initial_access: AccessMode,
        extent: Option<(u32, u32)>,
    },
    Transient {
        description: ResourceDescription,
        physical: Option<PhysicalResource>,
    },
}

/// One entry in the resource table.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub(crate) name: String,
    pub(crate) ty: ResourceType,
    pub(crate) origin: ResourceOrigin,
}

impl ResourceEntry {
    /// Get the debug name of this resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the resource type
    pub fn resource_type(&self) -> ResourceType {
        self.ty
    }

    /// Whether this resource is owned outside of the graph.
    pub fn is_imported(&self) -> bool {
        matches!(self.origin, ResourceOrigin::Imported { .. })
    }

    /// Access mode the resource is in before the first pass of the frame touches it.
    pub fn initial_access(&self) -> AccessMode {
        match &self.origin {
            ResourceOrigin::Imported {
                initial_access,
                ..
            } => *initial_access,
            ResourceOrigin::Transient {
                ..
            } => AccessMode::None,
        }
    }

    /// Get the physical resource, if one is bound already.
    pub fn physical(&self) -> Option<PhysicalResource> {
        match &self.origin {
            ResourceOrigin::Imported {
                physical,
                ..
            } => Some(*physical),
            ResourceOrigin::Transient {
                physical,
                ..
            } => *physical,
        }
    }

    /// Width and height of a texture, if known. Transient textures take it from their description, imported
    /// textures only have one when imported with [`ResourceTable::import_texture`].
    pub fn extent(&self) -> Option<(u32, u32)> {
        match &self.origin {
            ResourceOrigin::Imported {
                extent,
                ..
            } => *extent,
            ResourceOrigin::Transient {
                description: ResourceDescription::Texture(texture),
                ..
            } => Some((texture.width, texture.height)),
            ResourceOrigin::Transient {
                ..
            } => None,
        }
    }

    /// Get the transient description, if this is a transient resource.
    pub fn description(&self) -> Option<&ResourceDescription> {
        match &self.origin {
            ResourceOrigin::Imported {
                ..
            } => None,
            ResourceOrigin::Transient {
                description,
                ..
            } => Some(description),
        }
    }
}

/// Maps the handles of one frame to their resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    frame: u64,
    entries: Vec<ResourceEntry>,
    known_states: HashMap<PhysicalResource, AccessMode>,
}

impl ResourceTable {
    /// Create an empty resource table for a frame. `known_states` holds the access mode each imported resource
    /// was left in by the previous frame.
    pub fn new(frame: u64, known_states: HashMap<PhysicalResource, AccessMode>) -> Self {
        Self {
            frame,
            entries: vec![],
            known_states,
        }
    }

    fn push(&mut self, entry: ResourceEntry) -> ResourceHandle {
        let handle = ResourceHandle::new(self.frame, self.entries.len() as u32);
        self.entries.push(entry);
        handle
    }

    fn push_imported(
        &mut self,
        name: String,
        physical: PhysicalResource,
        access: AccessMode,
        extent: Option<(u32, u32)>,
    ) -> ResourceHandle {
        trace!("Importing resource `{}` ({:?}) in state {:?}", name, physical, access);
        self.push(ResourceEntry {
            name,
            ty: physical.resource_type(),
            origin: ResourceOrigin::Imported {
                physical,
                initial_access: access,
                extent,
            },
        })
    }

    /// Register an externally owned resource together with the access mode it is currently in.
    pub fn import(&mut self, name: impl Into<String>, physical: PhysicalResource, access: AccessMode) -> ResourceHandle {
        self.push_imported(name.into(), physical, access, None)
    }

    /// Register an externally owned texture of known size, so that framebuffers using it as an attachment can
    /// derive their render area from it.
    pub fn import_texture(
        &mut self,
        name: impl Into<String>,
        texture: TextureId,
        width: u32,
        height: u32,
        access: AccessMode,
    ) -> ResourceHandle {
        self.push_imported(name.into(), PhysicalResource::Texture(texture), access, Some((width, height)))
    }

    /// Register an externally owned resource in the state the last submitted frame left it in.
    /// Resources never seen before start out in [`AccessMode::None`].
    pub fn import_tracked(&mut self, name: impl Into<String>, physical: PhysicalResource) -> ResourceHandle {
        let access = self.known_states.get(&physical).copied().unwrap_or_default();
        self.import(name, physical, access)
    }

    /// Reserve a resource that will be backed by graph-owned memory for the duration of this frame.
    pub fn create_transient(&mut self, name: impl Into<String>, description: impl Into<ResourceDescription>) -> ResourceHandle {
        let description = description.into();
        self.push(ResourceEntry {
            name: name.into(),
            ty: description.resource_type(),
            origin: ResourceOrigin::Transient {
                description,
                physical: None,
            },
        })
    }

    /// Look up the entry for a handle.
    /// # Errors
    /// - Fails with [`Error::InvalidHandle`] if the handle was not issued by this table.
    pub fn entry(&self, handle: ResourceHandle) -> Result<&ResourceEntry> {
        if handle.frame != self.frame {
            return Err(Error::InvalidHandle(handle).into());
        }
        self.entries
            .get(handle.index as usize)
            .ok_or_else(|| Error::InvalidHandle(handle).into())
    }

    /// Resolve a handle to the physical resource backing it. Meant for pass callbacks during execution.
    /// # Errors
    /// - Fails with [`Error::InvalidHandle`] if the handle does not belong to this frame, or if the transient
    ///   resource behind it was never allocated.
    pub fn resolve(&self, handle: ResourceHandle) -> Result<PhysicalResource> {
        self.entry(handle)?
            .physical()
            .ok_or_else(|| Error::InvalidHandle(handle).into())
    }

    /// Get the debug name of a resource, or a placeholder for invalid handles.
    pub fn name(&self, handle: ResourceHandle) -> &str {
        self.entry(handle).map(|entry| entry.name()).unwrap_or("<invalid>")
    }

    /// Get the frame this table belongs to
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resources are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all handles and their entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceHandle, &ResourceEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (ResourceHandle::new(self.frame, index as u32), entry))
    }

    pub(crate) fn bind_transient(&mut self, handle: ResourceHandle, resource: PhysicalResource) {
        if let Some(ResourceEntry {
            origin: ResourceOrigin::Transient {
                physical,
                ..
            },
            ..
        }) = self.entries.get_mut(handle.index as usize)
        {
            *physical = Some(resource);
        }
    }
}

static_assertions::assert_impl_all!(ResourceTable: Send, Sync);
