//! Common imports: `use frumgerd::prelude::*`.

pub use crate::capability;
pub use crate::ecs::{
    Capability, ComponentData, Entity, EntityData, EntityGraph, EntityId, EntityMut, EntityRef, GraphEvent,
};
pub use crate::error::{GraphError, TemplateError};
pub use crate::math::{Mat4, Quat, Transform, Vec3};
#[cfg(feature = "fs")]
pub use crate::template::DirBlobStore;
pub use crate::template::{BlobStore, MemoryBlobStore, PersistentData, TemplateStore};
