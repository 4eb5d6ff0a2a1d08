//! # Entity Hierarchies — Navigation and Poses
//!
//! [`EntityRef`] and [`EntityMut`] bind an id to the graph that owns it. They
//! work against any record type through [`EntityData`], so navigation and the
//! mutation helpers never need to know the concrete schema.
//!
//! ## Usage
//!
//! ```ignore
//! let group = graph.add(Entity::new().with_transform(Transform::IDENTITY.with_yaw(FRAC_PI_2)))?;
//! let child = graph
//!     .entity_mut(&group)?
//!     .add_child(Entity::new().with_transform(Transform::from_xyz(1.0, 0.0, 0.0)), Entity::attach_child)?;
//!
//! // Global poses are computed on demand by walking the parent chain.
//! let pose = graph.entity(&child)?.global_pose(); // position ≈ (0, 0, -1)
//! ```
//!
//! ## Pose Composition
//!
//! - Roots (no parent) have `global == local`.
//! - Children get `global = parent_global * child_local`.
//! - An absent local transform counts as identity.
//!
//! Nothing is cached: a pose is always consistent with the current records.

use super::entity::{Capability, EntityData, EntityId};
use super::graph::EntityGraph;
use crate::error::GraphError;
use crate::math::{Mat4, Transform, compose};
use crate::template::{BlobStore, PersistentData};

/// Read-only view of one live entity.
pub struct EntityRef<'g, T, B> {
    graph: &'g EntityGraph<T, B>,
    id: EntityId,
}

/// Mutable view of one live entity.
pub struct EntityMut<'g, T, B> {
    graph: &'g mut EntityGraph<T, B>,
    id: EntityId,
}

impl<T: EntityData, B: BlobStore> EntityGraph<T, B> {
    pub fn entity(&self, id: &EntityId) -> Result<EntityRef<'_, T, B>, GraphError> {
        self.try_get(id)?;
        Ok(EntityRef {
            graph: self,
            id: id.clone(),
        })
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Result<EntityMut<'_, T, B>, GraphError> {
        self.try_get(id)?;
        Ok(EntityMut {
            graph: self,
            id: id.clone(),
        })
    }
}

impl<'g, T: EntityData, B: BlobStore> EntityRef<'g, T, B> {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// The record behind this view. Views exist only for live ids and borrow
    /// the graph, so the record is always present.
    pub fn data(&self) -> &'g T {
        self.graph
            .get(&self.id)
            .unwrap_or_else(|| unreachable!("view outlived entity {}", self.id))
    }

    pub fn name(&self) -> Option<&'g str> {
        self.data().name()
    }

    fn view(&self, id: &EntityId) -> EntityRef<'g, T, B> {
        EntityRef {
            graph: self.graph,
            id: id.clone(),
        }
    }

    pub fn parent(&self) -> Option<EntityRef<'g, T, B>> {
        self.graph.parent_of(&self.id).map(|p| self.view(p))
    }

    /// The children in list order, or `None` if the record has no child list
    /// at all (as opposed to an empty one).
    pub fn children(&self) -> Option<Vec<EntityRef<'g, T, B>>> {
        let ids = self.data().child_ids()?;
        Some(
            ids.iter()
                .filter(|id| self.graph.contains(id))
                .map(|id| self.view(id))
                .collect(),
        )
    }

    pub fn first_child(&self) -> Option<EntityRef<'g, T, B>> {
        self.children()?.into_iter().next()
    }

    pub fn last_child(&self) -> Option<EntityRef<'g, T, B>> {
        self.children()?.pop()
    }

    /// The single child called `name`.
    pub fn child(&self, name: &str) -> Result<EntityRef<'g, T, B>, GraphError> {
        let mut matches: Vec<_> = self
            .children()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.name() == Some(name))
            .collect();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(GraphError::NoSuchChild {
                parent: self.id.clone(),
                name: name.to_string(),
            }),
            n => Err(GraphError::AmbiguousChild {
                parent: self.id.clone(),
                name: name.to_string(),
                matches: n,
            }),
        }
    }

    /// The other children of this entity's parent, in list order.
    pub fn siblings(&self) -> Vec<EntityRef<'g, T, B>> {
        self.parent()
            .and_then(|p| p.children())
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.id != self.id)
            .collect()
    }

    pub fn component<V: Capability<T::Component>>(&self) -> Result<&'g V, GraphError> {
        self.data().component::<V>()
    }

    /// Local matrix composed with every ancestor's, parent first.
    pub fn global_matrix(&self) -> Mat4 {
        let parent_global = self.parent().map(|p| p.global_matrix());
        compose(self.data().local_transform(), parent_global)
    }

    pub fn global_pose(&self) -> Transform {
        Transform::from_matrix(self.global_matrix())
    }

    /// The local transform decomposed, without walking the parents.
    pub fn local_pose(&self) -> Transform {
        self.data()
            .local_transform()
            .map_or(Transform::IDENTITY, Transform::from_matrix)
    }
}

impl<T: EntityData, B: BlobStore> EntityMut<'_, T, B> {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Borrow as a read-only view for navigation.
    pub fn as_readonly(&self) -> EntityRef<'_, T, B> {
        EntityRef {
            graph: &*self.graph,
            id: self.id.clone(),
        }
    }

    pub fn data(&self) -> &T {
        self.as_readonly().data()
    }

    /// Edit a copy of the record and store it back.
    pub fn modify(&mut self, edit: impl FnOnce(&mut T)) -> Result<(), GraphError> {
        let mut record = self.graph.try_get(&self.id)?.clone();
        edit(&mut record);
        self.graph.update(record)
    }

    pub fn add_child<F>(&mut self, child: T, attach: F) -> Result<EntityId, GraphError>
    where
        F: FnOnce(T, &EntityId) -> T,
    {
        self.graph.add_child(&self.id, child, attach)
    }

    pub fn remove_from_parent<F>(&mut self, detach: F) -> Result<(), GraphError>
    where
        F: FnMut(T, &EntityId) -> T,
    {
        self.graph.remove_from_parent(&self.id, detach)
    }

    /// Destroy this entity and its subtree. Consumes the view.
    pub fn destroy<F>(self, detach: F) -> bool
    where
        F: FnMut(T, &EntityId) -> T,
    {
        self.graph.destroy(&self.id, detach)
    }
}

impl<T: PersistentData, B: BlobStore> EntityMut<'_, T, B> {
    /// See [`EntityGraph::save_changes`].
    pub fn save_changes(&mut self) -> Result<(), GraphError> {
        self.graph.save_changes(&self.id)
    }

    /// See [`EntityGraph::create_variant`].
    pub fn create_variant<A, D>(&mut self, attach: A, detach: D) -> Result<EntityId, GraphError>
    where
        A: FnMut(T, &EntityId) -> T,
        D: FnMut(T, &EntityId) -> T,
    {
        self.graph.create_variant(&self.id, attach, detach)
    }
}
