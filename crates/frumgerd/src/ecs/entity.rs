//! # Entity Records — Identity, Pose, Components, Children
//!
//! An entity is a plain value: an id, an optional name, an optional link to the
//! template it came from, an optional local transform, a list of components,
//! and an ordered list of child ids. The [`EntityGraph`](super::EntityGraph)
//! stores these values by id; it never hands out long-lived mutable aliases, so
//! a record you hold is a snapshot. Re-fetch after any update.
//!
//! ## Generic Over the Record Shape
//!
//! The graph and the template store only talk to records through the
//! [`EntityData`] trait. [`Entity<C>`] is the stock implementation, generic
//! over a component type `C` (typically an enum of all component kinds).
//!
//! ## Capabilities Instead of Runtime Type Checks
//!
//! Components are looked up by *capability*: "the component that is an
//! `Enemy`". A capability is any type implementing [`Capability<C>`], which
//! knows how to project itself out of the component type. For enum component
//! types the [`capability!`](crate::capability) macro writes the projection.
//!
//! ```text
//! enum Part { Enemy(Enemy), Sword(Sword) }
//! capability!(Part::Enemy => Enemy, Part::Sword => Sword);
//!
//! entity.component::<Enemy>()?.health
//! ```
//!
//! Lookups demand exactly one match. Zero or several is an error, never a
//! silent pick.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::math::Mat4;

/// Opaque, immutable entity identifier.
///
/// Ids are strings so they can double as blob-store keys. Fresh ids are ULIDs,
/// which sort by creation time.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique id.
    pub fn fresh() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id means "not assigned yet".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A component value. Its id must be unique within the owning entity; the
/// template store matches components across a template chain by this id.
pub trait ComponentData {
    fn id(&self) -> &str;
}

/// Projects a capability `Self` out of a component value of type `C`.
pub trait Capability<C>: Sized + 'static {
    fn from_component(component: &C) -> Option<&Self>;
    fn from_component_mut(component: &mut C) -> Option<&mut Self>;
}

/// Implement [`Capability`] for enum variants that wrap a single value.
///
/// ```ignore
/// capability!(Part::Enemy => Enemy, Part::Sword => Sword);
/// ```
#[macro_export]
macro_rules! capability {
    ($($component:ident :: $variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl $crate::ecs::Capability<$component> for $ty {
                fn from_component(component: &$component) -> Option<&Self> {
                    match component {
                        $component::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_component_mut(component: &mut $component) -> Option<&mut Self> {
                    match component {
                        $component::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )+
    };
}

/// The record shape the graph and the template store work against.
///
/// `child_ids` returning `None` ("no child list") is distinct from returning an
/// empty slice. The graph never edits the child list itself; callers pass
/// reducers of the form `(parent, child_id) -> parent` instead.
///
/// The `*_FIELD` constants name the serialized keys that the template store
/// treats specially when diffing. Override them if the record renames those
/// fields through serde attributes.
pub trait EntityData: Clone {
    type Component: ComponentData;

    const ID_FIELD: &'static str = "id";
    const TEMPLATE_FIELD: &'static str = "template_id";
    const COMPONENTS_FIELD: &'static str = "components";

    fn id(&self) -> &EntityId;
    fn set_id(&mut self, id: EntityId);
    fn name(&self) -> Option<&str>;
    /// The template this record was derived from. `None` marks a chain root.
    fn template_id(&self) -> Option<&EntityId>;
    fn set_template_id(&mut self, template_id: Option<EntityId>);
    /// Local-space transform. `None` means identity.
    fn local_transform(&self) -> Option<Mat4>;
    fn components(&self) -> &[Self::Component];
    fn components_mut(&mut self) -> &mut [Self::Component];
    fn child_ids(&self) -> Option<&[EntityId]>;

    /// The single component with capability `V`.
    fn component<V: Capability<Self::Component>>(&self) -> Result<&V, GraphError> {
        let mut matches = self.components().iter().filter_map(V::from_component);
        let first = matches
            .next()
            .ok_or_else(|| component_not_found::<V>(self.id()))?;
        match matches.count() {
            0 => Ok(first),
            extra => Err(GraphError::AmbiguousComponent {
                entity: self.id().clone(),
                capability: short_type_name::<V>(),
                matches: extra + 1,
            }),
        }
    }

    /// Mutable access to the single component with capability `V`.
    fn component_mut<V: Capability<Self::Component>>(&mut self) -> Result<&mut V, GraphError> {
        let matches = self
            .components()
            .iter()
            .filter(|c| V::from_component(c).is_some())
            .count();
        if matches > 1 {
            return Err(GraphError::AmbiguousComponent {
                entity: self.id().clone(),
                capability: short_type_name::<V>(),
                matches,
            });
        }
        let id = self.id().clone();
        self.components_mut()
            .iter_mut()
            .find_map(V::from_component_mut)
            .ok_or_else(|| component_not_found::<V>(&id))
    }
}

fn component_not_found<V: 'static>(entity: &EntityId) -> GraphError {
    GraphError::ComponentNotFound {
        entity: entity.clone(),
        capability: short_type_name::<V>(),
    }
}

fn short_type_name<V>() -> &'static str {
    let full = std::any::type_name::<V>();
    full.rsplit("::").next().unwrap_or(full)
}

/// The stock entity record, generic over its component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<C> {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub template_id: Option<EntityId>,
    #[serde(default)]
    pub local_transform: Option<Mat4>,
    // A plain `default` would demand `C: Default` from the derive.
    #[serde(default = "Vec::new")]
    pub components: Vec<C>,
    #[serde(default)]
    pub children: Option<Vec<EntityId>>,
}

impl<C> Entity<C> {
    /// An empty record with a fresh id.
    pub fn new() -> Self {
        Self {
            id: EntityId::fresh(),
            name: None,
            template_id: None,
            local_transform: None,
            components: Vec::new(),
            children: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    pub fn with_transform(mut self, transform: impl Into<Mat4>) -> Self {
        self.local_transform = Some(transform.into());
        self
    }

    pub fn with_component(mut self, component: C) -> Self {
        self.components.push(component);
        self
    }

    /// Attach reducer: append `child` to the child list, creating the list if
    /// needed. Already-listed children are left alone.
    pub fn attach_child(mut parent: Self, child: &EntityId) -> Self {
        let children = parent.children.get_or_insert_with(Vec::new);
        if !children.contains(child) {
            children.push(child.clone());
        }
        parent
    }

    /// Detach reducer: remove `child` from the child list, keeping the order
    /// of the remaining children.
    pub fn detach_child(mut parent: Self, child: &EntityId) -> Self {
        if let Some(children) = parent.children.as_mut() {
            children.retain(|id| id != child);
        }
        parent
    }
}

impl<C> Default for Entity<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ComponentData + Clone> EntityData for Entity<C> {
    type Component = C;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn template_id(&self) -> Option<&EntityId> {
        self.template_id.as_ref()
    }

    fn set_template_id(&mut self, template_id: Option<EntityId>) {
        self.template_id = template_id;
    }

    fn local_transform(&self) -> Option<Mat4> {
        self.local_transform
    }

    fn components(&self) -> &[C] {
        &self.components
    }

    fn components_mut(&mut self) -> &mut [C] {
        &mut self.components
    }

    fn child_ids(&self) -> Option<&[EntityId]> {
        self.children.as_deref()
    }
}
