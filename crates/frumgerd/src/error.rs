//! Error types for the entity graph and the template store.

use crate::ecs::entity::EntityId;

/// Errors raised by [`TemplateStore`](crate::template::TemplateStore).
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A variant was requested from a record that is not a persisted template.
    /// Load the record's own `template_id` and branch from that instead.
    #[error("entity {0} is not a persisted template")]
    NotATemplate(EntityId),

    #[error("no template stored under {0}")]
    NotFound(EntityId),

    /// A stored variant points at a parent that no longer exists.
    #[error("template {id} refers to missing parent template {parent}")]
    MissingParent { id: EntityId, parent: EntityId },

    #[error("template chain of {0} loops back on itself")]
    Cycle(EntityId),

    /// The record or its stored form does not have the expected shape.
    #[error("template {id} is malformed: {reason}")]
    Malformed { id: EntityId, reason: &'static str },

    #[error("template json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("blob store: {0}")]
    Io(#[from] std::io::Error),

    /// One or more records failed during a bulk load. Nothing was cached.
    #[error("bulk load failed for {} template(s)", .failures.len())]
    BulkLoad {
        failures: Vec<(EntityId, TemplateError)>,
    },
}

/// Errors raised by [`EntityGraph`](crate::ecs::EntityGraph) and its views.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("entity {0} is not in the graph")]
    NotFound(EntityId),

    #[error("entity {0} is already in the graph")]
    AlreadyExists(EntityId),

    #[error("entity {parent} lists child {child}, which is not in the graph")]
    UnknownChild { parent: EntityId, child: EntityId },

    #[error("entity {child} is already a child of {claimed_by}, cannot attach it to {parent}")]
    ParentConflict {
        child: EntityId,
        claimed_by: EntityId,
        parent: EntityId,
    },

    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: EntityId, child: EntityId },

    /// A caller-supplied reducer returned a record with a different id.
    #[error("reducer changed the parent id from {expected} to {actual}")]
    ReducerChangedId { expected: EntityId, actual: EntityId },

    #[error("entity {parent} has no child named {name:?}")]
    NoSuchChild { parent: EntityId, name: String },

    #[error("entity {parent} has {matches} children named {name:?}")]
    AmbiguousChild {
        parent: EntityId,
        name: String,
        matches: usize,
    },

    #[error("entity {entity} has no {capability} component")]
    ComponentNotFound {
        entity: EntityId,
        capability: &'static str,
    },

    #[error("entity {entity} has {matches} {capability} components")]
    AmbiguousComponent {
        entity: EntityId,
        capability: &'static str,
        matches: usize,
    },

    #[error("this graph has no template store attached")]
    NoTemplateStore,

    #[error(transparent)]
    Template(#[from] TemplateError),
}
