//! # Deltas — Stored Diffs and Resolved State
//!
//! A persisted template is a [`StoredTemplate`]: the fields and components
//! that differ from its parent template's *resolved* state. A chain root has
//! no parent, so its diff is taken against the empty state and holds every
//! field.
//!
//! ## Structural Comparison
//!
//! Records are compared through their JSON form, not by reference. A record
//! serializes to an object whose keys split three ways:
//!
//! ```text
//! { "id": ..,            ← EntityData::ID_FIELD, never diffed
//!   "template_id": ..,   ← EntityData::TEMPLATE_FIELD, stored as the chain link
//!   "components": [..],  ← EntityData::COMPONENTS_FIELD, diffed per component id
//!   "name": .., ... }    ← everything else: plain fields, diffed by key
//! ```
//!
//! Components are matched across the chain by their id and diffed one level
//! deep: a component whose JSON object changed in a few keys is stored as a
//! [`ComponentDelta::Patch`] of just those keys.
//!
//! ## Removal Is Explicit
//!
//! Absence from a diff means "inherited". Dropping a field or a component is
//! recorded with an explicit marker (`removed_fields`,
//! [`ComponentDelta::Removed`]) so a reload never resurrects it.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ecs::{ComponentData, EntityData, EntityId};
use crate::error::TemplateError;

/// The persisted form of one template: a diff against its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTemplate {
    pub own_id: EntityId,
    #[serde(default)]
    pub template_id: Option<EntityId>,
    #[serde(default)]
    pub diff_fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_fields: Vec<String>,
    #[serde(default)]
    pub diff_components: Vec<ComponentDelta>,
    /// Component ids in their final order. Only written when replaying the
    /// deltas over the parent would order them differently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_order: Option<Vec<String>>,
}

impl StoredTemplate {
    /// Diff `child` against `parent`, the resolved state of `template_id`.
    pub fn between(
        own_id: EntityId,
        template_id: Option<EntityId>,
        parent: &ResolvedState,
        child: &ResolvedState,
    ) -> Self {
        let (diff_fields, removed_fields) = diff_object(&parent.fields, &child.fields);

        let mut diff_components = Vec::new();
        for (id, value) in &child.components {
            match (parent.component(id), value) {
                (Some(old), _) if old == value => {}
                (Some(Value::Object(old)), Value::Object(new)) => {
                    let (fields, removed) = diff_object(old, new);
                    diff_components.push(ComponentDelta::Patch {
                        id: id.clone(),
                        fields,
                        removed,
                    });
                }
                _ => diff_components.push(ComponentDelta::Set {
                    id: id.clone(),
                    value: value.clone(),
                }),
            }
        }
        for (id, _) in &parent.components {
            if child.component(id).is_none() {
                diff_components.push(ComponentDelta::Removed { id: id.clone() });
            }
        }

        let mut stored = Self {
            own_id,
            template_id,
            diff_fields,
            removed_fields,
            diff_components,
            component_order: None,
        };

        let mut replayed = parent.clone();
        replayed.apply(&stored);
        if replayed.component_ids().ne(child.component_ids()) {
            stored.component_order = Some(child.component_ids().map(str::to_string).collect());
        }
        stored
    }

    /// The parent template, if any. A record pointing at itself is a root.
    pub fn parent(&self) -> Option<&EntityId> {
        self.template_id.as_ref().filter(|id| **id != self.own_id)
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

/// One component entry of a stored diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ComponentDelta {
    /// The whole component, new or replaced.
    Set { id: String, value: Value },
    /// Changed keys of an inherited component.
    Patch {
        id: String,
        #[serde(default)]
        fields: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed: Vec<String>,
    },
    /// An inherited component this template drops.
    Removed { id: String },
}

impl ComponentDelta {
    pub fn id(&self) -> &str {
        match self {
            ComponentDelta::Set { id, .. }
            | ComponentDelta::Patch { id, .. }
            | ComponentDelta::Removed { id } => id,
        }
    }
}

/// The fully resolved, id-less content of a template.
///
/// Components keep their order; each is paired with its component id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedState {
    pub fields: Map<String, Value>,
    pub components: Vec<(String, Value)>,
}

impl ResolvedState {
    /// Capture the diffable content of `record`.
    pub fn from_record<T>(record: &T) -> Result<Self, TemplateError>
    where
        T: EntityData + Serialize,
    {
        let id = record.id();
        let Value::Object(mut fields) = serde_json::to_value(record)? else {
            return Err(malformed(id, "record does not serialize to a json object"));
        };
        fields.remove(T::ID_FIELD);
        fields.remove(T::TEMPLATE_FIELD);

        let values = match fields.remove(T::COMPONENTS_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(_) => return Err(malformed(id, "components do not serialize to a json array")),
        };
        if values.len() != record.components().len() {
            return Err(malformed(id, "serialized component count does not match"));
        }

        let mut seen = HashSet::new();
        let mut components = Vec::with_capacity(values.len());
        for (component, value) in record.components().iter().zip(values) {
            if !seen.insert(component.id()) {
                return Err(malformed(id, "two components share an id"));
            }
            components.push((component.id().to_string(), value));
        }

        Ok(Self { fields, components })
    }

    /// Rebuild a typed record from this state.
    pub fn into_record<T>(self, own_id: &EntityId, template_id: Option<&EntityId>) -> Result<T, TemplateError>
    where
        T: EntityData + DeserializeOwned,
    {
        let mut object = self.fields;
        object.insert(T::ID_FIELD.to_string(), serde_json::to_value(own_id)?);
        object.insert(T::TEMPLATE_FIELD.to_string(), serde_json::to_value(template_id)?);
        object.insert(
            T::COMPONENTS_FIELD.to_string(),
            Value::Array(self.components.into_iter().map(|(_, value)| value).collect()),
        );
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(id, _)| id.as_str())
    }

    pub fn component(&self, id: &str) -> Option<&Value> {
        self.components
            .iter()
            .find(|(component, _)| component == id)
            .map(|(_, value)| value)
    }

    /// Fold one stored diff over this state.
    pub fn apply(&mut self, stored: &StoredTemplate) {
        for (key, value) in &stored.diff_fields {
            self.fields.insert(key.clone(), value.clone());
        }
        for key in &stored.removed_fields {
            self.fields.remove(key);
        }

        for delta in &stored.diff_components {
            match delta {
                ComponentDelta::Set { id, value } => {
                    match self.components.iter_mut().find(|(component, _)| component == id) {
                        Some((_, slot)) => *slot = value.clone(),
                        None => self.components.push((id.clone(), value.clone())),
                    }
                }
                ComponentDelta::Patch { id, fields, removed } => {
                    let target = self
                        .components
                        .iter_mut()
                        .find(|(component, _)| component == id)
                        .map(|(_, value)| value);
                    let Some(Value::Object(target)) = target else {
                        log::warn!(
                            "template {}: patch for component '{id}' has nothing to patch, skipping",
                            stored.own_id
                        );
                        continue;
                    };
                    for (key, value) in fields {
                        target.insert(key.clone(), value.clone());
                    }
                    for key in removed {
                        target.remove(key);
                    }
                }
                ComponentDelta::Removed { id } => {
                    self.components.retain(|(component, _)| component != id);
                }
            }
        }

        if let Some(order) = &stored.component_order {
            // Ids missing from the order keep their relative place at the end.
            let rank = |id: &str| order.iter().position(|o| o == id).unwrap_or(order.len());
            self.components.sort_by_key(|(id, _)| rank(id));
        }
    }
}

/// Keys of `child` that differ from `parent`, and keys `child` dropped.
pub fn diff_object(parent: &Map<String, Value>, child: &Map<String, Value>) -> (Map<String, Value>, Vec<String>) {
    let changed = child
        .iter()
        .filter(|(key, value)| parent.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let removed = parent
        .keys()
        .filter(|key| !child.contains_key(*key))
        .cloned()
        .collect();
    (changed, removed)
}

fn malformed(id: &EntityId, reason: &'static str) -> TemplateError {
    TemplateError::Malformed {
        id: id.clone(),
        reason,
    }
}
