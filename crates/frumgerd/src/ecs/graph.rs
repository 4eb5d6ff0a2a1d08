//! # EntityGraph — The Live Entity Table
//!
//! The [`EntityGraph`] owns every live entity record, keyed by id. It is the
//! single source of truth for the hierarchy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ EntityGraph<T>                                      │
//! │                                                     │
//! │  entities: HashMap<EntityId, T>                     │
//! │    the records themselves (each lists its children) │
//! │                                                     │
//! │  parents: HashMap<EntityId, EntityId>               │
//! │    derived index: child id → claiming parent id     │
//! │    rebuilt from child lists on every add/update     │
//! │                                                     │
//! │  templates: Option<TemplateStore<T, B>>             │
//! │    optional persistence for save/variant/load       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Parents
//!
//! Records never store a parent pointer. The parent of `x` is whichever record
//! lists `x` in its child ids. The `parents` map is only an index over those
//! lists, and every lookup double-checks that the claiming record still lists
//! the child. A stale index entry can therefore never produce a wrong answer,
//! and subtrees can move without a back-pointer to patch.
//!
//! ## Reducers
//!
//! The graph does not know the concrete record type, so it cannot edit a child
//! list. Operations that must change one take a reducer
//! `(parent_record, child_id) -> updated_parent_record` from the caller, e.g.
//! [`Entity::attach_child`](super::Entity::attach_child) and
//! [`Entity::detach_child`](super::Entity::detach_child).

use std::collections::{HashMap, HashSet};

use super::entity::{EntityData, EntityId};
use crate::error::GraphError;
use crate::template::{BlobStore, MemoryBlobStore, PersistentData, TemplateStore};

/// What changed after a top-level mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Added(EntityId),
    Updated(EntityId),
    Destroyed(EntityId),
}

type Listener = Box<dyn FnMut(&GraphEvent)>;

/// In-memory store of entity records with parent/child relationships.
pub struct EntityGraph<T, B = MemoryBlobStore> {
    entities: HashMap<EntityId, T>,
    /// Child id → id of the record whose child list contains it.
    parents: HashMap<EntityId, EntityId>,
    templates: Option<TemplateStore<T, B>>,
    listeners: Vec<Listener>,
}

impl<T: EntityData> EntityGraph<T> {
    /// An empty graph without persistence.
    pub fn new() -> Self {
        Self::from_parts(None)
    }
}

impl<T: EntityData> Default for EntityGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EntityData, B: BlobStore> EntityGraph<T, B> {
    /// An empty graph whose entities can be saved to and loaded from `store`.
    pub fn with_template_store(store: TemplateStore<T, B>) -> Self {
        Self::from_parts(Some(store))
    }

    fn from_parts(templates: Option<TemplateStore<T, B>>) -> Self {
        Self {
            entities: HashMap::new(),
            parents: HashMap::new(),
            templates,
            listeners: Vec::new(),
        }
    }

    pub fn template_store(&self) -> Option<&TemplateStore<T, B>> {
        self.templates.as_ref()
    }

    pub fn template_store_mut(&mut self) -> Option<&mut TemplateStore<T, B>> {
        self.templates.as_mut()
    }

    /// Drop the live entities and hand back the template store.
    pub fn into_template_store(self) -> Option<TemplateStore<T, B>> {
        self.templates
    }

    /// Register a callback that runs after every add, update, and destroy.
    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: GraphEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// A destroyed (or never added) id is no longer bound to this graph.
    pub fn is_destroyed(&self, id: &EntityId) -> bool {
        !self.contains(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.entities.get(id)
    }

    /// Like [`get`](Self::get), but reports a missing id as an error.
    pub fn try_get(&self, id: &EntityId) -> Result<&T, GraphError> {
        self.entities
            .get(id)
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    /// The id of the record whose child list contains `id`, if any.
    pub fn parent_of(&self, id: &EntityId) -> Option<&EntityId> {
        let parent = self.parents.get(id)?;
        let claims = self
            .entities
            .get(parent)
            .and_then(EntityData::child_ids)
            .is_some_and(|children| children.contains(id));
        claims.then_some(parent)
    }

    /// Snapshot of every live record.
    pub fn all_entities(&self) -> Vec<&T> {
        self.entities.values().collect()
    }

    /// Snapshot of every live id. Safe to iterate while mutating the graph.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }

    /// Ids of live entities that have no parent.
    pub fn roots(&self) -> Vec<EntityId> {
        self.entities
            .keys()
            .filter(|id| self.parent_of(id).is_none())
            .cloned()
            .collect()
    }

    /// True if `ancestor` is `id` or appears on the parent path above it.
    pub fn is_ancestor_or_self(&self, ancestor: &EntityId, id: &EntityId) -> bool {
        let mut current = Some(id);
        // Bounded walk: a path can't be longer than the table.
        for _ in 0..=self.entities.len() {
            match current {
                Some(c) if c == ancestor => return true,
                Some(c) => current = self.parent_of(c),
                None => return false,
            }
        }
        false
    }

    // ── Add / Update ─────────────────────────────────────────────────

    /// Store a new record. An empty id is replaced with a fresh one.
    ///
    /// No parent is implied; link the record with [`add_child`](Self::add_child)
    /// or by updating a parent.
    pub fn add(&mut self, mut data: T) -> Result<EntityId, GraphError> {
        if data.id().is_empty() {
            data.set_id(EntityId::fresh());
        }
        let id = data.id().clone();
        if self.contains(&id) {
            return Err(GraphError::AlreadyExists(id));
        }
        self.validate_children(&data)?;

        self.index_children(&id, &[], data.child_ids().unwrap_or_default());
        self.entities.insert(id.clone(), data);
        log::debug!("added entity {id}");
        self.notify(GraphEvent::Added(id.clone()));
        Ok(id)
    }

    /// Add `child` as a new record, then let `attach` add its id to the parent.
    ///
    /// If the reducer produces an invalid parent the child is removed again,
    /// listeners see it destroyed, and the graph is left as it was.
    pub fn add_child<F>(&mut self, parent: &EntityId, child: T, attach: F) -> Result<EntityId, GraphError>
    where
        F: FnOnce(T, &EntityId) -> T,
    {
        let parent_data = self.try_get(parent)?.clone();
        let child_id = self.add(child)?;

        let updated = attach(parent_data, &child_id);
        let result = if updated.id() == parent {
            self.update(updated)
        } else {
            Err(GraphError::ReducerChangedId {
                expected: parent.clone(),
                actual: updated.id().clone(),
            })
        };

        if let Err(err) = result {
            self.unlink(&child_id);
            self.notify(GraphEvent::Destroyed(child_id));
            return Err(err);
        }
        Ok(child_id)
    }

    /// Replace the stored value for `record`'s id.
    pub fn update(&mut self, record: T) -> Result<(), GraphError> {
        let id = record.id().clone();
        let old_children: Vec<EntityId> = self
            .try_get(&id)?
            .child_ids()
            .map(<[EntityId]>::to_vec)
            .unwrap_or_default();
        self.validate_children(&record)?;

        self.index_children(&id, &old_children, record.child_ids().unwrap_or_default());

        // Drop our own index entry if the former parent stopped listing us.
        if let Some(parent) = self.parents.get(&id) {
            let still_claimed = self
                .entities
                .get(parent)
                .and_then(EntityData::child_ids)
                .is_some_and(|children| children.contains(&id));
            if !still_claimed {
                self.parents.remove(&id);
            }
        }

        self.entities.insert(id.clone(), record);
        self.notify(GraphEvent::Updated(id));
        Ok(())
    }

    /// Reject child lists that point outside the graph, repeat an id, steal a
    /// child from another live parent, or would close a cycle.
    fn validate_children(&self, record: &T) -> Result<(), GraphError> {
        let id = record.id();
        let mut seen = HashSet::new();
        for child in record.child_ids().unwrap_or_default() {
            if !self.contains(child) {
                return Err(GraphError::UnknownChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
            if !seen.insert(child) {
                return Err(GraphError::ParentConflict {
                    child: child.clone(),
                    claimed_by: id.clone(),
                    parent: id.clone(),
                });
            }
            if let Some(claimed_by) = self.parent_of(child)
                && claimed_by != id
            {
                return Err(GraphError::ParentConflict {
                    child: child.clone(),
                    claimed_by: claimed_by.clone(),
                    parent: id.clone(),
                });
            }
            if self.is_ancestor_or_self(child, id) {
                return Err(GraphError::Cycle {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
        }
        Ok(())
    }

    fn index_children(&mut self, parent: &EntityId, old: &[EntityId], new: &[EntityId]) {
        for child in old {
            if !new.contains(child) && self.parents.get(child) == Some(parent) {
                self.parents.remove(child);
            }
        }
        for child in new {
            self.parents.insert(child.clone(), parent.clone());
        }
    }

    /// Remove a record and its index entries without touching anything else.
    fn unlink(&mut self, id: &EntityId) -> Option<T> {
        let record = self.entities.remove(id)?;
        for child in record.child_ids().unwrap_or_default() {
            if self.parents.get(child) == Some(id) {
                self.parents.remove(child);
            }
        }
        self.parents.remove(id);
        Some(record)
    }

    // ── Detach / Destroy ─────────────────────────────────────────────

    /// Take `id` out of its parent's child list. The entity stays in the graph
    /// as a root.
    pub fn remove_from_parent<F>(&mut self, id: &EntityId, mut detach: F) -> Result<(), GraphError>
    where
        F: FnMut(T, &EntityId) -> T,
    {
        self.detach_from_parent(id, &mut detach)?;
        // Re-store the child so the index forgets the old parent, even though
        // none of its fields changed.
        let record = self.try_get(id)?.clone();
        self.update(record)
    }

    fn detach_from_parent<F>(&mut self, id: &EntityId, detach: &mut F) -> Result<(), GraphError>
    where
        F: FnMut(T, &EntityId) -> T,
    {
        if !self.contains(id) {
            return Err(GraphError::NotFound(id.clone()));
        }
        let Some(parent) = self.parent_of(id).cloned() else {
            return Ok(());
        };
        let parent_data = self.try_get(&parent)?.clone();
        let updated = detach(parent_data, id);
        if updated.id() != &parent {
            return Err(GraphError::ReducerChangedId {
                expected: parent,
                actual: updated.id().clone(),
            });
        }
        self.update(updated)
    }

    /// Destroy `id` and its whole subtree.
    ///
    /// Returns `false` if `id` is not live (already destroyed or never added),
    /// so a second call on the same id is a no-op. `detach` removes `id` from
    /// its parent record, exactly as for
    /// [`remove_from_parent`](Self::remove_from_parent). Descendants leave with
    /// their ancestors, so the reducer only ever runs on the surviving parent.
    /// If it fails, nothing is destroyed.
    pub fn destroy<F>(&mut self, id: &EntityId, mut detach: F) -> bool
    where
        F: FnMut(T, &EntityId) -> T,
    {
        if !self.contains(id) {
            return false;
        }
        if let Err(err) = self.detach_from_parent(id, &mut detach) {
            log::warn!("not destroying {id}: {err}");
            return false;
        }

        // Children before parents.
        for member in self.subtree(id).iter().rev() {
            self.unlink(member);
            log::debug!("destroyed entity {member}");
            self.notify(GraphEvent::Destroyed(member.clone()));
        }
        true
    }

    /// Ids of `id` and all its live descendants, parents before children.
    fn subtree(&self, id: &EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(record) = self.get(&current) else {
                continue;
            };
            if let Some(children) = record.child_ids() {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }
}

// ── Persistence ──────────────────────────────────────────────────────

impl<T: PersistentData, B: BlobStore> EntityGraph<T, B> {
    fn store(&self) -> Result<&TemplateStore<T, B>, GraphError> {
        self.templates.as_ref().ok_or(GraphError::NoTemplateStore)
    }

    /// Persist `id` and every entity below it, each as its own template (or
    /// as a variant of the template it was derived from).
    pub fn save_changes(&mut self, id: &EntityId) -> Result<(), GraphError> {
        self.try_get(id)?;
        let subtree = self.subtree(id);
        let store = self.templates.as_mut().ok_or(GraphError::NoTemplateStore)?;
        for member in &subtree {
            if let Some(record) = self.entities.get(member) {
                store.save_as_template(record)?;
            }
        }
        log::debug!("saved {} entities under {id}", subtree.len());
        Ok(())
    }

    /// Create an unsaved variant of the persisted entity `id` and add it to the
    /// graph, along with a copy of its subtree.
    ///
    /// Children that are templates themselves become variant instances of
    /// those templates; unsaved children are copied with fresh ids. `detach`
    /// drops the template's child ids from the new record and `attach` adds the
    /// copies, preserving order. Returns the id of the new root.
    pub fn create_variant<A, D>(&mut self, id: &EntityId, mut attach: A, mut detach: D) -> Result<EntityId, GraphError>
    where
        A: FnMut(T, &EntityId) -> T,
        D: FnMut(T, &EntityId) -> T,
    {
        let source = self.try_get(id)?;
        let instance = self.store()?.create_variant_instance_of(source)?;
        let new_id = self.adopt_copy(instance, &mut attach, &mut detach)?;
        log::debug!("created variant {new_id} of {id}");
        Ok(new_id)
    }

    fn adopt_copy<A, D>(&mut self, mut copy: T, attach: &mut A, detach: &mut D) -> Result<EntityId, GraphError>
    where
        A: FnMut(T, &EntityId) -> T,
        D: FnMut(T, &EntityId) -> T,
    {
        let template_children: Vec<EntityId> =
            copy.child_ids().map(<[EntityId]>::to_vec).unwrap_or_default();
        for child in &template_children {
            copy = detach(copy, child);
        }
        for child in &template_children {
            let child_copy = self.instantiate_child(child)?;
            let child_id = self.adopt_copy(child_copy, attach, detach)?;
            copy = attach(copy, &child_id);
        }
        self.add(copy)
    }

    fn instantiate_child(&self, id: &EntityId) -> Result<T, GraphError> {
        let source = self.try_get(id)?;
        let store = self.store()?;
        if store.is_template(id) {
            return Ok(store.create_variant_instance_of(source)?);
        }
        let mut copy = source.clone();
        copy.set_id(EntityId::fresh());
        Ok(copy)
    }

    /// Resolve the template `id` and its persisted children into the graph.
    /// Entities already present are replaced with the stored state.
    pub fn load_template(&mut self, id: &EntityId) -> Result<EntityId, GraphError> {
        let mut visiting = HashSet::new();
        self.load_template_inner(id, &mut visiting)
    }

    fn load_template_inner(
        &mut self,
        id: &EntityId,
        visiting: &mut HashSet<EntityId>,
    ) -> Result<EntityId, GraphError> {
        if !visiting.insert(id.clone()) {
            return Err(GraphError::Cycle {
                parent: id.clone(),
                child: id.clone(),
            });
        }
        let record = self.store()?.load_template_instance(id)?;
        for child in record.child_ids().unwrap_or_default() {
            self.load_template_inner(child, visiting)?;
        }
        visiting.remove(id);

        if self.contains(id) {
            self.update(record)?;
            Ok(id.clone())
        } else {
            self.add(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::entity::fixtures::*;
    use crate::ecs::Entity;

    fn graph() -> EntityGraph<Record> {
        EntityGraph::new()
    }

    #[test]
    fn add_assigns_missing_id() {
        let mut g = graph();
        let mut data = Record::new();
        data.id = EntityId::default();
        let id = g.add(data).unwrap();
        assert!(!id.is_empty());
        assert_eq!(g.get(&id).unwrap().id, id);
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut g = graph();
        let data = Record::new();
        g.add(data.clone()).unwrap();
        assert!(matches!(g.add(data), Err(GraphError::AlreadyExists(_))));
    }

    #[test]
    fn children_keep_order_and_derive_parent() {
        let mut g = graph();
        let group = g.add(Record::new()).unwrap();
        let e1 = g.add_child(&group, Record::new(), Entity::attach_child).unwrap();
        let e2 = g.add_child(&group, Record::new(), Entity::attach_child).unwrap();

        assert_eq!(g.get(&group).unwrap().child_ids().unwrap(), &[e1.clone(), e2.clone()]);
        assert_eq!(g.parent_of(&e1), Some(&group));
        assert_eq!(g.parent_of(&e2), Some(&group));
        assert_eq!(g.parent_of(&group), None);
        assert_eq!(g.roots(), vec![group]);
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut g = graph();
        assert!(matches!(g.update(Record::new()), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn update_rejects_unknown_child() {
        let mut g = graph();
        let p = g.add(Record::new()).unwrap();
        let parent = Record::attach_child(g.get(&p).unwrap().clone(), &EntityId::new("ghost"));
        assert!(matches!(g.update(parent), Err(GraphError::UnknownChild { .. })));
        assert!(g.get(&p).unwrap().child_ids().is_none());
    }

    #[test]
    fn child_cannot_have_two_parents() {
        let mut g = graph();
        let a = g.add(Record::new()).unwrap();
        let b = g.add(Record::new()).unwrap();
        let c = g.add_child(&a, Record::new(), Entity::attach_child).unwrap();

        let stolen = Record::attach_child(g.get(&b).unwrap().clone(), &c);
        assert!(matches!(g.update(stolen), Err(GraphError::ParentConflict { .. })));
        assert_eq!(g.parent_of(&c), Some(&a));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = graph();
        let a = g.add(Record::new()).unwrap();
        let b = g.add_child(&a, Record::new(), Entity::attach_child).unwrap();
        let c = g.add_child(&b, Record::new(), Entity::attach_child).unwrap();

        let looped = Record::attach_child(g.get(&c).unwrap().clone(), &a);
        assert!(matches!(g.update(looped), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn reducer_changing_id_rolls_back_child() {
        let mut g = graph();
        let p = g.add(Record::new()).unwrap();
        let result = g.add_child(&p, Record::new(), |_, _| Record::new());
        assert!(matches!(result, Err(GraphError::ReducerChangedId { .. })));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn remove_from_parent_keeps_entity_and_siblings() {
        let mut g = graph();
        let group = g.add(Record::new()).unwrap();
        let kids: Vec<_> = (0..4)
            .map(|_| g.add_child(&group, Record::new(), Entity::attach_child).unwrap())
            .collect();

        g.remove_from_parent(&kids[1], Entity::detach_child).unwrap();

        assert_eq!(g.len(), 5);
        assert_eq!(g.parent_of(&kids[1]), None);
        assert_eq!(
            g.get(&group).unwrap().child_ids().unwrap(),
            &[kids[0].clone(), kids[2].clone(), kids[3].clone()]
        );
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut g = graph();
        let e = g.add(Record::new()).unwrap();
        assert!(g.destroy(&e, Entity::detach_child));
        assert!(!g.destroy(&e, Entity::detach_child));
        assert!(g.is_destroyed(&e));
        assert!(g.is_empty());
    }

    #[test]
    fn destroy_cascades_and_detaches_from_parent() {
        let mut g = graph();
        let group = g.add(Record::new()).unwrap();
        let e1 = g.add_child(&group, Record::new(), Entity::attach_child).unwrap();
        let e2 = g.add_child(&group, Record::new(), Entity::attach_child).unwrap();
        let e3 = g.add_child(&e2, Record::new(), Entity::attach_child).unwrap();
        let e4 = g.add_child(&e3, Record::new(), Entity::attach_child).unwrap();

        assert!(g.destroy(&e2, Entity::detach_child));

        assert_eq!(g.len(), 2);
        for id in [&e2, &e3, &e4] {
            assert!(g.is_destroyed(id));
        }
        assert_eq!(g.get(&group).unwrap().child_ids().unwrap(), &[e1]);
        // No dangling ids anywhere.
        for record in g.all_entities() {
            for child in record.child_ids().unwrap_or_default() {
                assert!(g.contains(child));
            }
        }
    }

    #[test]
    fn listeners_see_every_mutation() {
        let mut g = graph();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        g.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let p = g.add(Record::new()).unwrap();
        let c = g.add_child(&p, Record::new(), Entity::attach_child).unwrap();
        g.destroy(&c, Entity::detach_child);

        assert_eq!(
            *events.borrow(),
            vec![
                GraphEvent::Added(p.clone()),
                GraphEvent::Added(c.clone()),
                GraphEvent::Updated(p.clone()),
                GraphEvent::Updated(p),
                GraphEvent::Destroyed(c),
            ]
        );
    }

    #[test]
    fn rolled_back_child_is_reported_destroyed() {
        let mut g = graph();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        g.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let p = g.add(Record::new()).unwrap();
        let child = Record::new();
        let c = child.id.clone();
        assert!(g.add_child(&p, child, |_, _| Record::new()).is_err());

        assert_eq!(g.len(), 1);
        assert_eq!(
            *events.borrow(),
            vec![
                GraphEvent::Added(p),
                GraphEvent::Added(c.clone()),
                GraphEvent::Destroyed(c),
            ]
        );
    }

    #[test]
    fn destroy_leaves_no_orphans_when_inner_detach_would_fail() {
        let mut g = graph();
        let root = g.add(Record::new()).unwrap();
        let mid = g.add_child(&root, Record::new(), Entity::attach_child).unwrap();
        g.add_child(&mid, Record::new(), Entity::attach_child).unwrap();

        // A reducer that breaks every parent it touches. The root has no
        // parent, so it never runs.
        let mut calls = 0;
        assert!(g.destroy(&root, |_, _| {
            calls += 1;
            Record::new()
        }));
        assert_eq!(calls, 0);
        assert!(g.all_entities().is_empty());
        assert!(g.entity_ids().is_empty());
    }

    #[test]
    fn failed_detach_destroys_nothing() {
        let mut g = graph();
        let root = g.add(Record::new()).unwrap();
        let mid = g.add_child(&root, Record::new(), Entity::attach_child).unwrap();
        let leaf = g.add_child(&mid, Record::new(), Entity::attach_child).unwrap();

        assert!(!g.destroy(&mid, |_, _| Record::new()));

        let mut live = g.entity_ids();
        live.sort();
        let mut expected = vec![root.clone(), mid.clone(), leaf.clone()];
        expected.sort();
        assert_eq!(live, expected);
        assert_eq!(g.parent_of(&leaf), Some(&mid));
        assert_eq!(g.parent_of(&mid), Some(&root));
    }

    #[test]
    fn attached_store_is_reachable() {
        let mut g: EntityGraph<Record> = EntityGraph::with_template_store(TemplateStore::new(MemoryBlobStore::new()));
        let e = g.add(Record::new().with_component(enemy("stats", 1, 2))).unwrap();
        g.save_changes(&e).unwrap();

        assert_eq!(g.template_store().unwrap().get_all_entity_ids().unwrap(), vec![e.clone()]);
        assert_eq!(
            g.template_store_mut()
                .unwrap()
                .load_all_template_files_into_memory()
                .unwrap(),
            1
        );
        assert!(g.into_template_store().unwrap().is_eager());
    }

    #[test]
    fn persistence_needs_a_store() {
        let mut g = graph();
        let e = g.add(Record::new()).unwrap();
        assert!(matches!(g.save_changes(&e), Err(GraphError::NoTemplateStore)));
    }
}
