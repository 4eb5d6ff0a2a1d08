//! # Template Store — Templates, Variants, and Chain Resolution
//!
//! Every persisted record is a *template*, stored under its own id. A template
//! with a `template_id` is a *variant*: its blob holds only the diff against
//! the resolved state of that parent.
//!
//! ```text
//!   T (root, full record)      health 100, mana 10
//!   └── V1 (diff vs T)         health 200 → 300
//!       └── V2 (diff vs V1)    mana 20
//!
//!   load(V2) = apply(apply(apply(∅, T), V1), V2) = health 300, mana 20
//! ```
//!
//! ## Identity Rules
//!
//! - [`create_variant_instance_of`](TemplateStore::create_variant_instance_of)
//!   only branches from a persisted template. An unsaved instance is refused;
//!   branch from its own `template_id` instead. The chain therefore only ever
//!   contains persisted nodes.
//! - [`save_as_template`](TemplateStore::save_as_template) turns an instance
//!   into a template, or re-saves a template with new values. Either way the
//!   stored blob is recomputed against the parent's *current* resolution.
//!
//! ## Lazy and Eager Modes
//!
//! By default every load walks the chain through the blob store. After
//! [`load_all_template_files_into_memory`](TemplateStore::load_all_template_files_into_memory)
//! all templates are resolved once and served from memory. Both modes give
//! identical results; the eager cache is kept current by saves made through
//! the store.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::blob::{BlobStore, MemoryBlobStore};
use super::delta::{ResolvedState, StoredTemplate};
use crate::ecs::{EntityData, EntityId};
use crate::error::TemplateError;

/// A record type the template store can persist.
pub trait PersistentData: EntityData + Serialize + DeserializeOwned {}

impl<T: EntityData + Serialize + DeserializeOwned> PersistentData for T {}

/// Diff-based persistence of entity records over a [`BlobStore`].
pub struct TemplateStore<T, B = MemoryBlobStore> {
    blobs: B,
    pretty_json: bool,
    cache: Option<TemplateCache>,
    _record: PhantomData<fn() -> T>,
}

/// A template resolved down its whole chain.
#[derive(Debug, Clone)]
struct Resolved {
    template_id: Option<EntityId>,
    state: ResolvedState,
    /// Root first, this template last.
    chain: Vec<EntityId>,
}

/// Everything the eager mode holds in memory.
struct TemplateCache {
    stored: HashMap<EntityId, StoredTemplate>,
    resolved: HashMap<EntityId, Resolved>,
}

impl TemplateCache {
    /// Resolve every stored template. Any failure fails the whole cache.
    fn resolve_all(stored: HashMap<EntityId, StoredTemplate>) -> Result<Self, TemplateError> {
        let mut resolved = HashMap::with_capacity(stored.len());
        let mut failures = Vec::new();
        for id in stored.keys() {
            let fetch = |key: &EntityId| {
                stored
                    .get(key)
                    .cloned()
                    .ok_or_else(|| TemplateError::NotFound(key.clone()))
            };
            match resolve_chain(id, fetch) {
                Ok(template) => {
                    resolved.insert(id.clone(), template);
                }
                Err(err) => failures.push((id.clone(), err)),
            }
        }

        if failures.is_empty() {
            Ok(Self { stored, resolved })
        } else {
            failures.sort_by(|a, b| a.0.cmp(&b.0));
            Err(TemplateError::BulkLoad { failures })
        }
    }
}

/// Walk from `id` up to its chain root, then fold the diffs back down.
fn resolve_chain<F>(id: &EntityId, mut fetch: F) -> Result<Resolved, TemplateError>
where
    F: FnMut(&EntityId) -> Result<StoredTemplate, TemplateError>,
{
    let mut path: Vec<StoredTemplate> = Vec::new();
    let mut seen = HashSet::new();
    let mut current = id.clone();
    loop {
        if !seen.insert(current.clone()) {
            return Err(TemplateError::Cycle(id.clone()));
        }
        let stored = fetch(&current).map_err(|err| match (err, path.last()) {
            (TemplateError::NotFound(parent), Some(child)) => TemplateError::MissingParent {
                id: child.own_id.clone(),
                parent,
            },
            (err, _) => err,
        })?;
        let parent = stored.parent().cloned();
        path.push(stored);
        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }

    let template_id = path.first().and_then(StoredTemplate::parent).cloned();
    let mut state = ResolvedState::default();
    let mut chain = Vec::with_capacity(path.len());
    for stored in path.iter().rev() {
        state.apply(stored);
        chain.push(stored.own_id.clone());
    }
    Ok(Resolved {
        template_id,
        state,
        chain,
    })
}

impl<T, B: BlobStore> TemplateStore<T, B> {
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            pretty_json: false,
            cache: None,
            _record: PhantomData,
        }
    }

    /// Write indented JSON blobs.
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn into_blobs(self) -> B {
        self.blobs
    }

    /// Whether loads are served from the eager cache.
    pub fn is_eager(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop the eager cache and go back to per-id loading.
    pub fn unload_cache(&mut self) {
        self.cache = None;
    }

    /// Whether `id` is a persisted template.
    pub fn is_template(&self, id: &EntityId) -> bool {
        match &self.cache {
            Some(cache) => cache.stored.contains_key(id),
            None => self.blobs.exists(id.as_str()),
        }
    }

    /// Ids of every persisted template, sorted. Nothing is resolved.
    pub fn get_all_entity_ids(&self) -> Result<Vec<EntityId>, TemplateError> {
        let mut ids: Vec<EntityId> = match &self.cache {
            Some(cache) => cache.stored.keys().cloned().collect(),
            None => self
                .blobs
                .list_keys()?
                .into_iter()
                .map(EntityId::from)
                .collect(),
        };
        ids.sort();
        Ok(ids)
    }

    /// Read and decode the stored diff of `id`, bypassing the cache.
    pub fn read_stored(&self, id: &EntityId) -> Result<StoredTemplate, TemplateError> {
        let blob = self
            .blobs
            .read(id.as_str())?
            .ok_or_else(|| TemplateError::NotFound(id.clone()))?;
        let stored: StoredTemplate = serde_json::from_slice(&blob)?;
        if stored.own_id != *id {
            return Err(TemplateError::Malformed {
                id: id.clone(),
                reason: "stored own id does not match its key",
            });
        }
        Ok(stored)
    }

    fn resolve(&self, id: &EntityId) -> Result<Resolved, TemplateError> {
        match &self.cache {
            Some(cache) => cache
                .resolved
                .get(id)
                .cloned()
                .ok_or_else(|| TemplateError::NotFound(id.clone())),
            None => resolve_chain(id, |key| self.read_stored(key)),
        }
    }

    /// Read and resolve every persisted template, then serve loads from
    /// memory. Returns the number of templates cached.
    ///
    /// All or nothing: if any template fails to read or resolve, the error
    /// lists every failure and the store's mode is left as it was.
    pub fn load_all_template_files_into_memory(&mut self) -> Result<usize, TemplateError> {
        let mut stored = HashMap::new();
        let mut failures = Vec::new();
        for key in self.blobs.list_keys()? {
            let id = EntityId::from(key);
            match self.read_stored(&id) {
                Ok(template) => {
                    stored.insert(id, template);
                }
                Err(err) => failures.push((id, err)),
            }
        }
        if !failures.is_empty() {
            log::warn!("bulk template load failed for {} blob(s)", failures.len());
            return Err(TemplateError::BulkLoad { failures });
        }

        let cache = TemplateCache::resolve_all(stored)?;
        let count = cache.resolved.len();
        self.cache = Some(cache);
        log::debug!("cached {count} templates");
        Ok(count)
    }
}

impl<T: PersistentData, B: BlobStore> TemplateStore<T, B> {
    /// A fresh, unsaved instance of the persisted template `source`.
    ///
    /// Fails with [`TemplateError::NotATemplate`] if `source` is itself an
    /// unsaved instance.
    pub fn create_variant_instance_of(&self, source: &T) -> Result<T, TemplateError> {
        let source_id = source.id();
        if !self.is_template(source_id) {
            return Err(TemplateError::NotATemplate(source_id.clone()));
        }
        let mut instance = source.clone();
        instance.set_id(EntityId::fresh());
        instance.set_template_id(Some(source_id.clone()));
        Ok(instance)
    }

    /// Persist `record` under its own id, as a diff against its template.
    pub fn save_as_template(&mut self, record: &T) -> Result<(), TemplateError> {
        let own_id = record.id().clone();
        let parent_id = record.template_id().filter(|id| **id != own_id).cloned();

        let parent = match &parent_id {
            None => ResolvedState::default(),
            Some(parent_id) => {
                let parent = self.resolve(parent_id).map_err(|err| match err {
                    TemplateError::NotFound(_) => TemplateError::NotATemplate(parent_id.clone()),
                    err => err,
                })?;
                if parent.chain.contains(&own_id) {
                    return Err(TemplateError::Cycle(own_id));
                }
                parent.state
            }
        };

        let child = ResolvedState::from_record(record)?;
        let stored = StoredTemplate::between(own_id.clone(), parent_id, &parent, &child);
        let blob = if self.pretty_json {
            serde_json::to_vec_pretty(&stored)?
        } else {
            serde_json::to_vec(&stored)?
        };
        self.blobs.write(own_id.as_str(), &blob)?;
        log::debug!(
            "saved template {own_id}: {} field(s), {} component change(s)",
            stored.diff_fields.len(),
            stored.diff_components.len()
        );

        if let Some(cache) = self.cache.take() {
            let mut all = cache.stored;
            all.insert(own_id, stored);
            match TemplateCache::resolve_all(all) {
                Ok(cache) => self.cache = Some(cache),
                Err(err) => log::warn!("dropping eager template cache: {err}"),
            }
        }
        Ok(())
    }

    /// The fully resolved record persisted under `id`.
    pub fn load_template_instance(&self, id: &EntityId) -> Result<T, TemplateError> {
        let resolved = self.resolve(id)?;
        resolved.state.into_record(id, resolved.template_id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentData;
    use crate::ecs::entity::fixtures::*;
    use crate::template::ComponentDelta;

    fn store() -> TemplateStore<Record> {
        TemplateStore::new(MemoryBlobStore::new())
    }

    fn stats(record: &Record) -> (i32, i32) {
        let enemy = record.component::<Enemy>().unwrap();
        (enemy.health, enemy.mana)
    }

    fn goblin() -> Record {
        Record::named("goblin").with_component(enemy("stats", 100, 10))
    }

    fn assert_persistent<T: PersistentData>() {}

    #[test]
    fn stock_record_with_plain_enum_components_is_persistent() {
        // `Part` implements neither `Default` nor anything beyond serde.
        assert_persistent::<Record>();
    }

    #[test]
    fn variant_chain_round_trip() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();

        let mut v1 = store.create_variant_instance_of(&base).unwrap();
        v1.component_mut::<Enemy>().unwrap().health = 200;
        store.save_as_template(&v1).unwrap();
        assert_eq!(stats(&store.load_template_instance(&v1.id).unwrap()), (200, 10));

        v1.component_mut::<Enemy>().unwrap().health = 300;
        store.save_as_template(&v1).unwrap();
        let v1 = store.load_template_instance(&v1.id).unwrap();
        assert_eq!(stats(&v1), (300, 10));
        assert_eq!(v1.template_id, Some(base.id.clone()));

        let mut v2 = store.create_variant_instance_of(&v1).unwrap();
        v2.component_mut::<Enemy>().unwrap().mana = 20;
        store.save_as_template(&v2).unwrap();
        assert_eq!(stats(&store.load_template_instance(&v2.id).unwrap()), (300, 20));

        // Later edits up the chain flow down to untouched fields.
        let mut v1 = v1;
        v1.component_mut::<Enemy>().unwrap().health = 400;
        store.save_as_template(&v1).unwrap();
        assert_eq!(stats(&store.load_template_instance(&v2.id).unwrap()), (400, 20));
    }

    #[test]
    fn variant_blob_holds_only_the_override() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();
        let mut v1 = store.create_variant_instance_of(&base).unwrap();
        v1.component_mut::<Enemy>().unwrap().health = 300;
        store.save_as_template(&v1).unwrap();

        let stored = store.read_stored(&v1.id).unwrap();
        assert_eq!(stored.template_id, Some(base.id.clone()));
        assert!(stored.diff_fields.is_empty());
        match stored.diff_components.as_slice() {
            [ComponentDelta::Patch { id, fields, removed }] => {
                assert_eq!(id, "stats");
                assert_eq!(fields.len(), 1);
                assert_eq!(fields.get("health"), Some(&serde_json::json!(300)));
                assert!(removed.is_empty());
            }
            other => panic!("unexpected diff {other:?}"),
        }

        let root = store.read_stored(&base.id).unwrap();
        assert!(root.is_root());
        assert!(root.diff_fields.contains_key("name"));
    }

    #[test]
    fn component_inserted_ahead_of_inherited_ones_keeps_its_place() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();
        let mut variant = store.create_variant_instance_of(&base).unwrap();
        variant.components.insert(0, sword("blade", 5));
        store.save_as_template(&variant).unwrap();

        let back = store.load_template_instance(&variant.id).unwrap();
        let ids: Vec<&str> = back.components.iter().map(ComponentData::id).collect();
        assert_eq!(ids, vec!["blade", "stats"]);
        assert_eq!(back, variant);

        // Appending matches what replay produces, so no order is written.
        let mut tail = store.create_variant_instance_of(&base).unwrap();
        tail.components.push(sword("blade", 5));
        store.save_as_template(&tail).unwrap();
        assert_eq!(store.read_stored(&tail.id).unwrap().component_order, None);
    }

    #[test]
    fn unsaved_instance_cannot_be_branched() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();

        let instance = store.create_variant_instance_of(&base).unwrap();
        let err = store.create_variant_instance_of(&instance).unwrap_err();
        assert!(matches!(err, TemplateError::NotATemplate(ref id) if *id == instance.id));

        let origin_id = instance.template_id.clone().unwrap();
        let origin = store.load_template_instance(&origin_id).unwrap();
        let sibling = store.create_variant_instance_of(&origin).unwrap();
        assert_eq!(sibling.template_id, instance.template_id);
        assert_ne!(sibling.id, instance.id);
    }

    #[test]
    fn lazy_and_eager_modes_agree() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();
        let mut v1 = store.create_variant_instance_of(&base).unwrap();
        v1.name = Some("hobgoblin".into());
        store.save_as_template(&v1).unwrap();
        let mut v2 = store.create_variant_instance_of(&v1).unwrap();
        v2.component_mut::<Enemy>().unwrap().mana = 99;
        store.save_as_template(&v2).unwrap();

        let ids = store.get_all_entity_ids().unwrap();
        assert_eq!(ids.len(), 3);
        let lazy: Vec<Record> = ids.iter().map(|id| store.load_template_instance(id).unwrap()).collect();

        assert_eq!(store.load_all_template_files_into_memory().unwrap(), 3);
        assert!(store.is_eager());
        assert_eq!(store.get_all_entity_ids().unwrap(), ids);
        let eager: Vec<Record> = ids.iter().map(|id| store.load_template_instance(id).unwrap()).collect();
        assert_eq!(lazy, eager);
    }

    #[test]
    fn saves_keep_the_eager_cache_current() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();
        store.load_all_template_files_into_memory().unwrap();

        let mut v1 = store.create_variant_instance_of(&base).unwrap();
        v1.component_mut::<Enemy>().unwrap().health = 1;
        store.save_as_template(&v1).unwrap();

        assert!(store.is_eager());
        assert!(store.is_template(&v1.id));
        assert_eq!(store.get_all_entity_ids().unwrap().len(), 2);
        assert_eq!(stats(&store.load_template_instance(&v1.id).unwrap()), (1, 10));

        store.unload_cache();
        assert_eq!(stats(&store.load_template_instance(&v1.id).unwrap()), (1, 10));
    }

    #[test]
    fn removed_component_stays_removed() {
        let mut store = store();
        let base = goblin().with_component(sword("blade", 5));
        store.save_as_template(&base).unwrap();

        let mut mage = store.create_variant_instance_of(&base).unwrap();
        mage.components.retain(|c| c.id() != "blade");
        store.save_as_template(&mage).unwrap();

        let loaded = store.load_template_instance(&mage.id).unwrap();
        assert_eq!(loaded.components, vec![enemy("stats", 100, 10)]);
        assert!(loaded.component::<Sword>().is_err());
    }

    #[test]
    fn missing_parent_is_reported() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();
        let v1 = store.create_variant_instance_of(&base).unwrap();
        store.save_as_template(&v1).unwrap();

        let mut blobs = store.into_blobs();
        blobs.remove(base.id.as_str());
        let store: TemplateStore<Record> = TemplateStore::new(blobs);

        let err = store.load_template_instance(&v1.id).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MissingParent { ref id, ref parent } if *id == v1.id && *parent == base.id
        ));
        assert!(matches!(
            store.load_template_instance(&base.id),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn saving_against_an_unsaved_parent_fails() {
        let mut store = store();
        let mut orphan = goblin();
        orphan.template_id = Some(EntityId::from("never-saved"));
        let err = store.save_as_template(&orphan).unwrap_err();
        assert!(matches!(err, TemplateError::NotATemplate(_)));
        assert!(store.get_all_entity_ids().unwrap().is_empty());
    }

    #[test]
    fn chain_cycles_are_refused() {
        let mut store = store();
        let mut base = goblin();
        store.save_as_template(&base).unwrap();
        let v1 = store.create_variant_instance_of(&base).unwrap();
        store.save_as_template(&v1).unwrap();

        base.template_id = Some(v1.id.clone());
        let err = store.save_as_template(&base).unwrap_err();
        assert!(matches!(err, TemplateError::Cycle(ref id) if *id == base.id));
    }

    #[test]
    fn corrupt_blob_fails_bulk_load_without_caching() {
        let mut store = store();
        let base = goblin();
        store.save_as_template(&base).unwrap();

        let mut blobs = store.into_blobs();
        blobs.write("broken", b"not json").unwrap();
        let mut store: TemplateStore<Record> = TemplateStore::new(blobs);

        match store.load_all_template_files_into_memory() {
            Err(TemplateError::BulkLoad { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, EntityId::from("broken"));
            }
            other => panic!("expected a bulk load failure, got {:?}", other.map(|_| ())),
        }
        assert!(!store.is_eager());
        assert_eq!(stats(&store.load_template_instance(&base.id).unwrap()), (100, 10));
    }

    #[test]
    fn pretty_json_is_still_loadable() {
        let mut store = store().with_pretty_json(true);
        let base = goblin();
        store.save_as_template(&base).unwrap();

        let blob = store.blobs().read(base.id.as_str()).unwrap().unwrap();
        assert!(blob.contains(&b'\n'));
        assert_eq!(store.load_template_instance(&base.id).unwrap(), base);
    }
}
