//! Typed collection runtime.

use crate::collection::codec::Entity;
use crate::collection::locks::LockCache;
use crate::collection::query::Query;
use crate::config::CollectionConfig;
use crate::entity::{is_reserved_id, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::index::{FtsIndex, Index, IndexKey, IndexManager, IndexVariant};
use entidb_codec::Value;
use entidb_storage::StoragePort;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A named, typed container of entities backed by one [`StoragePort`].
///
/// `Collection<T>` maintains zero or more field indexes, serializes
/// mutations on the same entity id via a bounded lock cache, and executes
/// [`Query`] trees through an index-aware planner.
pub struct Collection<T: Entity> {
    name: String,
    storage: Arc<dyn StoragePort>,
    indexes: Mutex<IndexManager>,
    locks: Mutex<LockCache>,
    config: CollectionConfig,
    disposed: AtomicBool,
    _marker: PhantomData<T>,
}

impl<T: Entity> Collection<T> {
    /// Creates a new collection named `name` over `storage`.
    #[must_use]
    pub fn new(name: impl Into<String>, storage: Arc<dyn StoragePort>, config: CollectionConfig) -> Self {
        let locks = LockCache::new(config.max_cached_locks);
        Self {
            name: name.into(),
            storage,
            indexes: Mutex::new(IndexManager::new()),
            locks: Mutex::new(locks),
            config,
            disposed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// Returns the collection's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(CoreError::CollectionDisposed);
        }
        Ok(())
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks.lock().get(id)
    }

    fn log(&self, op: &str, id: &str, outcome: &str) {
        if self.config.enable_debug_logging {
            tracing::debug!(collection = %self.name, op, id, outcome, "collection operation");
        }
    }

    // ---- CRUD ----

    /// Inserts `entity`, generating a fresh id if it doesn't have one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityAlreadyExists`] if the id is already
    /// present.
    pub fn insert(&self, entity: &T) -> CoreResult<EntityId> {
        self.ensure_open()?;
        let id = entity.entity_id().unwrap_or_default();
        let guard = self.lock_for(id.as_str());
        let _held = guard.lock();

        let attrs = entity.to_attrs();
        self.storage.insert(id.as_str(), attrs.clone()).map_err(|e| match e {
            entidb_storage::StorageError::AlreadyExists { id } => CoreError::entity_already_exists(id),
            other => CoreError::Storage(other),
        })?;
        self.indexes.lock().insert(id.as_str(), &attrs)?;
        self.log("insert", id.as_str(), "ok");
        Ok(id)
    }

    /// Inserts every entity in `entities`, in order.
    ///
    /// Best-effort: if an insert mid-batch fails, every entity inserted
    /// before it remains applied in storage; the error is propagated and
    /// no id is returned for the remainder of the batch.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn insert_many(&self, entities: &[T]) -> CoreResult<Vec<EntityId>> {
        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            ids.push(self.insert(entity)?);
        }
        Ok(ids)
    }

    /// Reads and rehydrates the entity with id `id`, if present.
    pub fn get(&self, id: &EntityId) -> CoreResult<Option<T>> {
        self.ensure_open()?;
        match self.storage.get(id.as_str())? {
            Some(attrs) => Ok(Some(T::from_attrs(id, &attrs)?)),
            None => Ok(None),
        }
    }

    /// Like [`Collection::get`], but fails with
    /// [`CoreError::EntityNotFound`] instead of returning `None`.
    pub fn get_or_throw(&self, id: &EntityId) -> CoreResult<T> {
        self.get(id)?.ok_or_else(|| CoreError::entity_not_found(id.as_str()))
    }

    /// Returns a rehydrated entity for every id in `ids` that exists;
    /// missing ids are silently omitted.
    pub fn get_many(&self, ids: &[EntityId]) -> CoreResult<Vec<T>> {
        self.ensure_open()?;
        let mut result = Vec::new();
        for id in ids {
            if let Some(entity) = self.get(id)? {
                result.push(entity);
            }
        }
        Ok(result)
    }

    /// Rehydrates every non-reserved entity in the collection.
    pub fn get_all(&self) -> CoreResult<Vec<T>> {
        self.ensure_open()?;
        let all = self.storage.get_all()?;
        all.iter()
            .filter(|(id, _)| !is_reserved_id(id))
            .map(|(id, attrs)| T::from_attrs(&EntityId::from_string(id.clone()), attrs))
            .collect()
    }

    /// Returns whether `id` exists.
    pub fn exists(&self, id: &EntityId) -> CoreResult<bool> {
        self.ensure_open()?;
        Ok(self.storage.exists(id.as_str())?)
    }

    fn update_locked(&self, id: &EntityId, attrs: Value) -> CoreResult<()> {
        let old = self.storage.get(id.as_str())?;
        self.storage.update(id.as_str(), attrs.clone()).map_err(|e| match e {
            entidb_storage::StorageError::NotFound { id } => CoreError::entity_not_found(id),
            other => CoreError::Storage(other),
        })?;
        let mut indexes = self.indexes.lock();
        if let Some(old) = old {
            indexes.remove(id.as_str(), &old)?;
        }
        indexes.insert(id.as_str(), &attrs)?;
        Ok(())
    }

    /// Replaces the stored attributes for `entity`'s id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::invalid_argument`] if `entity` has no id, or
    /// [`CoreError::EntityNotFound`] if the id doesn't exist.
    pub fn update(&self, entity: &T) -> CoreResult<()> {
        self.ensure_open()?;
        let id = entity
            .entity_id()
            .ok_or_else(|| CoreError::invalid_argument("update requires an entity with an id"))?;
        let guard = self.lock_for(id.as_str());
        let _held = guard.lock();
        self.update_locked(&id, entity.to_attrs())?;
        self.log("update", id.as_str(), "ok");
        Ok(())
    }

    /// Reads the entity at `id`, applies `f`, and writes the result back,
    /// all under that id's lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntityNotFound`] if `id` doesn't exist.
    pub fn update_where(&self, id: &EntityId, f: impl FnOnce(T) -> T) -> CoreResult<T> {
        self.ensure_open()?;
        let guard = self.lock_for(id.as_str());
        let _held = guard.lock();

        let current = self
            .storage
            .get(id.as_str())?
            .ok_or_else(|| CoreError::entity_not_found(id.as_str()))?;
        let entity = T::from_attrs(id, &current)?;
        let updated = f(entity);
        self.update_locked(id, updated.to_attrs())?;
        Ok(updated)
    }

    /// Inserts `entity` if its id is absent, otherwise replaces it.
    pub fn upsert(&self, entity: &T) -> CoreResult<EntityId> {
        self.ensure_open()?;
        let id = entity.entity_id().unwrap_or_default();
        let guard = self.lock_for(id.as_str());
        let _held = guard.lock();

        let old = self.storage.get(id.as_str())?;
        let attrs = entity.to_attrs();
        self.storage.upsert(id.as_str(), attrs.clone())?;

        let mut indexes = self.indexes.lock();
        if let Some(old) = old {
            indexes.remove(id.as_str(), &old)?;
        }
        indexes.insert(id.as_str(), &attrs)?;
        self.log("upsert", id.as_str(), "ok");
        Ok(id)
    }

    /// Deletes the entity at `id`. Returns whether anything was removed.
    pub fn delete(&self, id: &EntityId) -> CoreResult<bool> {
        self.ensure_open()?;
        let guard = self.lock_for(id.as_str());
        let _held = guard.lock();

        let old = self.storage.get(id.as_str())?;
        let removed = self.storage.delete(id.as_str())?;
        if let Some(old) = old {
            self.indexes.lock().remove(id.as_str(), &old)?;
        }
        self.log("delete", id.as_str(), if removed { "removed" } else { "absent" });
        Ok(removed)
    }

    /// Like [`Collection::delete`], but fails with
    /// [`CoreError::EntityNotFound`] if `id` doesn't exist.
    pub fn delete_or_throw(&self, id: &EntityId) -> CoreResult<()> {
        if self.delete(id)? {
            Ok(())
        } else {
            Err(CoreError::entity_not_found(id.as_str()))
        }
    }

    /// Deletes every id in `ids`. Returns the number actually removed.
    pub fn delete_many(&self, ids: &[EntityId]) -> CoreResult<usize> {
        let mut count = 0;
        for id in ids {
            if self.delete(id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Deletes every entity in the collection, preserving reserved ids,
    /// and clears all index entries.
    pub fn delete_all(&self) -> CoreResult<()> {
        self.ensure_open()?;
        let all = self.storage.get_all()?;
        for id in all.keys().filter(|id| !is_reserved_id(id)) {
            self.storage.delete(id)?;
        }
        self.indexes.lock().clear_all_entries();
        Ok(())
    }

    // ---- Query execution ----

    /// Evaluates `query` against every entity, returning matches.
    pub fn find(&self, query: &Query) -> CoreResult<Vec<T>> {
        self.ensure_open()?;
        let all = self.storage.get_all()?;
        let candidate_ids = self.candidate_ids(query)?;

        let ids: Vec<String> = match candidate_ids {
            Some(ids) => ids,
            None => all.keys().filter(|id| !is_reserved_id(id)).cloned().collect(),
        };

        let mut results = Vec::new();
        for id in ids {
            if is_reserved_id(&id) {
                continue;
            }
            let Some(attrs) = all.get(&id) else { continue };
            if self.evaluate(query, attrs, &id)? {
                results.push(T::from_attrs(&EntityId::from_string(id), attrs)?);
            }
        }
        Ok(results)
    }

    /// Returns the first match for `query`, if any.
    pub fn find_one(&self, query: &Query) -> CoreResult<Option<T>> {
        Ok(self.find(query)?.into_iter().next())
    }

    /// Like [`Collection::find_one`], but fails with
    /// [`CoreError::EntityNotFound`] if nothing matches.
    pub fn find_one_or_throw(&self, query: &Query) -> CoreResult<T> {
        self.find_one(query)?.ok_or_else(|| CoreError::entity_not_found("<query>"))
    }

    /// Counts entities matching `query`, or the collection's total size
    /// when `query` is `None`.
    pub fn count_where(&self, query: Option<&Query>) -> CoreResult<usize> {
        match query {
            Some(query) => Ok(self.find(query)?.len()),
            None => Ok(self.get_all()?.len()),
        }
    }

    /// Returns a lazy iterator over every entity, snapshotting storage at
    /// call time. Not restartable — create a new iterator to re-scan.
    pub fn stream(&self) -> CoreResult<impl Iterator<Item = CoreResult<T>> + '_> {
        self.ensure_open()?;
        let all = self.storage.get_all()?;
        let ids: Vec<String> = all.keys().filter(|id| !is_reserved_id(id)).cloned().collect();
        Ok(ids.into_iter().map(move |id| {
            let attrs = all.get(&id).cloned().expect("id came from this snapshot");
            T::from_attrs(&EntityId::from_string(id), &attrs)
        }))
    }

    fn candidate_ids(&self, query: &Query) -> CoreResult<Option<Vec<String>>> {
        match query {
            Query::And(conjuncts) => {
                let mut candidate: Option<Vec<String>> = None;
                for conjunct in conjuncts {
                    if let Some(ids) = self.single_indexable(conjunct)? {
                        candidate = Some(match candidate {
                            Some(existing) => {
                                let ids: HashSet<&String> = ids.iter().collect();
                                existing.into_iter().filter(|id| ids.contains(id)).collect()
                            }
                            None => ids,
                        });
                    }
                }
                Ok(candidate)
            }
            other => self.single_indexable(other),
        }
    }

    fn range_candidates(
        &self,
        indexes: &IndexManager,
        field: &str,
        lo: Option<&Value>,
        hi: Option<&Value>,
        include_lower: bool,
        include_upper: bool,
    ) -> CoreResult<Option<Vec<String>>> {
        if !indexes.has_index(field) {
            return Ok(None);
        }
        let lo_key = lo.and_then(IndexKey::from_value);
        let hi_key = hi.and_then(IndexKey::from_value);
        match indexes.range_search(field, lo_key.as_ref(), hi_key.as_ref(), include_lower, include_upper) {
            Ok(ids) => Ok(Some(ids)),
            Err(CoreError::IndexUnsupportedType { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn fulltext_candidates(
        &self,
        indexes: &IndexManager,
        field: &str,
        search: impl FnOnce(&FtsIndex) -> Vec<String>,
    ) -> CoreResult<Option<Vec<String>>> {
        Ok(indexes.fulltext(field).map(search))
    }

    fn single_indexable(&self, query: &Query) -> CoreResult<Option<Vec<String>>> {
        let indexes = self.indexes.lock();
        match query {
            Query::Equals { field, value } => {
                if !indexes.has_index(field) {
                    return Ok(None);
                }
                match IndexKey::from_value(value) {
                    Some(key) => Ok(Some(indexes.search(field, &key)?)),
                    None => Ok(Some(Vec::new())),
                }
            }
            Query::In { field, values } => {
                if !indexes.has_index(field) {
                    return Ok(None);
                }
                let mut seen = HashSet::new();
                let mut result = Vec::new();
                for value in values {
                    if let Some(key) = IndexKey::from_value(value) {
                        for id in indexes.search(field, &key)? {
                            if seen.insert(id.clone()) {
                                result.push(id);
                            }
                        }
                    }
                }
                Ok(Some(result))
            }
            Query::GreaterThan { field, value } => {
                self.range_candidates(&indexes, field, Some(value), None, false, false)
            }
            Query::GreaterThanOrEquals { field, value } => {
                self.range_candidates(&indexes, field, Some(value), None, true, false)
            }
            Query::LessThan { field, value } => {
                self.range_candidates(&indexes, field, None, Some(value), false, false)
            }
            Query::LessThanOrEquals { field, value } => {
                self.range_candidates(&indexes, field, None, Some(value), false, true)
            }
            Query::Between { field, lo, hi, include_lower, include_upper } => {
                self.range_candidates(&indexes, field, Some(lo), Some(hi), *include_lower, *include_upper)
            }
            Query::FullTextQuery { field, text } => {
                self.fulltext_candidates(&indexes, field, |idx| idx.search(text))
            }
            Query::FullTextPhraseQuery { field, phrase } => {
                self.fulltext_candidates(&indexes, field, |idx| idx.search_phrase(phrase))
            }
            Query::FullTextAnyQuery { field, terms } => {
                self.fulltext_candidates(&indexes, field, |idx| idx.search_any(terms))
            }
            Query::FullTextPrefixQuery { field, prefix } => {
                self.fulltext_candidates(&indexes, field, |idx| idx.search_prefix(prefix))
            }
            Query::FullTextProximityQuery { field, terms, max_distance } => {
                self.fulltext_candidates(&indexes, field, |idx| idx.search_proximity(terms, *max_distance))
            }
            _ => Ok(None),
        }
    }

    fn evaluate(&self, query: &Query, attrs: &Value, id: &str) -> CoreResult<bool> {
        match query {
            Query::And(qs) => {
                for q in qs {
                    if !self.evaluate(q, attrs, id)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Query::Or(qs) => {
                for q in qs {
                    if self.evaluate(q, attrs, id)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Query::Not(q) => Ok(!self.evaluate(q, attrs, id)?),
            Query::FullTextQuery { field, text } => self.fulltext_membership(field, id, |idx| idx.search(text)),
            Query::FullTextPhraseQuery { field, phrase } => {
                self.fulltext_membership(field, id, |idx| idx.search_phrase(phrase))
            }
            Query::FullTextAnyQuery { field, terms } => {
                self.fulltext_membership(field, id, |idx| idx.search_any(terms))
            }
            Query::FullTextPrefixQuery { field, prefix } => {
                self.fulltext_membership(field, id, |idx| idx.search_prefix(prefix))
            }
            Query::FullTextProximityQuery { field, terms, max_distance } => {
                self.fulltext_membership(field, id, |idx| idx.search_proximity(terms, *max_distance))
            }
            other => Ok(other.matches(attrs)),
        }
    }

    fn fulltext_membership(
        &self,
        field: &str,
        id: &str,
        search: impl FnOnce(&FtsIndex) -> Vec<String>,
    ) -> CoreResult<bool> {
        let indexes = self.indexes.lock();
        let index = indexes.fulltext(field).ok_or_else(|| CoreError::index_not_found(field))?;
        Ok(search(index).iter().any(|found| found == id))
    }

    // ---- Index management ----

    /// Creates an index of `variant` on `field`, populating it from every
    /// existing entity.
    pub fn create_index(&self, field: impl Into<String>, variant: IndexVariant) -> CoreResult<()> {
        self.ensure_open()?;
        let field = field.into();
        self.indexes.lock().create_index(field, variant)?;
        let all = self.storage.get_all()?;
        let mut indexes = self.indexes.lock();
        for (id, attrs) in all.iter().filter(|(id, _)| !is_reserved_id(id)) {
            indexes.insert(id, attrs)?;
        }
        Ok(())
    }

    /// Removes the index on `field`.
    pub fn remove_index(&self, field: &str) -> CoreResult<()> {
        self.ensure_open()?;
        self.indexes.lock().remove_index(field)
    }

    /// Clears and repopulates every registered index from current entities.
    pub fn rebuild_all_indexes(&self) -> CoreResult<()> {
        self.ensure_open()?;
        let all = self.storage.get_all()?;
        let mut indexes = self.indexes.lock();
        indexes.clear_all_entries();
        for (id, attrs) in all.iter().filter(|(id, _)| !is_reserved_id(id)) {
            indexes.insert(id, attrs)?;
        }
        Ok(())
    }

    /// Clears every index's entries, keeping their definitions.
    pub fn clear_all_index_entries(&self) {
        self.indexes.lock().clear_all_entries();
    }

    /// Removes every index definition.
    pub fn remove_all_indexes(&self) {
        self.indexes.lock().remove_all();
    }

    // ---- Lifecycle ----

    /// Flushes any buffered state to the underlying storage collaborator.
    pub fn flush(&self) -> CoreResult<()> {
        self.ensure_open()?;
        Ok(())
    }

    /// Marks the collection disposed; every operation after this fails
    /// with [`CoreError::CollectionDisposed`].
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use entidb_storage::InMemoryStorage;

    #[derive(Debug, Clone, PartialEq)]
    struct TestUser {
        id: Option<EntityId>,
        name: String,
        age: i64,
    }

    impl Entity for TestUser {
        fn entity_id(&self) -> Option<EntityId> {
            self.id.clone()
        }

        fn to_attrs(&self) -> Value {
            Value::map(vec![
                (Value::Text("name".into()), Value::Text(self.name.clone())),
                (Value::Text("age".into()), Value::Integer(self.age)),
            ])
        }

        fn from_attrs(id: &EntityId, attrs: &Value) -> CoreResult<Self> {
            let map = attrs.as_map().ok_or_else(|| CoreError::collection_type_mismatch("expected map"))?;
            let name = map
                .iter()
                .find(|(k, _)| k.as_text() == Some("name"))
                .and_then(|(_, v)| v.as_text())
                .unwrap_or("unknown")
                .to_string();
            let age = map
                .iter()
                .find(|(k, _)| k.as_text() == Some("age"))
                .and_then(|(_, v)| v.as_integer())
                .unwrap_or(0);
            Ok(TestUser { id: Some(id.clone()), name, age })
        }
    }

    fn collection() -> Collection<TestUser> {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStorage::new());
        storage.open().unwrap();
        Collection::new("users", storage, CollectionConfig::default())
    }

    #[test]
    fn insert_and_get() {
        let collection = collection();
        let user = TestUser { id: None, name: "Alice".into(), age: 30 };
        let id = collection.insert(&user).unwrap();

        let found = collection.get(&id).unwrap().unwrap();
        assert_eq!(found.name, "Alice");
    }

    #[test]
    fn insert_duplicate_fails() {
        let collection = collection();
        let id = EntityId::from_string("u1");
        let user = TestUser { id: Some(id.clone()), name: "Alice".into(), age: 30 };
        collection.insert(&user).unwrap();
        assert!(collection.insert(&user).is_err());
    }

    #[test]
    fn update_requires_id() {
        let collection = collection();
        let user = TestUser { id: None, name: "Alice".into(), age: 30 };
        assert!(collection.update(&user).is_err());
    }

    #[test]
    fn update_missing_entity_fails() {
        let collection = collection();
        let user = TestUser { id: Some(EntityId::from_string("missing")), name: "Alice".into(), age: 30 };
        assert!(collection.update(&user).is_err());
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let collection = collection();
        let id = EntityId::from_string("u1");
        let user = TestUser { id: Some(id.clone()), name: "Alice".into(), age: 30 };
        collection.upsert(&user).unwrap();

        let updated = TestUser { id: Some(id.clone()), name: "Alice".into(), age: 31 };
        collection.upsert(&updated).unwrap();

        assert_eq!(collection.get(&id).unwrap().unwrap().age, 31);
    }

    #[test]
    fn delete_removes_entity() {
        let collection = collection();
        let user = TestUser { id: None, name: "Bob".into(), age: 25 };
        let id = collection.insert(&user).unwrap();

        assert!(collection.delete(&id).unwrap());
        assert!(!collection.exists(&id).unwrap());
        assert!(!collection.delete(&id).unwrap());
    }

    #[test]
    fn get_all_excludes_reserved_ids() {
        let collection = collection();
        collection.storage.upsert(crate::entity::SCHEMA_VERSION_ID, Value::Null).unwrap();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();

        assert_eq!(collection.get_all().unwrap().len(), 1);
    }

    #[test]
    fn find_with_hash_index() {
        let collection = collection();
        collection.create_index("name", IndexVariant::Hash).unwrap();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();
        collection.insert(&TestUser { id: None, name: "Bob".into(), age: 25 }).unwrap();

        let query = Query::Equals { field: "name".into(), value: Value::Text("Alice".into()) };
        let found = collection.find(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Alice");
    }

    #[test]
    fn find_with_ordered_range() {
        let collection = collection();
        collection.create_index("age", IndexVariant::Ordered).unwrap();
        collection.insert(&TestUser { id: None, name: "Young".into(), age: 20 }).unwrap();
        collection.insert(&TestUser { id: None, name: "Old".into(), age: 50 }).unwrap();

        let query = Query::GreaterThan { field: "age".into(), value: Value::Integer(25) };
        let found = collection.find(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Old");
    }

    #[test]
    fn find_without_index_falls_back_to_scan() {
        let collection = collection();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();

        let query = Query::Equals { field: "name".into(), value: Value::Text("Alice".into()) };
        assert_eq!(collection.find(&query).unwrap().len(), 1);
    }

    #[test]
    fn count_where_without_query_is_total() {
        let collection = collection();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();
        collection.insert(&TestUser { id: None, name: "Bob".into(), age: 25 }).unwrap();
        assert_eq!(collection.count_where(None).unwrap(), 2);
    }

    #[test]
    fn dispose_rejects_further_operations() {
        let collection = collection();
        collection.dispose();
        let user = TestUser { id: None, name: "Alice".into(), age: 30 };
        assert!(matches!(collection.insert(&user), Err(CoreError::CollectionDisposed)));
    }

    #[test]
    fn rebuild_all_indexes_repopulates() {
        let collection = collection();
        collection.create_index("name", IndexVariant::Hash).unwrap();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();
        collection.clear_all_index_entries();
        collection.rebuild_all_indexes().unwrap();

        let query = Query::Equals { field: "name".into(), value: Value::Text("Alice".into()) };
        assert_eq!(collection.find(&query).unwrap().len(), 1);
    }

    #[test]
    fn stream_yields_every_entity() {
        let collection = collection();
        collection.insert(&TestUser { id: None, name: "Alice".into(), age: 30 }).unwrap();
        collection.insert(&TestUser { id: None, name: "Bob".into(), age: 25 }).unwrap();

        let names: Vec<String> = collection
            .stream()
            .unwrap()
            .map(|r| r.unwrap().name)
            .collect();
        assert_eq!(names.len(), 2);
    }
}
