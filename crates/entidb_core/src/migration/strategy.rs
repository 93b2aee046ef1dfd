//! Migration strategies — one reversible edge in the schema version graph.

use crate::entity::is_reserved_id;
use crate::error::CoreResult;
use entidb_codec::Value;
use entidb_storage::StoragePort;

/// A single schema transformation between two adjacent versions.
///
/// Strategies are registered with a [`super::MigrationManager`] and
/// composed into a path by version-graph search; each one only needs to
/// know how to move between its own two versions, in either direction.
pub trait MigrationStrategy: Send + Sync {
    /// The version this strategy starts from.
    fn from_version(&self) -> &str;

    /// The version this strategy produces.
    fn to_version(&self) -> &str;

    /// A short human-readable name, used in log entries.
    fn name(&self) -> &str;

    /// A human-readable description of what this strategy does. Defaults to
    /// `name()` when a strategy has nothing more specific to say.
    fn description(&self) -> &str {
        self.name()
    }

    /// Applies the forward transformation (`from_version` -> `to_version`)
    /// directly against `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::migration_step_failed`] (or a
    /// storage error) if the transform cannot complete.
    fn migrate_up(&self, storage: &dyn StoragePort) -> CoreResult<()>;

    /// Applies the inverse transformation (`to_version` -> `from_version`)
    /// directly against `storage`. Used when a migration path walks this
    /// strategy backwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CoreError::migration_step_failed`] (or a
    /// storage error) if the transform cannot complete.
    fn migrate_down(&self, storage: &dyn StoragePort) -> CoreResult<()>;
}

/// A transform applied to one entity's attribute map at a time.
///
/// Implementing this instead of [`MigrationStrategy`] directly gives a
/// *single-entity* strategy: the runtime maps `transform_up`/`transform_down`
/// across every non-reserved entity in storage, so the implementor never
/// hand-writes the `get_all`/iterate/write-back loop.
pub trait EntityTransform: Send + Sync {
    /// The version this transform starts from.
    fn from_version(&self) -> &str;

    /// The version this transform produces.
    fn to_version(&self) -> &str;

    /// A short human-readable name, used in log entries.
    fn name(&self) -> &str;

    /// Transforms one entity's attribute map forward.
    fn transform_up(&self, attrs: Value) -> Value;

    /// Transforms one entity's attribute map backward.
    fn transform_down(&self, attrs: Value) -> Value;
}

/// Adapts an [`EntityTransform`] into a [`MigrationStrategy`] that maps it
/// across every non-reserved entity in storage.
pub struct SingleEntityStrategy<E> {
    transform: E,
}

impl<E: EntityTransform> SingleEntityStrategy<E> {
    /// Wraps `transform` as a full migration strategy.
    pub fn new(transform: E) -> Self {
        Self { transform }
    }

    fn apply_per_entity(&self, storage: &dyn StoragePort, f: impl Fn(&E, Value) -> Value) -> CoreResult<()> {
        for (id, attrs) in storage.get_all()? {
            if is_reserved_id(&id) {
                continue;
            }
            storage.update(&id, f(&self.transform, attrs))?;
        }
        Ok(())
    }
}

impl<E: EntityTransform> MigrationStrategy for SingleEntityStrategy<E> {
    fn from_version(&self) -> &str {
        self.transform.from_version()
    }

    fn to_version(&self) -> &str {
        self.transform.to_version()
    }

    fn name(&self) -> &str {
        self.transform.name()
    }

    fn migrate_up(&self, storage: &dyn StoragePort) -> CoreResult<()> {
        self.apply_per_entity(storage, E::transform_up)
    }

    fn migrate_down(&self, storage: &dyn StoragePort) -> CoreResult<()> {
        self.apply_per_entity(storage, E::transform_down)
    }
}

/// A strategy that leaves every entity unchanged, used for version bumps
/// with no accompanying data change.
pub struct NoOpStrategy {
    from: String,
    to: String,
    name: String,
}

impl NoOpStrategy {
    /// Creates a no-op strategy bridging `from` and `to`, labeled `name` in
    /// log entries.
    pub fn new(from: impl Into<String>, to: impl Into<String>, name: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), name: name.into() }
    }
}

impl MigrationStrategy for NoOpStrategy {
    fn from_version(&self) -> &str {
        &self.from
    }

    fn to_version(&self) -> &str {
        &self.to
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn migrate_up(&self, _storage: &dyn StoragePort) -> CoreResult<()> {
        Ok(())
    }

    fn migrate_down(&self, _storage: &dyn StoragePort) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Renames one field, in either direction, across every entity.
    pub struct RenameField {
        pub from: &'static str,
        pub to: &'static str,
        pub old_field: &'static str,
        pub new_field: &'static str,
    }

    impl EntityTransform for RenameField {
        fn from_version(&self) -> &str {
            self.from
        }

        fn to_version(&self) -> &str {
            self.to
        }

        fn name(&self) -> &str {
            "rename_field"
        }

        fn transform_up(&self, attrs: Value) -> Value {
            rename(attrs, self.old_field, self.new_field)
        }

        fn transform_down(&self, attrs: Value) -> Value {
            rename(attrs, self.new_field, self.old_field)
        }
    }

    fn rename(attrs: Value, old_field: &str, new_field: &str) -> Value {
        let Some(entries) = attrs.as_map() else { return attrs };
        let renamed: Vec<(Value, Value)> = entries
            .iter()
            .cloned()
            .map(|(key, value)| {
                if key.as_text() == Some(old_field) {
                    (Value::Text(new_field.to_string()), value)
                } else {
                    (key, value)
                }
            })
            .collect();
        Value::map(renamed)
    }

    /// Builds a registrable [`MigrationStrategy`] from a [`RenameField`].
    pub fn rename_field_strategy(
        from: &'static str,
        to: &'static str,
        old_field: &'static str,
        new_field: &'static str,
    ) -> SingleEntityStrategy<RenameField> {
        SingleEntityStrategy::new(RenameField { from, to, old_field, new_field })
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::rename_field_strategy;
    use super::*;
    use entidb_storage::InMemoryStorage;

    fn storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.open().unwrap();
        storage
    }

    #[test]
    fn migrate_up_then_down_restores_original_entity() {
        let storage = storage();
        storage.insert("u1", Value::map(vec![(Value::Text("nm".into()), Value::Text("Alice".into()))])).unwrap();
        let original = storage.get("u1").unwrap().unwrap();

        let strategy = rename_field_strategy("1.0.0", "1.1.0", "nm", "name");
        strategy.migrate_up(&storage).unwrap();
        assert_eq!(storage.get("u1").unwrap().unwrap().as_map().unwrap()[0].0.as_text(), Some("name"));

        strategy.migrate_down(&storage).unwrap();
        assert_eq!(storage.get("u1").unwrap().unwrap(), original);
    }

    #[test]
    fn no_op_strategy_leaves_entities_untouched() {
        let storage = storage();
        storage.insert("u1", Value::Integer(1)).unwrap();
        let strategy = NoOpStrategy::new("1.0.0", "1.0.1", "bump");
        strategy.migrate_up(&storage).unwrap();
        strategy.migrate_down(&storage).unwrap();
        assert_eq!(storage.get("u1").unwrap(), Some(Value::Integer(1)));
    }
}
