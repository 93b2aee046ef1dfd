//! Conversion between typed entities and attribute maps.

use crate::entity::EntityId;
use crate::error::CoreResult;
use entidb_codec::Value;

/// Trait for types storable in a [`crate::Collection`].
///
/// Implementors provide:
/// - `entity_id()`: the entity's identifier, or `None` if it has not been
///   assigned one yet (only valid for a value about to be inserted).
/// - `to_attrs()`: the entity's attribute map.
/// - `from_attrs()`: rehydrates an entity from its stored id and map.
///
/// # Example
///
/// ```rust,ignore
/// use entidb_core::{Entity, EntityId};
/// use entidb_codec::Value;
///
/// struct User {
///     id: Option<EntityId>,
///     name: String,
///     age: i64,
/// }
///
/// impl Entity for User {
///     fn entity_id(&self) -> Option<EntityId> {
///         self.id.clone()
///     }
///
///     fn to_attrs(&self) -> Value {
///         Value::map(vec![
///             (Value::Text("name".into()), Value::Text(self.name.clone())),
///             (Value::Text("age".into()), Value::Integer(self.age)),
///         ])
///     }
///
///     fn from_attrs(id: &EntityId, attrs: &Value) -> CoreResult<Self> {
///         // ... parse fields from attrs
///         # unimplemented!()
///     }
/// }
/// ```
pub trait Entity: Sized {
    /// Returns the entity's identifier, if already assigned.
    fn entity_id(&self) -> Option<EntityId>;

    /// Converts the entity to its attribute-map representation.
    fn to_attrs(&self) -> Value;

    /// Rehydrates an entity from its stored id and attribute map.
    fn from_attrs(id: &EntityId, attrs: &Value) -> CoreResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[derive(Debug, Clone, PartialEq)]
    struct TestEntity {
        id: Option<EntityId>,
        name: String,
        value: i64,
    }

    impl Entity for TestEntity {
        fn entity_id(&self) -> Option<EntityId> {
            self.id.clone()
        }

        fn to_attrs(&self) -> Value {
            Value::map(vec![
                (Value::Text("name".into()), Value::Text(self.name.clone())),
                (Value::Text("value".into()), Value::Integer(self.value)),
            ])
        }

        fn from_attrs(id: &EntityId, attrs: &Value) -> CoreResult<Self> {
            let map = attrs
                .as_map()
                .ok_or_else(|| CoreError::collection_type_mismatch("expected map"))?;

            let name = map
                .iter()
                .find(|(k, _)| k.as_text() == Some("name"))
                .and_then(|(_, v)| v.as_text())
                .ok_or_else(|| CoreError::collection_type_mismatch("missing name"))?
                .to_string();

            let value = map
                .iter()
                .find(|(k, _)| k.as_text() == Some("value"))
                .and_then(|(_, v)| v.as_integer())
                .ok_or_else(|| CoreError::collection_type_mismatch("missing value"))?;

            Ok(TestEntity { id: Some(id.clone()), name, value })
        }
    }

    #[test]
    fn to_from_attrs_roundtrip() {
        let id = EntityId::new();
        let entity = TestEntity { id: Some(id.clone()), name: "test".to_string(), value: 42 };

        let attrs = entity.to_attrs();
        let decoded = TestEntity::from_attrs(&id, &attrs).unwrap();

        assert_eq!(entity, decoded);
    }

    #[test]
    fn entity_id_may_be_unassigned() {
        let entity = TestEntity { id: None, name: "test".to_string(), value: 100 };
        assert_eq!(entity.entity_id(), None);
    }
}
