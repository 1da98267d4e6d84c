//! Table entities and their two-part keys.

use std::fmt;

use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Two-part key uniquely identifying an entity within a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityKey {
    /// Partition the entity belongs to.
    pub partition_key: String,
    /// Key of the entity within its partition.
    pub row_key: String,
}

impl EntityKey {
    /// Creates a new entity key.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }

    /// Returns true if both key parts are present.
    pub fn is_complete(&self) -> bool {
        !self.partition_key.is_empty() && !self.row_key.is_empty()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}

/// A table record identified by partition and row key.
///
/// Everything beyond the key is an opaque property map. The `timestamp`
/// and `etag` fields are assigned by the store on write and are ignored
/// when submitting entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    /// Partition the entity belongs to.
    pub partition_key: String,
    /// Key of the entity within its partition.
    pub row_key: String,
    /// Last modification time as reported by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    /// Opaque version tag as reported by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// User-defined properties.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Entity {
    /// Creates an entity with no properties.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            timestamp: None,
            etag: None,
            properties: Map::new(),
        }
    }

    /// Creates an entity whose properties are taken from a serializable value.
    ///
    /// The value must serialize into a JSON object.
    pub fn from_serializable<T: Serialize>(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        let Value::Object(properties) = serde_json::to_value(value)? else {
            return Err(Error::invalid_input().with_message("entity payload must be an object"));
        };

        Ok(Self {
            properties,
            ..Self::new(partition_key, row_key)
        })
    }

    /// Deserializes the property map into a typed value.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.properties.clone()))?)
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns a property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns the entity key.
    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.partition_key, &self.row_key)
    }

    /// Returns true if both key parts are present.
    pub fn has_key(&self) -> bool {
        !self.partition_key.is_empty() && !self.row_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    #[test]
    fn test_key_ordering() {
        let a = EntityKey::new("p1", "r2");
        let b = EntityKey::new("p2", "r1");
        assert!(a < b);
        assert_eq!(a.to_string(), "p1/r2");
    }

    #[test]
    fn test_serialized_shape() {
        let entity = Entity::new("users", "42").with_property("Name", "ada");
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            value,
            json!({ "PartitionKey": "users", "RowKey": "42", "Name": "ada" })
        );
    }

    #[test]
    fn test_typed_payload() {
        let profile = Profile {
            name: "ada".into(),
            age: 36,
        };
        let entity = Entity::from_serializable("users", "1", &profile).unwrap();
        assert_eq!(entity.property("age"), Some(&json!(36)));
        assert_eq!(entity.deserialize_into::<Profile>().unwrap(), profile);
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let error = Entity::from_serializable("users", "1", &42).unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_key() {
        assert!(!Entity::new("", "r").has_key());
        assert!(!EntityKey::new("p", "").is_complete());
        assert!(Entity::new("p", "r").has_key());
    }
}
