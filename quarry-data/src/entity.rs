use std::fmt::Debug;

use quarry_core::ValidationErrors;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DataError;
use crate::navigation::Navigation;
use crate::value::{row_from_json, row_into_json, Row, Value};

/// Trait representing a persisted record type.
///
/// Entities cross the store boundary as [`Row`]s through their serde
/// representation. Only [`Entity::columns`] are persisted; navigation fields
/// must fall back to an empty default when absent (`#[serde(default)]`).
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// struct Book {
///     id: i64,
///     title: String,
///     #[serde(default)]
///     chapters: Vec<Chapter>,
/// }
///
/// impl Entity for Book {
///     type Key = i64;
///     fn table_name() -> &'static str { "books" }
///     fn key_column() -> &'static str { "id" }
///     fn columns() -> &'static [&'static str] { &["id", "title"] }
///     fn navigations() -> Vec<Navigation> {
///         vec![Navigation::collection::<Chapter>("chapters", "id", "book_id")]
///     }
///     fn key(&self) -> i64 { self.id }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    type Key: Into<Value> + Clone + Debug + Send + Sync + 'static;

    fn table_name() -> &'static str;

    /// Schema declared by the entity itself; the model may supply a default.
    fn schema() -> Option<&'static str> {
        None
    }

    fn key_column() -> &'static str;

    /// Persisted scalar properties, key column included.
    fn columns() -> &'static [&'static str];

    /// Related entities reachable from this one.
    fn navigations() -> Vec<Navigation> {
        Vec::new()
    }

    fn key(&self) -> Self::Key;

    /// The entity's own validation contract, run before every write.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Fully-qualified Rust type name, the identity used to look entities up in a `Model`.
pub fn type_name_of<T: Entity>() -> &'static str {
    std::any::type_name::<T>()
}

/// Serialize an entity into its persisted row.
pub fn to_row<T: Entity>(entity: &T) -> Result<Row, DataError> {
    let json = serde_json::to_value(entity)?;
    row_from_json(json, Some(T::columns())).ok_or_else(|| {
        DataError::Other(format!(
            "entity '{}' does not serialize to an object",
            type_name_of::<T>()
        ))
    })
}

/// Rebuild an entity from a stored row.
pub fn from_row<T: Entity>(row: Row) -> Result<T, DataError> {
    Ok(serde_json::from_value(row_into_json(row))?)
}

/// Read a single property off an entity through its serde representation.
pub fn property_value<T: Entity>(entity: &T, property: &str) -> Result<Value, DataError> {
    let json = serde_json::to_value(entity)?;
    Ok(json
        .get(property)
        .cloned()
        .map(Value::from_json)
        .unwrap_or(Value::Null))
}
