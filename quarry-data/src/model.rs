use std::collections::HashMap;
use std::marker::PhantomData;

use crate::entity::{type_name_of, Entity};
use crate::query::{Dialect, QueryBuilder};

/// Where and how an entity type is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub schema: Option<String>,
    pub table: String,
    pub key_column: String,
    pub columns: Vec<String>,
}

impl TableMapping {
    /// Mapping declared by the entity type itself.
    pub fn of<T: Entity>() -> Self {
        Self {
            schema: T::schema().map(str::to_string),
            table: T::table_name().to_string(),
            key_column: T::key_column().to_string(),
            columns: T::columns().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// A builder targeting this table.
    pub fn query(&self, dialect: Dialect) -> QueryBuilder {
        QueryBuilder::new(&self.table)
            .schema(self.schema.as_deref())
            .dialect(dialect)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// `schema.table`, or just `table` when no schema is set.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

/// Store metadata: the entity types a context knows about, keyed by their
/// fully-qualified type name.
#[derive(Debug, Clone, Default)]
pub struct Model {
    mappings: HashMap<&'static str, TableMapping>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    pub fn mapping(&self, type_name: &str) -> Option<&TableMapping> {
        self.mappings.get(type_name)
    }

    pub fn mapping_of<T: Entity>(&self) -> Option<&TableMapping> {
        self.mapping(type_name_of::<T>())
    }

    /// Collection handle for `T`, `None` when `T` is not part of the model.
    pub fn set<T: Entity>(&self) -> Option<EntitySet<T>> {
        self.mapping_of::<T>().cloned().map(EntitySet::new)
    }

    pub fn contains<T: Entity>(&self) -> bool {
        self.mappings.contains_key(type_name_of::<T>())
    }
}

#[derive(Debug, Default)]
pub struct ModelBuilder {
    default_schema: Option<String>,
    mappings: HashMap<&'static str, TableMapping>,
}

impl ModelBuilder {
    /// Schema applied to every entity that does not declare one.
    pub fn default_schema(mut self, schema: &str) -> Self {
        self.default_schema = Some(schema.to_string());
        self
    }

    pub fn entity<T: Entity>(mut self) -> Self {
        self.mappings.insert(type_name_of::<T>(), TableMapping::of::<T>());
        self
    }

    /// Register `T` under an explicit schema and table name.
    pub fn entity_in<T: Entity>(mut self, schema: &str, table: &str) -> Self {
        let mapping = TableMapping {
            schema: Some(schema.to_string()),
            table: table.to_string(),
            ..TableMapping::of::<T>()
        };
        self.mappings.insert(type_name_of::<T>(), mapping);
        self
    }

    pub fn build(self) -> Model {
        let default_schema = self.default_schema;
        let mappings = self
            .mappings
            .into_iter()
            .map(|(name, mut mapping)| {
                if mapping.schema.is_none() {
                    mapping.schema = default_schema.clone();
                }
                (name, mapping)
            })
            .collect();
        Model { mappings }
    }
}

/// Typed handle on the stored collection of `T`.
pub struct EntitySet<T> {
    mapping: TableMapping,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntitySet<T> {
    pub fn new(mapping: TableMapping) -> Self {
        Self {
            mapping,
            _entity: PhantomData,
        }
    }

    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    pub fn schema(&self) -> Option<&str> {
        self.mapping.schema.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.mapping.table
    }
}

impl<T> Clone for EntitySet<T> {
    fn clone(&self) -> Self {
        Self::new(self.mapping.clone())
    }
}

impl<T> std::fmt::Debug for EntitySet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySet")
            .field("mapping", &self.mapping)
            .finish()
    }
}
