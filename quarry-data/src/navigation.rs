use serde_json::Map;

use crate::context::DbContext;
use crate::entity::{type_name_of, Entity};
use crate::error::DataError;
use crate::filter::Filter;
use crate::model::{Model, TableMapping};
use crate::value::{row_into_json, Value};

type Object = Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// At most one related entity.
    Reference,
    /// Any number of related entities.
    Collection,
}

/// A relation from an owning entity to another entity type, materialised
/// into the owner's field `name` when loaded.
#[derive(Debug, Clone)]
pub struct Navigation {
    name: &'static str,
    kind: NavigationKind,
    target_type: &'static str,
    target: TableMapping,
    source_column: &'static str,
    target_column: &'static str,
}

impl Navigation {
    /// The owner holds the key of one `P` in `foreign_key`.
    pub fn reference<P: Entity>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            kind: NavigationKind::Reference,
            target_type: type_name_of::<P>(),
            target: TableMapping::of::<P>(),
            source_column: foreign_key,
            target_column: P::key_column(),
        }
    }

    /// Every `C` whose `foreign_key` equals the owner's `owner_key`.
    pub fn collection<C: Entity>(
        name: &'static str,
        owner_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: NavigationKind::Collection,
            target_type: type_name_of::<C>(),
            target: TableMapping::of::<C>(),
            source_column: owner_key,
            target_column: foreign_key,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> NavigationKind {
        self.kind
    }

    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    /// Where the target lives: the model's mapping when it has one,
    /// otherwise what the target type declares.
    pub fn target_mapping(&self, model: &Model) -> TableMapping {
        model
            .mapping(self.target_type)
            .cloned()
            .unwrap_or_else(|| self.target.clone())
    }

    /// Non-null reference or non-empty collection.
    pub fn is_loaded(&self, owner: &Object) -> bool {
        match (self.kind, owner.get(self.name)) {
            (_, None) | (_, Some(serde_json::Value::Null)) => false,
            (NavigationKind::Collection, Some(serde_json::Value::Array(items))) => !items.is_empty(),
            (NavigationKind::Collection, Some(_)) => false,
            (NavigationKind::Reference, Some(_)) => true,
        }
    }

    async fn load_into<C: DbContext>(&self, ctx: &C, owner: &mut Object) -> Result<(), DataError> {
        let source = owner
            .get(self.source_column)
            .cloned()
            .map(Value::from_json)
            .unwrap_or(Value::Null);

        let loaded = if source.is_null() {
            self.empty()
        } else {
            let mapping = self.target_mapping(ctx.model());
            let query = mapping
                .query(ctx.dialect())
                .filter(Filter::Eq(self.target_column.to_string(), source));
            let query = match self.kind {
                NavigationKind::Reference => query.limit(1),
                NavigationKind::Collection => query.order_by(&mapping.key_column, true),
            };
            let rows = ctx.fetch(&query, &mapping.column_names()).await?;
            match self.kind {
                NavigationKind::Reference => rows
                    .into_iter()
                    .next()
                    .map(row_into_json)
                    .unwrap_or(serde_json::Value::Null),
                NavigationKind::Collection => {
                    serde_json::Value::Array(rows.into_iter().map(row_into_json).collect())
                }
            }
        };
        owner.insert(self.name.to_string(), loaded);
        Ok(())
    }

    fn empty(&self) -> serde_json::Value {
        match self.kind {
            NavigationKind::Reference => serde_json::Value::Null,
            NavigationKind::Collection => serde_json::Value::Array(Vec::new()),
        }
    }
}

/// Load `navigations` into `entity`.
///
/// With `only_missing`, navigations that are already populated are kept as is.
pub async fn load_navigations<T: Entity, C: DbContext>(
    ctx: &C,
    entity: T,
    navigations: &[Navigation],
    only_missing: bool,
) -> Result<T, DataError> {
    if navigations.is_empty() {
        return Ok(entity);
    }
    let serde_json::Value::Object(mut owner) = serde_json::to_value(&entity)? else {
        return Ok(entity);
    };

    let mut changed = false;
    for navigation in navigations {
        if only_missing && navigation.is_loaded(&owner) {
            continue;
        }
        navigation.load_into(ctx, &mut owner).await?;
        changed = true;
    }

    if !changed {
        return Ok(entity);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(owner))?)
}
