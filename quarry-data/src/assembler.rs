use std::marker::PhantomData;

use crate::configuration::RepositoryConfiguration;
use crate::context::DbContext;
use crate::entity::{from_row, type_name_of, Entity};
use crate::error::DataError;
use crate::filter::Filter;
use crate::model::TableMapping;
use crate::navigation::{load_navigations, Navigation};
use crate::query::QueryBuilder;
use crate::sort::SortOrder;

/// A bounded, ordered, filtered read that has not run yet.
///
/// Nothing touches the store until [`QueryPlan::load`] or
/// [`QueryPlan::first`]. Entities come back detached.
pub struct QueryPlan<T> {
    query: QueryBuilder,
    columns: Vec<String>,
    includes: Vec<Navigation>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> QueryPlan<T> {
    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub fn includes(&self) -> &[Navigation] {
        &self.includes
    }

    /// Materialise every entity of the plan, with its includes loaded.
    pub async fn load<C: DbContext>(&self, ctx: &C) -> Result<Vec<T>, DataError> {
        self.run(ctx, &self.query).await
    }

    /// Materialise only the first entity of the plan.
    pub async fn first<C: DbContext>(&self, ctx: &C) -> Result<Option<T>, DataError> {
        let limit = self.query.limit_value().map_or(1, |l| l.min(1));
        let query = self.query.clone().limit(limit);
        Ok(self.run(ctx, &query).await?.into_iter().next())
    }

    async fn run<C: DbContext>(&self, ctx: &C, query: &QueryBuilder) -> Result<Vec<T>, DataError> {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let rows = ctx.fetch(query, &columns).await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            let entity = from_row::<T>(row)?;
            entities.push(load_navigations(ctx, entity, &self.includes, false).await?);
        }
        Ok(entities)
    }
}

impl<T> std::fmt::Debug for QueryPlan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlan")
            .field("query", &self.query)
            .field("includes", &self.includes)
            .finish()
    }
}

/// Every property `predicate` refers to must be a persisted column.
pub(crate) fn ensure_declared<T: Entity>(predicate: &Filter, mapping: &TableMapping) -> Result<(), DataError> {
    match predicate.columns().into_iter().find(|c| !mapping.has_column(c)) {
        Some(unknown) => Err(DataError::InvalidSelector(format!(
            "'{unknown}' is not a persisted property of {}",
            type_name_of::<T>()
        ))),
        None => Ok(()),
    }
}

/// Builds read plans from a repository configuration.
pub struct QueryAssembler;

impl QueryAssembler {
    /// Every ordering key is applied in configured order, all in
    /// `sort_order`'s direction; `skip` is applied before `take`.
    pub fn assemble<T: Entity, C: DbContext>(
        predicate: Option<&Filter>,
        skip: i64,
        take: i64,
        sort_order: SortOrder,
        configuration: &RepositoryConfiguration<T, C>,
    ) -> Result<QueryPlan<T>, DataError> {
        let skip = u64::try_from(skip)
            .map_err(|_| DataError::out_of_range("skip", format!("{skip} is negative")))?;
        let take = u64::try_from(take)
            .map_err(|_| DataError::out_of_range("take", format!("{take} is negative")))?;

        if configuration.order_keys().is_empty() {
            return Err(DataError::InvalidState(format!(
                "no ordering configured for {}",
                type_name_of::<T>()
            )));
        }

        let mapping = configuration.set().mapping();
        if let Some(predicate) = predicate {
            ensure_declared::<T>(predicate, mapping)?;
        }

        let mut query = mapping.query(configuration.context().dialect());
        if let Some(predicate) = predicate {
            query = query.filter(predicate.clone());
        }
        let ascending = sort_order.is_ascending();
        for key in configuration.order_keys() {
            query = query.order_by(key, ascending);
        }
        let query = query.offset(skip).limit(take);

        Ok(QueryPlan {
            query,
            columns: mapping.columns.clone(),
            includes: configuration.includes().to_vec(),
            _entity: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::memory::MemoryContext;
    use crate::model::Model;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Letter {
        id: i64,
        name: String,
        rank: i64,
    }

    impl Entity for Letter {
        type Key = i64;
        fn table_name() -> &'static str {
            "letters"
        }
        fn key_column() -> &'static str {
            "id"
        }
        fn columns() -> &'static [&'static str] {
            &["id", "name", "rank"]
        }
        fn key(&self) -> i64 {
            self.id
        }
    }

    fn letter(id: i64, name: &str, rank: i64) -> Letter {
        Letter {
            id,
            name: name.into(),
            rank,
        }
    }

    fn configuration() -> RepositoryConfiguration<Letter, MemoryContext> {
        let ctx = MemoryContext::new(Model::builder().entity::<Letter>().build());
        ctx.seed(vec![
            letter(1, "a", 2),
            letter(2, "b", 1),
            letter(3, "c", 2),
            letter(4, "d", 1),
        ])
        .unwrap();
        let set = ctx.set::<Letter>().unwrap();
        RepositoryConfiguration::new(Arc::new(ctx), set)
    }

    #[test]
    fn bounds_are_checked_before_ordering() {
        let config = configuration();
        let err = QueryAssembler::assemble(None, -1, 1, SortOrder::Ascending, &config).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { argument: "skip", .. }));
        let err = QueryAssembler::assemble(None, 0, -1, SortOrder::Ascending, &config).unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { argument: "take", .. }));
        let err = QueryAssembler::assemble(None, 0, 1, SortOrder::Ascending, &config).unwrap_err();
        assert!(matches!(err, DataError::InvalidState(_)));
    }

    #[test]
    fn every_key_follows_the_requested_direction() {
        let mut config = configuration();
        config.order_by("rank").unwrap().then_by("name").unwrap();

        let plan = QueryAssembler::assemble(None, 2, 3, SortOrder::Descending, &config).unwrap();
        assert_eq!(
            plan.query().ordering(),
            [("rank".to_string(), false), ("name".to_string(), false)]
        );
        assert_eq!(plan.query().offset_value(), Some(2));
        assert_eq!(plan.query().limit_value(), Some(3));
    }

    #[test]
    fn predicate_must_use_declared_columns() {
        let mut config = configuration();
        config.order_by("id").unwrap();
        let err = QueryAssembler::assemble(Some(&Filter::eq("colour", "red")), 0, 1, SortOrder::Ascending, &config)
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn plan_runs_only_when_loaded() {
        let mut config = configuration();
        config.order_by("rank").unwrap().then_by("id").unwrap();
        let plan = QueryAssembler::assemble(
            Some(&Filter::gte("id", 2)),
            1,
            2,
            SortOrder::Ascending,
            &config,
        )
        .unwrap();

        let ids: Vec<i64> = plan.load(config.context().as_ref()).await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![4, 3]);
        let first = plan.first(config.context().as_ref()).await.unwrap();
        assert_eq!(first.map(|l| l.id), Some(4));
    }
}
