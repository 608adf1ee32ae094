use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::assembler::{ensure_declared, QueryAssembler};
use crate::configuration::RepositoryConfiguration;
use crate::context::{Change, DbContext};
use crate::entity::{from_row, to_row, type_name_of, Entity};
use crate::error::DataError;
use crate::filter::Filter;
use crate::model::{EntitySet, TableMapping};
use crate::navigation::load_navigations;
use crate::repository::{ReadOnlyRepository, Repository, TransactionalRepository};
use crate::sort::SortOrder;

type ConfigureHook<T, C> =
    Box<dyn Fn(&mut RepositoryConfiguration<T, C>) -> Result<(), DataError> + Send + Sync>;

type CollectionAccessor<T, C> = Box<dyn FnOnce(&C) -> Option<EntitySet<T>> + Send>;

/// Repository over one entity type bound to one context.
///
/// Implements [`ReadOnlyRepository`], [`Repository`] and
/// [`TransactionalRepository`]; callers depend on the capability they need.
/// The configuration hook runs the first time the configuration is read,
/// exactly once even under concurrent first access.
///
/// # Example
///
/// ```ignore
/// let books = EntityRepository::<Book, MemoryContext>::builder()
///     .context(ctx.clone())
///     .collection(|ctx| ctx.set::<Book>())
///     .configure(|config| {
///         config.order_by(property!(Book, id))?;
///         Ok(())
///     })
///     .build()?;
/// let page = books.any(0, 20, SortOrder::Ascending).await?;
/// ```
pub struct EntityRepository<T, C> {
    base: RepositoryConfiguration<T, C>,
    hook: ConfigureHook<T, C>,
    configured: OnceCell<RepositoryConfiguration<T, C>>,
}

impl<T: Entity, C: DbContext> EntityRepository<T, C> {
    pub fn builder() -> EntityRepositoryBuilder<T, C> {
        EntityRepositoryBuilder {
            context: None,
            collection: None,
            hook: None,
        }
    }

    /// The finalised configuration, running the hook on first access.
    ///
    /// A failing hook leaves the repository unconfigured; the next access
    /// runs it again.
    pub fn configuration(&self) -> Result<&RepositoryConfiguration<T, C>, DataError> {
        self.configured.get_or_try_init(|| {
            let mut configuration = self.base.clone();
            (self.hook)(&mut configuration)?;
            tracing::debug!(
                table = %self.mapping().qualified_name(),
                order_by = ?configuration.order_keys(),
                includes = configuration.includes().len(),
                "Repository configured"
            );
            Ok(configuration.finish())
        })
    }

    pub fn context(&self) -> &Arc<C> {
        self.base.context()
    }

    pub fn schema(&self) -> Option<&str> {
        self.base.schema()
    }

    pub fn table_name(&self) -> &str {
        self.base.table_name()
    }

    fn mapping(&self) -> &TableMapping {
        self.base.set().mapping()
    }

    fn entity_or_null(entity: impl Into<Option<T>>) -> Result<T, DataError> {
        let entity = entity.into().ok_or(DataError::NullArgument("entity"))?;
        entity.validate()?;
        Ok(entity)
    }
}

impl<T: Entity, C: DbContext> ReadOnlyRepository<T, T::Key> for EntityRepository<T, C> {
    async fn count(&self, predicate: impl Into<Option<Filter>> + Send) -> Result<u64, DataError> {
        let predicate = predicate.into();
        let mapping = self.mapping();
        tracing::debug!(table = %mapping.qualified_name(), filtered = predicate.is_some(), "count");

        let mut query = mapping.query(self.context().dialect());
        if let Some(predicate) = predicate {
            ensure_declared::<T>(&predicate, mapping)?;
            query = query.filter(predicate);
        }
        self.context().count(&query).await
    }

    async fn find(&self, id: &T::Key) -> Result<Option<T>, DataError> {
        let configuration = self.configuration()?;
        let mapping = self.mapping();
        tracing::debug!(table = %mapping.qualified_name(), key = ?id, "find");

        let ctx = self.context().as_ref();
        let query = mapping
            .query(ctx.dialect())
            .filter(Filter::Eq(mapping.key_column.clone(), id.clone().into()))
            .limit(1);
        let Some(row) = ctx.fetch(&query, &mapping.column_names()).await?.into_iter().next() else {
            return Ok(None);
        };
        let entity = from_row::<T>(row)?;
        Ok(Some(
            load_navigations(ctx, entity, configuration.includes(), true).await?,
        ))
    }

    async fn first(&self, predicate: impl Into<Option<Filter>> + Send) -> Result<Option<T>, DataError> {
        let predicate = predicate.into();
        tracing::debug!(table = %self.mapping().qualified_name(), "first");
        let plan = QueryAssembler::assemble(
            predicate.as_ref(),
            0,
            1,
            SortOrder::Ascending,
            self.configuration()?,
        )?;
        plan.first(self.context().as_ref()).await
    }

    async fn last(&self, predicate: impl Into<Option<Filter>> + Send) -> Result<Option<T>, DataError> {
        let predicate = predicate.into();
        tracing::debug!(table = %self.mapping().qualified_name(), "last");
        let plan = QueryAssembler::assemble(
            predicate.as_ref(),
            0,
            1,
            SortOrder::Descending,
            self.configuration()?,
        )?;
        plan.first(self.context().as_ref()).await
    }

    async fn any(&self, skip: i64, take: i64, sort_order: SortOrder) -> Result<Vec<T>, DataError> {
        tracing::debug!(table = %self.mapping().qualified_name(), skip, take, %sort_order, "any");
        let plan = QueryAssembler::assemble(None, skip, take, sort_order, self.configuration()?)?;
        plan.load(self.context().as_ref()).await
    }

    async fn query(
        &self,
        predicate: impl Into<Option<Filter>> + Send,
        skip: i64,
        take: i64,
        sort_order: SortOrder,
    ) -> Result<Vec<T>, DataError> {
        let predicate = predicate.into().ok_or(DataError::NullArgument("predicate"))?;
        tracing::debug!(table = %self.mapping().qualified_name(), skip, take, %sort_order, "query");
        let plan = QueryAssembler::assemble(
            Some(&predicate),
            skip,
            take,
            sort_order,
            self.configuration()?,
        )?;
        plan.load(self.context().as_ref()).await
    }
}

impl<T: Entity, C: DbContext> Repository<T, T::Key> for EntityRepository<T, C> {
    async fn insert(&self, entity: impl Into<Option<T>> + Send) -> Result<T, DataError> {
        let entity = Self::entity_or_null(entity)?;
        let mapping = self.mapping();
        tracing::debug!(table = %mapping.qualified_name(), key = ?entity.key(), "insert");

        let change = Change::Insert {
            mapping: mapping.clone(),
            row: to_row(&entity)?,
        };
        self.context().save_changes(vec![change]).await?;
        Ok(entity)
    }

    async fn update(&self, entity: impl Into<Option<T>> + Send) -> Result<T, DataError> {
        let entity = Self::entity_or_null(entity)?;
        let mapping = self.mapping();
        tracing::debug!(table = %mapping.qualified_name(), key = ?entity.key(), "update");

        let change = Change::Update {
            mapping: mapping.clone(),
            row: to_row(&entity)?,
        };
        self.context().save_changes(vec![change]).await?;
        Ok(entity)
    }

    async fn delete(&self, id: &T::Key) -> Result<bool, DataError> {
        let mapping = self.mapping();
        tracing::debug!(table = %mapping.qualified_name(), key = ?id, "delete");

        let change = Change::Delete {
            mapping: mapping.clone(),
            key: id.clone().into(),
        };
        Ok(self.context().save_changes(vec![change]).await? > 0)
    }
}

impl<T: Entity, C: DbContext> TransactionalRepository for EntityRepository<T, C> {
    async fn begin_transaction(&self, exclusive: bool) -> Result<(), DataError> {
        let ctx = self.context();
        let lock = if exclusive {
            let lock = ctx.exclusive_lock().ok_or_else(|| {
                DataError::UnsupportedOperation(format!(
                    "exclusive table lock is not available for provider '{}'",
                    ctx.provider_name()
                ))
            })?;
            Some(lock)
        } else {
            None
        };

        let began = if ctx.in_transaction() {
            false
        } else {
            ctx.begin_transaction().await?;
            true
        };
        tracing::debug!(
            table = %self.mapping().qualified_name(),
            exclusive,
            began,
            "Transaction begun"
        );

        if let Some(lock) = lock {
            let statement = lock.statement(self.mapping());
            if let Err(err) = ctx.execute(&statement).await {
                if began {
                    if let Err(rollback) = ctx.rollback_transaction().await {
                        tracing::warn!(error = %rollback, "Rollback after failed table lock failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<(), DataError> {
        let ctx = self.context();
        if !ctx.in_transaction() {
            return Ok(());
        }
        ctx.commit_transaction().await?;
        tracing::debug!(table = %self.mapping().qualified_name(), "Transaction committed");
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<(), DataError> {
        let ctx = self.context();
        if !ctx.in_transaction() {
            return Ok(());
        }
        ctx.rollback_transaction().await?;
        tracing::debug!(table = %self.mapping().qualified_name(), "Transaction rolled back");
        Ok(())
    }

    fn transaction_in_progress(&self) -> bool {
        self.context().in_transaction()
    }
}

/// Builder for [`EntityRepository`].
pub struct EntityRepositoryBuilder<T, C> {
    context: Option<Arc<C>>,
    collection: Option<CollectionAccessor<T, C>>,
    hook: Option<ConfigureHook<T, C>>,
}

impl<T: Entity, C: DbContext> EntityRepositoryBuilder<T, C> {
    pub fn context(mut self, context: Arc<C>) -> Self {
        self.context = Some(context);
        self
    }

    /// How to reach the entity's collection from the context.
    pub fn collection(
        mut self,
        accessor: impl FnOnce(&C) -> Option<EntitySet<T>> + Send + 'static,
    ) -> Self {
        self.collection = Some(Box::new(accessor));
        self
    }

    /// Hook populating ordering keys and includes, run once on first use.
    pub fn configure(
        mut self,
        hook: impl Fn(&mut RepositoryConfiguration<T, C>) -> Result<(), DataError> + Send + Sync + 'static,
    ) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Result<EntityRepository<T, C>, DataError> {
        let context = self.context.ok_or(DataError::NullArgument("context"))?;
        let accessor = self.collection.ok_or(DataError::NullArgument("collection"))?;
        let set = accessor(&context).ok_or_else(|| {
            DataError::InvalidState(format!(
                "the context has no collection for {}",
                type_name_of::<T>()
            ))
        })?;
        let hook: ConfigureHook<T, C> = match self.hook {
            Some(hook) => hook,
            None => Box::new(leave_unconfigured::<T, C>),
        };
        Ok(EntityRepository {
            base: RepositoryConfiguration::new(context, set),
            hook,
            configured: OnceCell::new(),
        })
    }
}

fn leave_unconfigured<T, C>(_: &mut RepositoryConfiguration<T, C>) -> Result<(), DataError> {
    Ok(())
}
