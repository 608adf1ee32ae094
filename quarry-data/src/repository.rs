use std::future::Future;

use crate::error::DataError;
use crate::filter::Filter;
use crate::sort::SortOrder;

/// Read capability over entities of type `T` keyed by `ID`.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
/// Paged and ordered reads require the repository to have an ordering
/// configured; they fail with [`DataError::InvalidState`] otherwise.
pub trait ReadOnlyRepository<T, ID>: Send + Sync
where
    T: Send + Sync + 'static,
    ID: Send + Sync + 'static,
{
    /// Entities matching `predicate`, or all of them when it is `None`.
    fn count(
        &self,
        predicate: impl Into<Option<Filter>> + Send,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// The entity stored under `id`, with missing includes loaded.
    /// Absence is a normal result.
    fn find(&self, id: &ID) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// First entity in ascending configured order.
    fn first(
        &self,
        predicate: impl Into<Option<Filter>> + Send,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// First entity in descending configured order.
    fn last(
        &self,
        predicate: impl Into<Option<Filter>> + Send,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// One page of all entities.
    fn any(
        &self,
        skip: i64,
        take: i64,
        sort_order: SortOrder,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;

    /// One page of the entities matching `predicate`, which is required.
    fn query(
        &self,
        predicate: impl Into<Option<Filter>> + Send,
        skip: i64,
        take: i64,
        sort_order: SortOrder,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;
}

/// Write capability. Every call is its own unit of work.
pub trait Repository<T, ID>: ReadOnlyRepository<T, ID>
where
    T: Send + Sync + 'static,
    ID: Send + Sync + 'static,
{
    /// Validate and store a new entity.
    fn insert(&self, entity: impl Into<Option<T>> + Send) -> impl Future<Output = Result<T, DataError>> + Send;

    /// Validate and store new values for an existing entity.
    fn update(&self, entity: impl Into<Option<T>> + Send) -> impl Future<Output = Result<T, DataError>> + Send;

    /// Remove the entity stored under `id`; `false` when there was none.
    fn delete(&self, id: &ID) -> impl Future<Output = Result<bool, DataError>> + Send;
}

/// Explicit transaction boundary over the repository's context.
///
/// `NoTransaction -> Active -> NoTransaction`; at most one transaction is
/// active per context.
pub trait TransactionalRepository: Send + Sync {
    /// Start a transaction unless one is already active. With `exclusive`,
    /// the entity's table is locked for the rest of the transaction.
    fn begin_transaction(&self, exclusive: bool) -> impl Future<Output = Result<(), DataError>> + Send;

    /// No-op when no transaction is active.
    fn commit_transaction(&self) -> impl Future<Output = Result<(), DataError>> + Send;

    /// No-op when no transaction is active.
    fn rollback_transaction(&self) -> impl Future<Output = Result<(), DataError>> + Send;

    fn transaction_in_progress(&self) -> bool;
}
