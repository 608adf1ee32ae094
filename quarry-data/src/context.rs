use std::future::Future;

use crate::entity::Entity;
use crate::error::DataError;
use crate::lock::{self, ExclusiveLock};
use crate::model::{EntitySet, Model, TableMapping};
use crate::query::{Dialect, QueryBuilder};
use crate::value::{Row, Value};

/// One pending write inside a unit of work.
#[derive(Debug, Clone)]
pub enum Change {
    Insert { mapping: TableMapping, row: Row },
    Update { mapping: TableMapping, row: Row },
    Delete { mapping: TableMapping, key: Value },
}

impl Change {
    pub fn mapping(&self) -> &TableMapping {
        match self {
            Change::Insert { mapping, .. }
            | Change::Update { mapping, .. }
            | Change::Delete { mapping, .. } => mapping,
        }
    }
}

/// An update matched no stored row.
#[derive(Debug, Clone)]
pub struct RowNotFound {
    pub table: String,
    pub key: Value,
}

impl std::fmt::Display for RowNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no row in '{}' with key {}", self.table, self.key)
    }
}

impl std::error::Error for RowNotFound {}

/// A store session: metadata, reads, atomic writes and the transaction
/// boundary of one logical connection.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait`.
/// Implementations must be safe to share between tasks; a transaction begun
/// through one clone of a context is visible to every clone.
pub trait DbContext: Send + Sync + 'static {
    /// Provider identity, compared against known lock implementations.
    fn provider_name(&self) -> &str;

    fn model(&self) -> &Model;

    fn dialect(&self) -> Dialect {
        Dialect::Generic
    }

    /// Collection accessor for `T`; `None` when the model does not map `T`.
    fn set<T: Entity>(&self) -> Option<EntitySet<T>> {
        self.model().set::<T>()
    }

    /// Rows matching `query`, restricted to `columns`.
    fn fetch(
        &self,
        query: &QueryBuilder,
        columns: &[&str],
    ) -> impl Future<Output = Result<Vec<Row>, DataError>> + Send;

    /// Number of rows matching the filter of `query`.
    fn count(&self, query: &QueryBuilder) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Apply `changes` as one atomic unit, returning the affected row count.
    ///
    /// Inside an active transaction the changes join it; otherwise they are
    /// committed on their own.
    fn save_changes(&self, changes: Vec<Change>) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Run a raw statement inside the active transaction if any.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<u64, DataError>> + Send;

    fn begin_transaction(&self) -> impl Future<Output = Result<(), DataError>> + Send;

    fn commit_transaction(&self) -> impl Future<Output = Result<(), DataError>> + Send;

    fn rollback_transaction(&self) -> impl Future<Output = Result<(), DataError>> + Send;

    fn in_transaction(&self) -> bool;

    fn exclusive_lock(&self) -> Option<&'static dyn ExclusiveLock> {
        lock::for_provider(self.provider_name())
    }
}
