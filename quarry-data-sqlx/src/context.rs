use std::sync::atomic::{AtomicBool, Ordering};

use quarry_core::{ConfigProperties, DataSourceConfig, QuarryConfig};
use quarry_data::{
    Change, DataError, DbContext, Dialect, Filter, Model, ModelBuilder, QueryBuilder, Row, RowNotFound,
    Value,
};
use sqlx::any::AnyPoolOptions;
use sqlx::{Acquire, Any, AnyConnection, AnyPool, Executor, Transaction};
use tokio::sync::Mutex;

use crate::error::{SqlxErrorExt, SqlxResult};
use crate::row::{bind_values, decode_count, decode_row};

/// Backend names reported by the SQLx `Any` drivers.
pub const POSTGRES: &str = "PostgreSQL";
pub const SQLITE: &str = "SQLite";
pub const MYSQL: &str = "MySQL";

/// SQL dialect matching a backend name.
pub fn dialect_for(provider: &str) -> Dialect {
    match provider {
        POSTGRES => Dialect::Postgres,
        SQLITE => Dialect::Sqlite,
        MYSQL => Dialect::MySql,
        _ => Dialect::Generic,
    }
}

/// A [`DbContext`] over an `sqlx::AnyPool`.
///
/// The context owns at most one open transaction. While it is open every
/// read, write and raw statement runs on its connection; otherwise reads go
/// to the pool and each unit of work commits on its own.
///
/// With a single-connection pool (such as `sqlite::memory:`) this routing is
/// what keeps reads from waiting on the connection held by the transaction.
pub struct SqlxContext {
    pool: AnyPool,
    model: Model,
    provider: String,
    dialect: Dialect,
    tx: Mutex<Option<Transaction<'static, Any>>>,
    active: AtomicBool,
}

impl SqlxContext {
    /// Connect with the default pool size.
    pub async fn connect(url: &str, model: Model) -> SqlxResult<Self> {
        Self::connect_with(url, DataSourceConfig::DEFAULT_MAX_CONNECTIONS, model).await
    }

    pub async fn connect_with(url: &str, max_connections: u32, model: Model) -> SqlxResult<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Self::from_pool(pool, model).await
    }

    /// Connect using the `quarry.datasource` section of `config`.
    ///
    /// A configured `default_schema` applies to every entity of `model`
    /// that does not declare its own schema.
    pub async fn from_config(config: &QuarryConfig, model: ModelBuilder) -> SqlxResult<Self> {
        let datasource = DataSourceConfig::from_config(config)
            .map_err(|err| DataError::Other(err.to_string()))?;
        let model = match datasource.default_schema.as_deref() {
            Some(schema) => model.default_schema(schema),
            None => model,
        };
        tracing::info!(
            max_connections = datasource.max_connections,
            "Connecting quarry datasource"
        );
        Self::connect_with(&datasource.url, datasource.max_connections, model.build()).await
    }

    /// Wrap an existing pool, detecting the provider from a pooled connection.
    pub async fn from_pool(pool: AnyPool, model: Model) -> SqlxResult<Self> {
        let provider = {
            let conn = pool.acquire().await.map_err(SqlxErrorExt::into_data_error)?;
            conn.backend_name().to_string()
        };
        let dialect = dialect_for(&provider);
        tracing::debug!(provider = %provider, ?dialect, "SqlxContext ready");
        Ok(Self {
            pool,
            model,
            provider,
            dialect,
            tx: Mutex::new(None),
            active: AtomicBool::new(false),
        })
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn apply(&self, conn: &mut AnyConnection, change: &Change) -> SqlxResult<u64> {
        let mapping = change.mapping();
        let builder = mapping.query(self.dialect);
        let key_only = matches!(
            change,
            Change::Update { row, .. } if row.keys().all(|c| *c == mapping.key_column)
        );
        let (sql, params) = match change {
            Change::Insert { row, .. } => builder.build_insert_checked(row)?,
            Change::Update { row, .. } if key_only => {
                // Nothing to set: the update only has to find its row.
                let key = row.get(&mapping.key_column).cloned().unwrap_or(Value::Null);
                builder
                    .filter(Filter::Eq(mapping.key_column.clone(), key))
                    .build_count_checked()?
            }
            Change::Update { row, .. } => builder.build_update_checked(row, &mapping.key_column)?,
            Change::Delete { key, .. } => {
                builder.build_delete_checked(&mapping.key_column, key.clone())?
            }
        };
        tracing::debug!(sql = %sql, "apply change");
        let statement = bind_values(sqlx::query(&sql), params);
        let affected = if key_only {
            let row = statement
                .fetch_one(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_data_error)?;
            decode_count(&row)?
        } else {
            statement
                .execute(&mut *conn)
                .await
                .map_err(SqlxErrorExt::into_data_error)?
                .rows_affected()
        };
        if let Change::Update { row, .. } = change {
            if affected == 0 {
                return Err(DataError::database(RowNotFound {
                    table: mapping.qualified_name(),
                    key: row.get(&mapping.key_column).cloned().unwrap_or(Value::Null),
                }));
            }
        }
        Ok(affected)
    }
}

impl DbContext for SqlxContext {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &Model {
        &self.model
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch(&self, query: &QueryBuilder, columns: &[&str]) -> SqlxResult<Vec<Row>> {
        let (sql, params) = query.build_select_checked(columns)?;
        tracing::debug!(sql = %sql, "fetch");
        let statement = bind_values(sqlx::query(&sql), params);
        let rows = {
            let mut slot = self.tx.lock().await;
            match slot.as_mut() {
                Some(tx) => statement.fetch_all(&mut **tx).await,
                None => statement.fetch_all(&self.pool).await,
            }
        }
        .map_err(SqlxErrorExt::into_data_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn count(&self, query: &QueryBuilder) -> SqlxResult<u64> {
        let (sql, params) = query.build_count_checked()?;
        tracing::debug!(sql = %sql, "count");
        let statement = bind_values(sqlx::query(&sql), params);
        let row = {
            let mut slot = self.tx.lock().await;
            match slot.as_mut() {
                Some(tx) => statement.fetch_one(&mut **tx).await,
                None => statement.fetch_one(&self.pool).await,
            }
        }
        .map_err(SqlxErrorExt::into_data_error)?;
        decode_count(&row)
    }

    async fn save_changes(&self, changes: Vec<Change>) -> SqlxResult<u64> {
        let mut slot = self.tx.lock().await;
        // A savepoint inside the open transaction, or a transaction of its own.
        let mut unit = match slot.as_mut() {
            Some(tx) => tx.begin().await,
            None => self.pool.begin().await,
        }
        .map_err(SqlxErrorExt::into_data_error)?;

        let mut affected = 0;
        for change in &changes {
            // Dropping `unit` on error rolls the whole unit back.
            affected += self.apply(&mut unit, change).await?;
        }
        unit.commit().await.map_err(SqlxErrorExt::into_data_error)?;
        Ok(affected)
    }

    async fn execute(&self, sql: &str) -> SqlxResult<u64> {
        tracing::debug!(sql = %sql, "execute");
        let mut slot = self.tx.lock().await;
        let result = match slot.as_mut() {
            Some(tx) => Executor::execute(&mut **tx, sqlx::raw_sql(sql)).await,
            None => Executor::execute(&self.pool, sqlx::raw_sql(sql)).await,
        }
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected())
    }

    async fn begin_transaction(&self) -> SqlxResult<()> {
        let mut slot = self.tx.lock().await;
        if slot.is_some() {
            return Err(DataError::InvalidState(
                "a transaction is already in progress".into(),
            ));
        }
        let tx = self.pool.begin().await.map_err(SqlxErrorExt::into_data_error)?;
        *slot = Some(tx);
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn commit_transaction(&self) -> SqlxResult<()> {
        let tx = self.take_transaction().await?;
        tx.commit().await.map_err(SqlxErrorExt::into_data_error)
    }

    async fn rollback_transaction(&self) -> SqlxResult<()> {
        let tx = self.take_transaction().await?;
        tx.rollback().await.map_err(SqlxErrorExt::into_data_error)
    }

    fn in_transaction(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl SqlxContext {
    async fn take_transaction(&self) -> SqlxResult<Transaction<'static, Any>> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| DataError::InvalidState("no transaction in progress".into()))?;
        self.active.store(false, Ordering::SeqCst);
        Ok(tx)
    }
}
