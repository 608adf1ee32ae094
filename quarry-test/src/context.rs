use std::sync::{Arc, Mutex, PoisonError};

use quarry_data::{
    Change, DataError, DbContext, Dialect, EntityRepository, MemoryContext, Model, QueryBuilder, Row,
};

use crate::fixtures::{sample_authors, sample_books, sample_chapters, Author, Book, Chapter};

/// The model of the sample library.
pub fn library_model() -> Model {
    Model::builder()
        .entity::<Book>()
        .entity::<Author>()
        .entity::<Chapter>()
        .build()
}

/// A memory context holding the sample books, authors and chapters.
pub fn seeded_context() -> Arc<MemoryContext> {
    let ctx = MemoryContext::new(library_model());
    seed(&ctx);
    Arc::new(ctx)
}

fn seed(ctx: &MemoryContext) {
    // Fixture data is static and always valid.
    let seeded = ctx
        .seed(sample_authors())
        .and_then(|_| ctx.seed(sample_books()))
        .and_then(|_| ctx.seed(sample_chapters()));
    if let Err(err) = seeded {
        panic!("seeding the sample library failed: {err}");
    }
}

/// Book repository ordered by id with both navigations included.
pub fn book_repository<C: DbContext>(ctx: Arc<C>) -> Result<EntityRepository<Book, C>, DataError> {
    EntityRepository::builder()
        .context(ctx)
        .collection(|ctx: &C| ctx.set::<Book>())
        .configure(|config| {
            config
                .order_by("id")?
                .include("|b| b.author")?
                .include("|b| b.chapters")?;
            Ok(())
        })
        .build()
}

/// A [`MemoryContext`] that reports a chosen provider name and records
/// every raw statement it is asked to execute.
///
/// Use it to drive provider-specific paths (such as exclusive locks)
/// without a running database.
pub struct RecordingContext {
    inner: MemoryContext,
    provider: String,
    executed: Mutex<Vec<String>>,
    fail_execute: bool,
}

impl RecordingContext {
    pub fn new(provider: &str) -> Self {
        let inner = MemoryContext::new(library_model());
        seed(&inner);
        Self {
            inner,
            provider: provider.to_string(),
            executed: Mutex::new(Vec::new()),
            fail_execute: false,
        }
    }

    /// Make every `execute` call fail after recording the statement.
    pub fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug)]
pub struct StatementRejected(pub String);

impl std::fmt::Display for StatementRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement rejected: {}", self.0)
    }
}

impl std::error::Error for StatementRejected {}

impl DbContext for RecordingContext {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &Model {
        self.inner.model()
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn fetch(&self, query: &QueryBuilder, columns: &[&str]) -> Result<Vec<Row>, DataError> {
        self.inner.fetch(query, columns).await
    }

    async fn count(&self, query: &QueryBuilder) -> Result<u64, DataError> {
        self.inner.count(query).await
    }

    async fn save_changes(&self, changes: Vec<Change>) -> Result<u64, DataError> {
        self.inner.save_changes(changes).await
    }

    async fn execute(&self, sql: &str) -> Result<u64, DataError> {
        tracing::debug!(sql, "Recorded statement");
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        if self.fail_execute {
            return Err(DataError::database(StatementRejected(sql.to_string())));
        }
        Ok(0)
    }

    async fn begin_transaction(&self) -> Result<(), DataError> {
        self.inner.begin_transaction().await
    }

    async fn commit_transaction(&self) -> Result<(), DataError> {
        self.inner.commit_transaction().await
    }

    async fn rollback_transaction(&self) -> Result<(), DataError> {
        self.inner.rollback_transaction().await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}
