use std::sync::Arc;

use crate::context::DbContext;
use crate::entity::Entity;
use crate::error::DataError;
use crate::model::EntitySet;
use crate::navigation::Navigation;
use crate::selector::{IntoSelector, PropertyPathResolver};

/// How a repository reads its entity: collection handle, ordering keys and
/// eager-loaded navigations.
///
/// Mutable only until the owning repository finalises it; afterwards every
/// mutator fails with [`DataError::InvalidState`].
///
/// ```ignore
/// EntityRepository::builder()
///     .context(ctx)
///     .collection(|ctx: &MemoryContext| ctx.set::<Book>())
///     .configure(|config| {
///         config
///             .order_by(property!(Book, title))?
///             .then_by("|b| b.id")?
///             .include(property!(Book, chapters))?;
///         Ok(())
///     })
///     .build()?;
/// ```
pub struct RepositoryConfiguration<T, C> {
    context: Arc<C>,
    set: EntitySet<T>,
    order_by: Vec<String>,
    includes: Vec<Navigation>,
    configured: bool,
}

impl<T: Entity, C: DbContext> RepositoryConfiguration<T, C> {
    pub fn new(context: Arc<C>, set: EntitySet<T>) -> Self {
        Self {
            context,
            set,
            order_by: Vec::new(),
            includes: Vec::new(),
            configured: false,
        }
    }

    /// Replace the ordering with a single key.
    pub fn order_by(&mut self, selector: impl IntoSelector<T>) -> Result<&mut Self, DataError> {
        self.ensure_mutable()?;
        let column = PropertyPathResolver::resolve_column::<T>(selector)?;
        self.order_by.clear();
        self.order_by.push(column.to_string());
        Ok(self)
    }

    /// Append a secondary ordering key.
    pub fn then_by(&mut self, selector: impl IntoSelector<T>) -> Result<&mut Self, DataError> {
        self.ensure_mutable()?;
        if self.order_by.is_empty() {
            return Err(DataError::InvalidState(
                "then_by requires a preceding order_by".into(),
            ));
        }
        let column = PropertyPathResolver::resolve_column::<T>(selector)?;
        self.order_by.push(column.to_string());
        Ok(self)
    }

    /// Eager-load a navigation with every query.
    pub fn include(&mut self, selector: impl IntoSelector<T>) -> Result<&mut Self, DataError> {
        self.ensure_mutable()?;
        let navigation = PropertyPathResolver::resolve_navigation::<T>(selector)?;
        if !self.includes.iter().any(|n| n.name() == navigation.name()) {
            self.includes.push(navigation);
        }
        Ok(self)
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn set(&self) -> &EntitySet<T> {
        &self.set
    }

    pub fn schema(&self) -> Option<&str> {
        self.set.schema()
    }

    pub fn table_name(&self) -> &str {
        self.set.table_name()
    }

    pub fn order_keys(&self) -> &[String] {
        &self.order_by
    }

    pub fn includes(&self) -> &[Navigation] {
        &self.includes
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub(crate) fn finish(mut self) -> Self {
        self.configured = true;
        self
    }

    fn ensure_mutable(&self) -> Result<(), DataError> {
        if self.configured {
            return Err(DataError::InvalidState(format!(
                "configuration of '{}' is already finalised",
                self.set.mapping().qualified_name()
            )));
        }
        Ok(())
    }
}

impl<T, C> Clone for RepositoryConfiguration<T, C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            set: self.set.clone(),
            order_by: self.order_by.clone(),
            includes: self.includes.clone(),
            configured: self.configured,
        }
    }
}

impl<T, C> std::fmt::Debug for RepositoryConfiguration<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfiguration")
            .field("set", &self.set)
            .field("order_by", &self.order_by)
            .field("includes", &self.includes)
            .field("configured", &self.configured)
            .finish()
    }
}
