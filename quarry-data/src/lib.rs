//! # quarry-data
//!
//! Generic data access over any store implementing [`DbContext`]: typed
//! property selectors, a lazily finalised per-repository
//! [`RepositoryConfiguration`], the [`QueryAssembler`] turning it into
//! bounded, ordered reads, and three composable repository capabilities
//! ([`ReadOnlyRepository`], [`Repository`], [`TransactionalRepository`])
//! all implemented by [`EntityRepository`].
//!
//! [`MemoryContext`] is an in-process store; the SQLx backend lives in
//! `quarry-data-sqlx`.

pub mod assembler;
pub mod configuration;
pub mod context;
pub mod crud;
pub mod entity;
pub mod error;
pub mod filter;
pub mod handler;
pub mod lock;
pub mod memory;
pub mod model;
pub mod navigation;
pub mod page;
pub mod query;
pub mod repository;
pub mod selector;
pub mod sort;
pub mod value;

pub use assembler::{QueryAssembler, QueryPlan};
pub use configuration::RepositoryConfiguration;
pub use context::{Change, DbContext, RowNotFound};
pub use crud::{EntityRepository, EntityRepositoryBuilder};
pub use entity::Entity;
pub use error::DataError;
pub use filter::{Filter, LikePatterns};
pub use handler::{FindHandler, FindQuery, ListHandler, Mapper};
pub use lock::{ExclusiveLock, PostgresAccessExclusive};
pub use memory::MemoryContext;
pub use model::{EntitySet, Model, ModelBuilder, TableMapping};
pub use navigation::{Navigation, NavigationKind};
pub use page::{ListQuery, ListQueryResult};
pub use query::{Dialect, IdentifierPolicy, QueryBuilder, QueryError};
pub use repository::{ReadOnlyRepository, Repository, TransactionalRepository};
pub use selector::{IntoSelector, Property, PropertyPathResolver, Selector};
pub use sort::SortOrder;
pub use value::{Row, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::property;
    pub use crate::{
        DataError, DbContext, Entity, EntityRepository, Filter, ListQuery, ListQueryResult,
        MemoryContext, Model, Navigation, ReadOnlyRepository, Repository, RepositoryConfiguration,
        SortOrder, TransactionalRepository,
    };
}
