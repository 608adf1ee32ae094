//! # quarry-data-sqlx
//!
//! [SQLx](https://github.com/launchbadge/sqlx) backend for the quarry data
//! layer. It implements [`DbContext`](quarry_data::DbContext) over an
//! `sqlx::AnyPool`, so one build can talk to whichever drivers are enabled.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxContext`] | Pool, model and the single open transaction of one logical session |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! The provider name of a context is the backend name reported by the
//! driver (`"PostgreSQL"`, `"SQLite"`, `"MySQL"`). Only PostgreSQL has an
//! exclusive table lock.
//!
//! # Quick start
//!
//! ```ignore
//! use quarry_data::prelude::*;
//! use quarry_data_sqlx::SqlxContext;
//!
//! let model = Model::builder().entity::<Book>().build();
//! let ctx = Arc::new(SqlxContext::connect("postgres://localhost/library", model).await?);
//! let books = EntityRepository::builder()
//!     .context(ctx)
//!     .collection(|ctx: &SqlxContext| ctx.set::<Book>())
//!     .configure(|config| {
//!         config.order_by(property!(Book, id))?;
//!         Ok(())
//!     })
//!     .build()?;
//!
//! books.begin_transaction(true).await?;
//! books.insert(Book::new(6, "F")).await?;
//! books.commit_transaction().await?;
//! ```

pub mod context;
pub mod error;
mod row;

pub use context::{dialect_for, SqlxContext, MYSQL, POSTGRES, SQLITE};
pub use error::{SqlxErrorExt, SqlxResult};

pub mod prelude {
    //! Re-exports of the SQLx backend types.
    pub use crate::{SqlxContext, SqlxErrorExt, SqlxResult};
}
