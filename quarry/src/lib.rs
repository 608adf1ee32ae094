//! quarry: generic repositories over pluggable stores.
//!
//! This facade crate re-exports the quarry sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use quarry::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                        |
//! |-------------|---------|------------------------------|
//! | `data`      | **yes** | `quarry-data`                |
//! | `data-sqlx` | no      | `quarry-data-sqlx`           |
//! | `sqlite`    | no      | `quarry-data-sqlx/sqlite`    |
//! | `postgres`  | no      | `quarry-data-sqlx/postgres`  |
//! | `mysql`     | no      | `quarry-data-sqlx/mysql`     |
//! | `full`      | no      | All of the above             |

pub extern crate quarry_core;

// Configuration, validation and logging at the top level.
pub use quarry_core::*;

#[cfg(feature = "data")]
pub use quarry_data;

#[cfg(feature = "data-sqlx")]
pub use quarry_data_sqlx;

/// Unified prelude: import everything with `use quarry::prelude::*`.
pub mod prelude {
    pub use quarry_core::{init_tracing, validate_model, QuarryConfig, ValidationErrors};

    #[cfg(feature = "data")]
    pub use quarry_data::prelude::*;

    #[cfg(feature = "data-sqlx")]
    pub use quarry_data_sqlx::prelude::*;
}
