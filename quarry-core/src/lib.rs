//! # quarry-core
//!
//! Ambient runtime shared by the quarry crates: layered configuration
//! ([`QuarryConfig`]), the section-scoped [`OptionWriter`], garde-backed
//! model validation and tracing setup.

pub mod config;
pub mod logging;
pub mod validation;

pub use config::{
    ConfigError, ConfigProperties, ConfigValue, DataSourceConfig, FromConfigValue, OptionSection,
    OptionWriter, PropertyMeta, QuarryConfig,
};
pub use logging::{init_tracing, init_tracing_with};
pub use validation::{validate_model, FieldError, ValidationErrors};
