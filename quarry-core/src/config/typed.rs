use super::{ConfigError, QuarryConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Relative key (e.g., `"max_connections"`).
    pub key: &'static str,
    /// Rust type name (e.g., `"u32"`).
    pub type_name: &'static str,
    /// Whether the property is required (no default and not `Option`).
    pub required: bool,
    pub description: &'static str,
}

impl PropertyMeta {
    /// Absolute key under the given prefix (e.g. `"quarry.datasource.url"`).
    pub fn full_key(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.key)
    }
}

/// Trait for strongly-typed configuration sections.
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"quarry.datasource"`).
    fn prefix() -> &'static str;

    /// Metadata about all expected properties.
    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from a raw `QuarryConfig` instance.
    fn from_config(config: &QuarryConfig) -> Result<Self, ConfigError>;
}

/// Connection settings for a persistence context.
///
/// ```yaml
/// quarry:
///   datasource:
///     url: "postgres://localhost/app"
///     max_connections: 10
///     default_schema: public
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceConfig {
    pub url: String,
    pub max_connections: u32,
    pub default_schema: Option<String>,
}

impl DataSourceConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
}

impl ConfigProperties for DataSourceConfig {
    fn prefix() -> &'static str {
        "quarry.datasource"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta {
                key: "url",
                type_name: "String",
                required: true,
                description: "Connection URL understood by the store driver",
            },
            PropertyMeta {
                key: "max_connections",
                type_name: "u32",
                required: false,
                description: "Upper bound of the connection pool (default: 10)",
            },
            PropertyMeta {
                key: "default_schema",
                type_name: "Option<String>",
                required: false,
                description: "Schema used for entities that do not declare one",
            },
        ]
    }

    fn from_config(config: &QuarryConfig) -> Result<Self, ConfigError> {
        let prefix = Self::prefix();
        let default_schema = if config.contains_key(&format!("{prefix}.default_schema")) {
            config.get_in(prefix, "default_schema")?
        } else {
            None
        };
        Ok(DataSourceConfig {
            url: config.get_in(prefix, "url")?,
            max_connections: config.get_or(
                &format!("{prefix}.max_connections"),
                Self::DEFAULT_MAX_CONNECTIONS,
            ),
            default_schema,
        })
    }
}
