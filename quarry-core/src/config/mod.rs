mod loader;
pub mod typed;
pub mod value;
pub mod writer;

use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;

pub use typed::{ConfigProperties, DataSourceConfig, PropertyMeta};
pub use value::{ConfigValue, FromConfigValue};
pub use writer::{OptionSection, OptionWriter};

/// Prefix shared by every environment variable overlaid onto the config.
pub const ENV_PREFIX: &str = "QUARRY_";

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading or writing config files.
    Load(String),
    /// A property selector passed to the option writer is not a plain property name.
    InvalidProperty(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::InvalidProperty(name) => {
                write!(f, "Invalid option property '{name}': expected a plain property name")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Data-layer configuration loaded from YAML files, `.env` files, and environment variables.
///
/// `QuarryConfig` (= `QuarryConfig<()>`) provides raw key-value access only.
/// `QuarryConfig<T>` adds typed access to a config section via `Deref<Target = T>`.
///
/// Resolution order (lowest to highest priority):
/// 1. `quarry.yaml` (base)
/// 2. `quarry-{profile}.yaml` (profile override)
/// 3. `.env` file (loaded into process environment)
/// 4. `.env.{profile}` file (loaded into process environment)
/// 5. `QUARRY_*` environment variables (`QUARRY_DATASOURCE_URL` overrides `quarry.datasource.url`)
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `QUARRY_PROFILE` env var > argument > default `"dev"`.
#[derive(Debug, Clone)]
pub struct QuarryConfig<T = ()> {
    values: HashMap<String, ConfigValue>,
    profile: String,
    typed: T,
}

impl QuarryConfig {
    /// Load configuration for the given profile from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."), profile)
    }

    /// Load configuration for the given profile from `dir`.
    pub fn load_from_dir(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("QUARRY_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();

        loader::load_yaml_file(&dir.join("quarry.yaml"), &mut values)?;
        loader::load_yaml_file(&dir.join(format!("quarry-{active_profile}.yaml")), &mut values)?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        for (env_key, env_val) in std::env::vars() {
            if env_key.starts_with(ENV_PREFIX) && env_key != "QUARRY_PROFILE" {
                let config_key = env_key.to_lowercase().replace('_', ".");
                values.insert(config_key, ConfigValue::String(env_val));
            }
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");

        Ok(QuarryConfig {
            values,
            profile: active_profile,
            typed: (),
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(QuarryConfig {
            values,
            profile: profile.to_string(),
            typed: (),
        })
    }

    /// Create an empty config (useful for testing).
    pub fn empty() -> Self {
        QuarryConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
            typed: (),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Upgrade to a typed config by constructing `C` from the raw values.
    ///
    /// ```ignore
    /// let config = QuarryConfig::load("dev")?.with_typed::<DataSourceConfig>()?;
    /// config.url  // typed field access via Deref
    /// ```
    pub fn with_typed<C: ConfigProperties>(self) -> Result<QuarryConfig<C>, ConfigError> {
        let typed = C::from_config(&self)?;
        Ok(QuarryConfig {
            values: self.values,
            profile: self.profile,
            typed,
        })
    }
}

impl<T> QuarryConfig<T> {
    /// Get a typed value for the given dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing or mistyped.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Read a value scoped to `section` (`section.name`).
    pub fn get_in<V: FromConfigValue>(&self, section: &str, name: &str) -> Result<V, ConfigError> {
        self.get(&format!("{section}.{name}"))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn typed(&self) -> &T {
        &self.typed
    }
}

impl<T> Deref for QuarryConfig<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.typed
    }
}
