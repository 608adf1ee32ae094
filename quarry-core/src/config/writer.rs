//! Section-scoped writes of single option values back into a YAML settings file.

use std::path::{Path, PathBuf};

use super::value::ConfigValue;
use super::ConfigError;

/// A group of options persisted under one section of the settings file.
///
/// ```ignore
/// struct Paging;
///
/// impl OptionSection for Paging {
///     const SECTION_NAME: &'static str = "quarry.paging";
/// }
///
/// writer.write_option::<Paging>("default_take", 50)?;
/// ```
pub trait OptionSection {
    /// Dot-separated section path (e.g. `"quarry.paging"`).
    const SECTION_NAME: &'static str;
}

/// Persists option values into a YAML file, one property at a time.
#[derive(Debug, Clone)]
pub struct OptionWriter {
    path: PathBuf,
}

impl OptionWriter {
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if `path` is empty.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Load("option file path is empty".into()));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `S::SECTION_NAME.property` to `value` and persist the file.
    ///
    /// The existing file is reloaded first so that concurrent edits of
    /// other keys are preserved; a missing file is created.
    pub fn write_option<S: OptionSection>(
        &self,
        property: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        if !is_plain_property(property) {
            return Err(ConfigError::InvalidProperty(property.to_string()));
        }

        let mut root = self.read_document()?;
        let section = descend(&mut root, S::SECTION_NAME)?;
        section.insert(
            serde_yaml::Value::String(property.to_string()),
            value.into().to_yaml(),
        );

        let content = serde_yaml::to_string(&root).map_err(|e| ConfigError::Load(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::Load(e.to_string()))?;

        tracing::debug!(
            file = %self.path.display(),
            section = S::SECTION_NAME,
            property,
            "option written"
        );
        Ok(())
    }

    fn read_document(&self) -> Result<serde_yaml::Value, ConfigError> {
        if !self.path.exists() {
            return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Load(e.to_string()))?;
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(match doc {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
            other => other,
        })
    }
}

/// Walk (and create) the nested mappings named by a dotted section path.
fn descend<'a>(
    root: &'a mut serde_yaml::Value,
    section: &str,
) -> Result<&'a mut serde_yaml::Mapping, ConfigError> {
    let mut current = root;
    for segment in section.split('.').filter(|s| !s.is_empty()) {
        let mapping = current
            .as_mapping_mut()
            .ok_or_else(|| ConfigError::Load(format!("'{segment}' is not inside a mapping")))?;
        let key = serde_yaml::Value::String(segment.to_string());
        if !matches!(mapping.get(&key), Some(serde_yaml::Value::Mapping(_))) {
            mapping.insert(key.clone(), serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
        }
        current = mapping
            .get_mut(&key)
            .ok_or_else(|| ConfigError::Load(format!("section '{segment}' vanished")))?;
    }
    current
        .as_mapping_mut()
        .ok_or_else(|| ConfigError::Load(format!("section '{section}' is not a mapping")))
}

fn is_plain_property(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
