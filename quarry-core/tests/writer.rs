use quarry_core::config::{ConfigError, OptionSection, OptionWriter, QuarryConfig};

struct Paging;

impl OptionSection for Paging {
    const SECTION_NAME: &'static str = "quarry.paging";
}

struct Root;

impl OptionSection for Root {
    const SECTION_NAME: &'static str = "general";
}

#[test]
fn writes_into_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    let writer = OptionWriter::new(&path).unwrap();

    writer.write_option::<Paging>("default_take", 50).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let config = QuarryConfig::from_yaml_str(&content, "test").unwrap();
    assert_eq!(config.get::<i64>("quarry.paging.default_take").unwrap(), 50);
}

#[test]
fn preserves_existing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    std::fs::write(&path, "general:\n  name: library\nquarry:\n  paging:\n    default_take: 10\n").unwrap();
    let writer = OptionWriter::new(&path).unwrap();

    writer.write_option::<Paging>("default_take", 20).unwrap();
    writer.write_option::<Root>("enabled", true).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let config = QuarryConfig::from_yaml_str(&content, "test").unwrap();
    assert_eq!(config.get::<String>("general.name").unwrap(), "library");
    assert!(config.get::<bool>("general.enabled").unwrap());
    assert_eq!(config.get::<i64>("quarry.paging.default_take").unwrap(), 20);
}

#[test]
fn rejects_non_property_names() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OptionWriter::new(dir.path().join("settings.yaml")).unwrap();
    let err = writer.write_option::<Paging>("take()", 1).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidProperty(_)));
}

#[test]
fn rejects_empty_path() {
    assert!(OptionWriter::new("").is_err());
}
