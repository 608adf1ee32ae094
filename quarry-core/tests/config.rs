use quarry_core::config::{ConfigError, ConfigValue, DataSourceConfig, QuarryConfig};
use serial_test::serial;

#[test]
fn empty_config_reports_missing_keys() {
    let config = QuarryConfig::empty();
    assert!(matches!(
        config.get::<String>("quarry.datasource.url"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn set_then_get_converts_types() {
    let mut config = QuarryConfig::empty();
    config.set("paging.take", ConfigValue::Integer(25));
    config.set("paging.enabled", ConfigValue::String("yes".into()));
    assert_eq!(config.get::<u32>("paging.take").unwrap(), 25);
    assert!(config.get::<bool>("paging.enabled").unwrap());
    assert_eq!(config.get::<String>("paging.take").unwrap(), "25");
}

#[test]
fn section_scoped_read() {
    let config = QuarryConfig::from_yaml_str("paging:\n  take: 50\n", "test").unwrap();
    assert_eq!(config.get_in::<i64>("paging", "take").unwrap(), 50);
}

#[test]
fn typed_datasource_section() {
    let yaml = r#"
quarry:
  datasource:
    url: "sqlite::memory:"
    default_schema: main
"#;
    let config = QuarryConfig::from_yaml_str(yaml, "test")
        .unwrap()
        .with_typed::<DataSourceConfig>()
        .unwrap();
    assert_eq!(config.url, "sqlite::memory:");
    assert_eq!(config.max_connections, DataSourceConfig::DEFAULT_MAX_CONNECTIONS);
    assert_eq!(config.default_schema.as_deref(), Some("main"));
}

#[test]
fn typed_section_requires_url() {
    let config = QuarryConfig::from_yaml_str("quarry:\n  datasource:\n    max_connections: 3\n", "test").unwrap();
    assert!(config.with_typed::<DataSourceConfig>().is_err());
}

#[test]
#[serial]
fn load_from_dir_layers_profile_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("quarry.yaml"),
        "quarry:\n  datasource:\n    url: base\n    max_connections: 4\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("quarry-prod.yaml"),
        "quarry:\n  datasource:\n    url: prod\n",
    )
    .unwrap();

    std::env::remove_var("QUARRY_PROFILE");
    std::env::set_var("QUARRY_DATASOURCE_MAX_CONNECTIONS", "8");
    let config = QuarryConfig::load_from_dir(dir.path(), "prod").unwrap();
    std::env::remove_var("QUARRY_DATASOURCE_MAX_CONNECTIONS");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("quarry.datasource.url").unwrap(), "prod");
    assert_eq!(config.get::<u32>("quarry.datasource.max.connections").unwrap(), 8);
    assert_eq!(config.get::<u32>("quarry.datasource.max_connections").unwrap(), 4);
}
