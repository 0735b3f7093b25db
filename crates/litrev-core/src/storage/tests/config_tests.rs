use std::path::Path;

use crate::storage::config::{ConfigData, ConfigFormat};

#[test]
fn test_format_from_path() {
    assert_eq!(
        ConfigFormat::from_path(Path::new("package.json")),
        Some(ConfigFormat::Json)
    );
    assert_eq!(ConfigFormat::from_path(Path::new("package.ini")), None);
    assert_eq!(ConfigFormat::from_path(Path::new("noextension")), None);
    assert_eq!(ConfigFormat::Json.extension(), "json");
}

#[test]
fn test_get_set_typed_values() {
    let mut config = ConfigData::new();
    config.set("threshold", 3u32).unwrap();
    config.set("label", "exact").unwrap();

    assert_eq!(config.get::<u32>("threshold"), Some(3));
    assert_eq!(config.get::<String>("label"), Some("exact".to_string()));
    // Wrong type comes back as None, not a panic
    assert_eq!(config.get::<u32>("label"), None);
    assert_eq!(config.get_or::<u32>("missing", 7), 7);
}

#[test]
fn test_merge_overrides_existing() {
    let mut base = ConfigData::new();
    base.set("a", 1).unwrap();
    base.set("b", 1).unwrap();

    let mut overlay = ConfigData::new();
    overlay.set("b", 2).unwrap();
    overlay.set("c", 3).unwrap();

    base.merge(&overlay);
    assert_eq!(base.get::<i32>("a"), Some(1));
    assert_eq!(base.get::<i32>("b"), Some(2));
    assert_eq!(base.get::<i32>("c"), Some(3));
}

#[test]
fn test_json_round_trip() {
    let mut config = ConfigData::new();
    config.set("enabled", true).unwrap();
    config.set("name", "local_files").unwrap();

    let raw = config.serialize(ConfigFormat::Json).unwrap();
    let restored = ConfigData::deserialize(&raw, ConfigFormat::Json).unwrap();
    assert_eq!(restored.get::<bool>("enabled"), Some(true));
    assert_eq!(restored.get::<String>("name"), Some("local_files".to_string()));
}

#[test]
fn test_deserialize_invalid_json_fails() {
    assert!(ConfigData::deserialize("not json", ConfigFormat::Json).is_err());
}
