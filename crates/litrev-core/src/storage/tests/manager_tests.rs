use crate::kernel::constants;
use crate::storage::manager::{DefaultStorageManager, StorageManager};

#[test]
fn test_init_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Layout test").unwrap();

    assert!(dir.path().join(constants::SETTINGS_FILE).is_file());
    assert!(dir.path().join(constants::RECORDS_FILE).is_file());
    assert!(storage.search_dir().is_dir());
    assert!(storage.pdf_dir().is_dir());
    assert!(dir.path().join(constants::HISTORY_DIR).is_dir());

    let settings = storage.load_settings().unwrap();
    assert_eq!(settings.project.title, "Layout test");
}

#[test]
fn test_init_refuses_existing_project() {
    let dir = tempfile::tempdir().unwrap();
    DefaultStorageManager::init(dir.path(), "First").unwrap();
    assert!(DefaultStorageManager::init(dir.path(), "Second").is_err());
}

#[test]
fn test_open_walks_upward() {
    let dir = tempfile::tempdir().unwrap();
    DefaultStorageManager::init(dir.path(), "Nested open").unwrap();

    let nested = dir.path().join("search").join("deeper");
    std::fs::create_dir_all(&nested).unwrap();

    let storage = DefaultStorageManager::open(&nested).unwrap();
    assert_eq!(storage.project_root(), dir.path());
}

#[test]
fn test_open_without_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DefaultStorageManager::open(dir.path()).is_err());
}

#[test]
fn test_settings_round_trip_via_manager() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Settings").unwrap();

    let mut settings = storage.load_settings().unwrap();
    settings.prescreen.explanation = Some("scope: 2015 onwards".to_string());
    storage.save_settings(&settings).unwrap();

    let reloaded = storage.load_settings().unwrap();
    assert_eq!(
        reloaded.prescreen.explanation.as_deref(),
        Some("scope: 2015 onwards")
    );
}

#[test]
fn test_package_dirs_under_project_root() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Dirs").unwrap();
    assert_eq!(
        storage.custom_packages_dir(),
        dir.path().join(constants::CUSTOM_PACKAGES_DIR)
    );
}
