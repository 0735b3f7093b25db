use std::path::Path;

use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

fn provider() -> (tempfile::TempDir, LocalStorageProvider) {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalStorageProvider::new(dir.path().to_path_buf());
    (dir, provider)
}

#[test]
fn test_write_and_read_string() {
    let (_dir, provider) = provider();
    let path = Path::new("notes/todo.txt");

    assert!(!provider.exists(path));
    provider.write_string(path, "hello").unwrap();
    assert!(provider.is_file(path));
    assert_eq!(provider.read_to_string(path).unwrap(), "hello");

    // Overwrites go through a temp file, the old content never reappears
    provider.write_string(path, "replaced").unwrap();
    assert_eq!(provider.read_to_string(path).unwrap(), "replaced");
}

#[test]
fn test_write_creates_parent_directories() {
    let (_dir, provider) = provider();
    let path = Path::new("a/b/c.json");
    provider.write_string(path, "{}").unwrap();
    assert!(provider.is_dir(Path::new("a/b")));
    assert!(provider.is_file(path));
}

#[test]
fn test_read_missing_file_fails() {
    let (_dir, provider) = provider();
    assert!(provider.read_to_string(Path::new("absent.txt")).is_err());
}

#[test]
fn test_read_dir_sorted() {
    let (_dir, provider) = provider();
    provider.write_string(Path::new("files/b.json"), "{}").unwrap();
    provider.write_string(Path::new("files/a.json"), "{}").unwrap();
    provider.write_string(Path::new("files/c.json"), "{}").unwrap();

    let entries = provider.read_dir(Path::new("files")).unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
}

#[test]
fn test_copy_and_remove() {
    let (_dir, provider) = provider();
    provider.write_string(Path::new("src.txt"), "payload").unwrap();
    provider
        .copy(Path::new("src.txt"), Path::new("nested/dst.txt"))
        .unwrap();
    assert_eq!(
        provider.read_to_string(Path::new("nested/dst.txt")).unwrap(),
        "payload"
    );

    provider.remove_file(Path::new("src.txt")).unwrap();
    assert!(!provider.exists(Path::new("src.txt")));
}
