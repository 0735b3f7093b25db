use crate::record::dataset::Dataset;
use crate::record::error::RecordError;
use crate::record::{Record, RecordState};
use crate::storage::manager::DefaultStorageManager;

fn record(id: &str) -> Record {
    Record::new(id, "article").with_field("title", id)
}

#[test]
fn test_insert_rejects_duplicate_id() {
    let mut dataset = Dataset::new();
    dataset.insert(record("Smith2020")).unwrap();
    let err = dataset.insert(record("Smith2020")).unwrap_err();
    assert!(matches!(
        err,
        crate::kernel::error::Error::Record(RecordError::DuplicateId(_))
    ));
}

#[test]
fn test_unique_id_suffixes() {
    let mut dataset = Dataset::new();
    assert_eq!(dataset.unique_id("Smith2020"), "Smith2020");
    dataset.insert(record("Smith2020")).unwrap();
    let next = dataset.unique_id("Smith2020");
    assert_eq!(next, "Smith2020a");
    dataset.insert(record(&next)).unwrap();
    assert_eq!(dataset.unique_id("Smith2020"), "Smith2020b");
}

#[test]
fn test_state_queries() {
    let mut dataset = Dataset::new();
    dataset.insert(record("A2020")).unwrap();
    let mut advanced = record("B2021");
    advanced.set_status(RecordState::MdImported).unwrap();
    dataset.insert(advanced).unwrap();

    assert_eq!(dataset.count_in_state(RecordState::MdRetrieved), 1);
    assert_eq!(dataset.ids_in_state(RecordState::MdImported), vec!["B2021"]);
    let counts = dataset.state_counts();
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 2);
}

#[test]
fn test_save_writes_snapshot_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Dataset tests").unwrap();

    let mut dataset = Dataset::new();
    dataset.insert(record("Smith2020")).unwrap();
    dataset.save(&storage, "load").unwrap();
    dataset.insert(record("Jones2021")).unwrap();
    dataset.save(&storage, "prep").unwrap();

    let reloaded = Dataset::load(&storage).unwrap();
    assert_eq!(reloaded.len(), 2);

    let history = dir.path().join("history");
    assert!(history.join("0001-load.json").is_file());
    assert!(history.join("0002-prep.json").is_file());
    let log = std::fs::read_to_string(history.join("log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("load records=1"));
    assert!(lines[1].contains("prep records=2"));
}

#[test]
fn test_load_rejects_mismatched_store_key() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Dataset tests").unwrap();

    let raw = r#"{ "WrongKey": { "id": "Smith2020", "entrytype": "article", "status": "md_retrieved" } }"#;
    std::fs::write(dir.path().join("records.json"), raw).unwrap();

    let err = Dataset::load(&storage).unwrap_err();
    assert!(matches!(
        err,
        crate::kernel::error::Error::Record(RecordError::MalformedStore(_))
    ));
}

#[test]
fn test_pdf_path_from_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DefaultStorageManager::init(dir.path(), "Dataset tests").unwrap();

    let mut dataset = Dataset::new();
    dataset.insert(record("NoPdf2020")).unwrap();
    dataset
        .insert(record("HasPdf2020").with_field("file", "pdfs/HasPdf2020.pdf"))
        .unwrap();

    assert!(dataset.pdf_path(&storage, "NoPdf2020").is_none());
    let path = dataset.pdf_path(&storage, "HasPdf2020").unwrap();
    assert!(path.ends_with("pdfs/HasPdf2020.pdf"));
}
