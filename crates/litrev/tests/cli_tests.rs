use assert_cmd::Command;
use predicates::prelude::*;

fn litrev() -> Command {
    Command::cargo_bin("litrev").unwrap()
}

#[test]
fn test_init_creates_project() {
    let dir = tempfile::tempdir().unwrap();

    litrev()
        .current_dir(dir.path())
        .args(["init", "--title", "CLI test review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized review project"));

    assert!(dir.path().join("settings.json").is_file());
    assert!(dir.path().join("records.json").is_file());
    assert!(dir.path().join("search").is_dir());
    assert!(dir.path().join("pdfs").is_dir());
}

#[test]
fn test_init_refuses_existing_project() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();
    litrev()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_status_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    litrev()
        .current_dir(dir.path())
        .args(["init", "--title", "Status review"])
        .assert()
        .success();

    litrev()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: Status review"))
        .stdout(predicate::str::contains("Records: 0"));
}

#[test]
fn test_status_outside_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    litrev()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_packages_list_shows_curated_index() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();

    litrev()
        .current_dir(dir.path())
        .args(["packages", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("json_import"))
        .stdout(predicate::str::contains("exact_match"))
        // Curated but not installed in this build
        .stdout(predicate::str::contains("crossref"));

    litrev()
        .current_dir(dir.path())
        .args(["packages", "list", "--type", "dedupe", "--installed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact_match"))
        .stdout(predicate::str::contains("json_import").not());
}

#[test]
fn test_packages_show_unknown_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();

    litrev()
        .current_dir(dir.path())
        .args(["packages", "show", "nonsense", "json_import"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown endpoint type"));
}

#[test]
fn test_full_run_processes_search_results() {
    let dir = tempfile::tempdir().unwrap();
    litrev()
        .current_dir(dir.path())
        .args(["init", "--title", "Pipeline review"])
        .assert()
        .success();

    std::fs::write(
        dir.path().join("search").join("results.json"),
        r#"[
            { "id": "Smith2020", "entrytype": "article", "title": "A study", "author": "Smith, Sam", "year": "2020" },
            { "id": "Jones2021", "entrytype": "article", "title": "Another study", "author": "Jones, Jo", "year": "2021" }
        ]"#,
    )
    .unwrap();

    litrev()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("review.load"))
        .stdout(predicate::str::contains("review.data"));

    // No PDFs were provided, so both records wait for manual retrieval
    litrev()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records: 2"))
        .stdout(predicate::str::contains("pdf_needs_manual_retrieval"));
}

#[test]
fn test_dry_run_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();

    std::fs::write(
        dir.path().join("search").join("results.json"),
        r#"[ { "id": "Smith2020", "entrytype": "article", "title": "A study" } ]"#,
    )
    .unwrap();

    litrev()
        .current_dir(dir.path())
        .args(["load", "--dry-run"])
        .assert()
        .success();

    litrev()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records: 0"));
}

#[test]
fn test_search_runs_without_configured_sources() {
    let dir = tempfile::tempdir().unwrap();
    litrev()
        .current_dir(dir.path())
        .args(["init", "--title", "Search review"])
        .assert()
        .success();

    litrev()
        .current_dir(dir.path())
        .arg("search")
        .assert()
        .success()
        .stdout(predicate::str::contains("review.search"));
}

#[test]
fn test_packages_show_builtin_schema() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();
    litrev()
        .current_dir(dir.path())
        .args(["packages", "show", "prep_man", "export_man_prep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prep_man / export_man_prep"));
}

#[test]
fn test_packages_show_uninstalled_entry_fails() {
    let dir = tempfile::tempdir().unwrap();
    litrev().current_dir(dir.path()).arg("init").assert().success();
    litrev()
        .current_dir(dir.path())
        .args(["packages", "show", "search_source", "crossref"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));
}
