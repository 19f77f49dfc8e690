//! Spec-directory ingestion tests using real files on disk.
//! Testing library/framework: Rust built-in test framework with tempfile
//! for throwaway spec directories.

use std::fs;
use std::path::Path;

use buildswarm::spec::{ingest, SpecError};
use tempfile::TempDir;

fn write_component(spec_dir: &Path, name: &str, content: &str) {
    let components = spec_dir.join("components");
    fs::create_dir_all(&components).unwrap();
    fs::write(components.join(format!("{name}.md")), content).unwrap();
}

#[test]
fn ingests_components_with_dependencies() {
    let dir = TempDir::new().unwrap();
    write_component(dir.path(), "api", "# api\n\nDepends on:\n- db\n");
    write_component(dir.path(), "db", "# db\n\nA storage layer.\n");
    write_component(
        dir.path(),
        "web",
        "# web\n\n## interfaces\n\ndepends on:\n- api\n- db\n",
    );

    let components = ingest(dir.path()).unwrap();

    assert_eq!(components.len(), 3);
    assert_eq!(components.get("api").unwrap().dependencies, vec!["db"]);
    assert!(components.get("db").unwrap().dependencies.is_empty());
    assert_eq!(
        components.get("web").unwrap().dependencies,
        vec!["api", "db"]
    );
}

#[test]
fn ingestion_order_follows_sorted_file_names() {
    let dir = TempDir::new().unwrap();
    write_component(dir.path(), "zeta", "leaf\n");
    write_component(dir.path(), "alpha", "leaf\n");
    write_component(dir.path(), "mid", "leaf\n");

    let components = ingest(dir.path()).unwrap();
    let names: Vec<&str> = components.names().iter().map(String::as_str).collect();
    assert_eq!(names, ["alpha", "mid", "zeta"]);
}

#[test]
fn non_markdown_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    write_component(dir.path(), "api", "leaf\n");
    fs::write(dir.path().join("components/notes.txt"), "not a spec").unwrap();

    let components = ingest(dir.path()).unwrap();
    assert_eq!(components.len(), 1);
}

#[test]
fn missing_components_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = ingest(dir.path()).unwrap_err();
    assert!(matches!(err, SpecError::MissingComponentsDir(_)));
}

#[test]
fn empty_spec_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("components")).unwrap();
    let err = ingest(dir.path()).unwrap_err();
    assert!(matches!(err, SpecError::EmptySpec(_)));
}

#[test]
fn dependencies_on_unknown_components_are_kept_verbatim() {
    // The resolver skips unknown names later; ingestion records them.
    let dir = TempDir::new().unwrap();
    write_component(dir.path(), "api", "depends on:\n- phantom\n");

    let components = ingest(dir.path()).unwrap();
    assert_eq!(components.get("api").unwrap().dependencies, vec!["phantom"]);
}
