//! Structure scanner tests

use std::sync::atomic::Ordering;
use std::sync::Arc;

use autodeploy::analysis::scanner::{ScannerOptions, StructureScanner};
use autodeploy::models::repository::StructureNode;

use crate::support::{fullstack_repo, StubRepo};

#[tokio::test]
async fn test_scan_builds_nested_tree() {
    let scanner = StructureScanner::new(Arc::new(fullstack_repo()), ScannerOptions::default());
    let structure = scanner.scan("octo/app").await.unwrap();

    assert!(structure.has_file("package.json"));
    assert!(structure.has_file("backend/server.py"));
    assert!(structure.has_directory("frontend/src"));
    assert!(structure.degraded_paths().is_empty());
    assert_eq!(structure.file_count(), 6);

    match structure.lookup("frontend/src/App.js") {
        Some(StructureNode::File { path, .. }) => assert_eq!(path, "frontend/src/App.js"),
        other => panic!("unexpected node: {:?}", other),
    }
}

#[tokio::test]
async fn test_failing_subtree_is_degraded_and_scan_terminates() {
    let repo = fullstack_repo().failing_dir("frontend/src");
    let scanner = StructureScanner::new(Arc::new(repo), ScannerOptions::default());
    let structure = scanner.scan("octo/app").await.unwrap();

    assert_eq!(structure.degraded_paths(), vec!["frontend/src".to_string()]);
    let node = structure.lookup("frontend/src").unwrap();
    assert!(node.contents().unwrap().is_empty());

    // Siblings are unaffected
    assert!(structure.has_file("frontend/package.json"));
    assert!(structure.has_file("backend/server.py"));
}

#[tokio::test]
async fn test_root_failure_is_an_error() {
    let repo = fullstack_repo().failing_dir("");
    let scanner = StructureScanner::new(Arc::new(repo), ScannerOptions::default());
    assert!(scanner.scan("octo/app").await.is_err());
}

#[tokio::test]
async fn test_depth_limit_stops_listing() {
    let repo = Arc::new(StubRepo::new().with_file("a/b/c/d/deep.txt", "x"));
    let options = ScannerOptions {
        max_concurrency: 2,
        max_depth: 2,
    };
    let scanner = StructureScanner::new(repo.clone(), options);
    let structure = scanner.scan("octo/app").await.unwrap();

    assert!(structure.has_directory("a/b"));
    assert_eq!(structure.degraded_paths(), vec!["a/b/c".to_string()]);
    // root, a, a/b
    assert_eq!(repo.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_structure_serialization_shape() {
    let repo = StubRepo::new()
        .with_file("src/main.rs", "fn main() {}")
        .failing_dir("src");
    let scanner = StructureScanner::new(Arc::new(repo), ScannerOptions::default());
    let structure = scanner.scan("octo/app").await.unwrap();

    let value = serde_json::to_value(&structure).unwrap();
    assert_eq!(value["src"]["type"], "directory");
    assert_eq!(value["src"]["degraded"], true);
    assert_eq!(value["src"]["contents"], serde_json::json!({}));
}
