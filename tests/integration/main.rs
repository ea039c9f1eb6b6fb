//! Integration tests for Unitgraph
//!
//! These tests verify that loading, the graph, the session and the CLI work
//! together on a repository laid out on disk.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use unitgraph_core::{MetadataGraph, UnitId};
use unitgraph_loader::{Config, ManifestCache};
use unitgraph_watcher::{Session, WatchEvent, WatcherService};

/// A small repository: `cmd` imports `api`, which imports `store`; the
/// `api` directory also has a stray file claimed by an ad-hoc unit.
fn sample_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "store/units.json",
        r#"{"id": "example.com/store", "name": "store", "files": ["store.go"]}"#,
    );
    write(
        root,
        "api/units.json",
        r#"
        {"id": "example.com/api", "name": "api",
         "deps": {"example.com/store": "example.com/store"},
         "files": ["api.go", "scratch.go"]}
        {"id": "command-line-arguments", "files": ["scratch.go"]}
        "#,
    );
    write(
        root,
        "cmd/units.json",
        r#"[{"id": "example.com/cmd", "deps": {"example.com/api": "example.com/api"}, "files": ["main.go"]}]"#,
    );
    write(root, "target/units.json", r#"{"id": "should-be-ignored"}"#);
    temp_dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn load(root: &Path) -> (Arc<ManifestCache>, Arc<MetadataGraph>) {
    let config = Config::load(root, None).unwrap();
    let manifests = Arc::new(ManifestCache::new());
    let updates = manifests.load_all(root, &config).unwrap();
    let graph = Arc::new(MetadataGraph::with_classifier(config.classifier().unwrap()))
        .clone_with_updates(&updates);
    (manifests, graph)
}

fn unitgraph(root: &Path, args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_unitgraph"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "unitgraph {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_load_repository_into_graph() {
    let temp_dir = sample_repo();
    let root = temp_dir.path();
    let (manifests, graph) = load(root);

    assert_eq!(manifests.len(), 3);
    assert_eq!(graph.len(), 4);
    assert!(!graph.contains(&UnitId::new("should-be-ignored")));

    // the real unit shadows the ad-hoc one
    assert_eq!(
        graph.file_owners(&root.join("api/scratch.go")),
        &[UnitId::new("example.com/api")]
    );
    assert_eq!(
        graph.file_owners(&root.join("api/api.go")),
        &[UnitId::new("example.com/api")]
    );

    let affected: Vec<String> = graph
        .affected_by_files([root.join("store/store.go").as_path()])
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(
        affected,
        vec!["example.com/api", "example.com/cmd", "example.com/store"]
    );
}

#[test]
fn test_cache_round_trip() {
    let temp_dir = sample_repo();
    let root = temp_dir.path();
    let (_, graph) = load(root);

    unitgraph_core::save_graph(&graph, root).unwrap();
    let cached = unitgraph_core::load_graph(root, graph.classifier().clone())
        .unwrap()
        .unwrap();

    assert_eq!(cached.statistics(), graph.statistics());
    assert_eq!(
        cached.imported_by(&UnitId::new("example.com/store")),
        graph.imported_by(&UnitId::new("example.com/store"))
    );
}

#[test]
fn test_session_follows_manifest_edits() {
    let temp_dir = sample_repo();
    let root = temp_dir.path();
    let (manifests, graph) = load(root);
    let session = Arc::new(Session::new(graph));
    let service = WatcherService::new(root, &Config::default(), manifests, Arc::clone(&session)).unwrap();

    tokio_test::block_on(async {
        let before = session.current().await;

        write(
            root,
            "cmd/units.json",
            r#"[{"id": "example.com/cmd", "deps": {"example.com/store": "example.com/store"}, "files": ["main.go"]}]"#,
        );
        service
            .handle_batch(vec![WatchEvent::Modified(root.join("cmd/units.json"))])
            .await
            .unwrap();

        let after = session.current().await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.imported_by(&UnitId::new("example.com/api")).is_empty());
        assert_eq!(
            before.imported_by(&UnitId::new("example.com/api")),
            &[UnitId::new("example.com/cmd")]
        );

        let invalidated = session.invalidate(&[root.join("api/api.go")]).await;
        assert_eq!(invalidated.len(), 1);
    });
}

#[test]
fn test_cli_invocation() {
    let temp_dir = TempDir::new().unwrap();
    let stdout = unitgraph(temp_dir.path(), &["--help"]);
    assert!(stdout.contains("Compilation-unit dependency graph"));

    let stdout = unitgraph(temp_dir.path(), &["version"]);
    assert!(stdout.starts_with("Unitgraph v"));
}

#[test]
fn test_cli_queries() {
    let temp_dir = sample_repo();
    let root = temp_dir.path();

    let stdout = unitgraph(root, &["index"]);
    assert!(stdout.contains("units:             4"));
    assert!(root.join(".unitgraph/cache.json").exists());

    let stdout = unitgraph(root, &["--cached", "owners", "api/scratch.go", "nowhere.go"]);
    assert_eq!(stdout, "api/scratch.go: example.com/api\nnowhere.go: (no owners)\n");

    let stdout = unitgraph(root, &["affected", "example.com/api"]);
    assert_eq!(stdout, "example.com/api\nexample.com/cmd\n");

    let stdout = unitgraph(root, &["affected", "--files", "store/store.go"]);
    assert_eq!(stdout.lines().count(), 3);

    let stdout = unitgraph(root, &["dot"]);
    assert!(stdout.starts_with("digraph"));

    unitgraph(root, &["clear"]);
    assert!(!root.join(".unitgraph").exists());
}
