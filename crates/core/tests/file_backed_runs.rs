//! Runs against real files: CSV sources on disk with JSON or SQLite status.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use dispatcher_core::{
    testing::{fixtures, MockRequestSink},
    CsvDirectorySource, DispatchConfig, DispatchEngine, ItemState, JsonFileBackend, SqliteBackend,
    StatusStore, StopReason,
};

const PATTERN: &str = r"^domains_.*\.csv$";

fn write_sources(dir: &Path) {
    std::fs::write(
        dir.join("domains_1.csv"),
        fixtures::csv(&[("1", "a.com"), ("2", "b.com"), ("", "no-id.com")]),
    )
    .unwrap();
    std::fs::write(
        dir.join("domains_2.csv"),
        fixtures::csv(&[("3", "c.com"), ("4", "")]),
    )
    .unwrap();
    std::fs::write(dir.join("notes.txt"), "not a source").unwrap();
}

async fn run_once(
    sources: &Path,
    status: StatusStore,
    sink: &MockRequestSink,
    config: DispatchConfig,
) -> dispatcher_core::RunSummary {
    let source = CsvDirectorySource::new(sources, PATTERN).expect("Failed to create source");
    let mut engine = DispatchEngine::new(config, Arc::new(source), Arc::new(sink.clone()), status)
        .expect("Failed to create engine");
    engine.run().await.expect("Run failed")
}

#[tokio::test]
async fn test_json_status_survives_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_sources(temp_dir.path());
    let status_path = temp_dir.path().join("state").join("tasks.json");
    let sink = MockRequestSink::new();
    sink.fail_domain("c.com");

    let first = run_once(
        temp_dir.path(),
        StatusStore::new(JsonFileBackend::new(&status_path)),
        &sink,
        DispatchConfig::default(),
    )
    .await;
    assert_eq!(first.sources_read, 2);
    assert_eq!(first.counters.total_seen, 3);
    assert_eq!(first.counters.processed, 2);
    assert_eq!(first.counters.failed, 1);

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
    assert_eq!(document["a.com"]["id"], 1);
    assert_eq!(document["a.com"]["state"], "processed");
    assert_eq!(document["c.com"]["state"], "failed");

    sink.recover_domain("c.com");
    let second = run_once(
        temp_dir.path(),
        StatusStore::new(JsonFileBackend::new(&status_path)),
        &sink,
        DispatchConfig::default(),
    )
    .await;
    assert_eq!(second.counters.skipped, 2);
    assert_eq!(second.counters.processed, 1);
    assert_eq!(
        sink.submitted_domains(),
        vec!["a.com", "b.com", "c.com", "c.com"]
    );
}

#[tokio::test]
async fn test_legacy_status_file_is_honoured() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_sources(temp_dir.path());
    let status_path = temp_dir.path().join("tasks.json");
    std::fs::write(
        &status_path,
        r#"{"a.com": {"id": 1, "status": "processed"}, "b.com": {"id": 2, "status": "que"}}"#,
    )
    .unwrap();
    let sink = MockRequestSink::new();

    let summary = run_once(
        temp_dir.path(),
        StatusStore::new(JsonFileBackend::new(&status_path)),
        &sink,
        DispatchConfig::default(),
    )
    .await;

    assert_eq!(summary.counters.skipped, 1);
    assert_eq!(sink.submitted_domains(), vec!["b.com", "c.com"]);
}

#[tokio::test]
async fn test_status_file_with_null_id_keeps_its_records() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let sources = temp_dir.path().join("domains");
    std::fs::create_dir_all(&sources).unwrap();
    std::fs::write(
        sources.join("domains_1.csv"),
        fixtures::csv(&[("1", "a.com"), ("3", "c.com")]),
    )
    .unwrap();
    let status_path = temp_dir.path().join("tasks.json");
    std::fs::write(
        &status_path,
        r#"{"a.com":{"id":1,"status":"processed"},"b.com":{"id":null,"status":"processed"}}"#,
    )
    .unwrap();
    let sink = MockRequestSink::new();

    let summary = run_once(
        &sources,
        StatusStore::new(JsonFileBackend::new(&status_path)),
        &sink,
        DispatchConfig::default(),
    )
    .await;

    assert_eq!(summary.counters.skipped, 1);
    assert_eq!(sink.submitted_domains(), vec!["c.com"]);

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
    assert_eq!(document["a.com"]["state"], "processed");
    assert_eq!(document["b.com"]["state"], "processed");
    assert_eq!(document["c.com"]["state"], "processed");
}

#[tokio::test]
async fn test_sqlite_status_resumes_after_ceiling() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_sources(temp_dir.path());
    let db_path = temp_dir.path().join("tasks.db");
    let sink = MockRequestSink::new();

    let capped = DispatchConfig {
        max_concurrent_per_source: Some(1),
        global_item_ceiling: Some(2),
        ..Default::default()
    };
    let first = run_once(
        temp_dir.path(),
        StatusStore::new(SqliteBackend::new(&db_path).unwrap()),
        &sink,
        capped,
    )
    .await;
    assert_eq!(first.stop_reason, StopReason::CeilingReached);
    assert_eq!(first.sources_read, 1);

    let mut reopened = StatusStore::new(SqliteBackend::new(&db_path).unwrap());
    assert_eq!(reopened.load().await, 2);
    assert_eq!(reopened.state("b.com"), Some(ItemState::Processed));

    let second = run_once(
        temp_dir.path(),
        StatusStore::new(SqliteBackend::new(&db_path).unwrap()),
        &sink,
        DispatchConfig::default(),
    )
    .await;
    assert_eq!(second.stop_reason, StopReason::Completed);
    assert_eq!(second.counters.total_submitted, 1);
    assert_eq!(sink.submitted_domains(), vec!["a.com", "b.com", "c.com"]);
}

#[tokio::test]
async fn test_empty_source_directory_completes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let sink = MockRequestSink::new();

    let summary = run_once(
        temp_dir.path(),
        StatusStore::new(JsonFileBackend::new(temp_dir.path().join("tasks.json"))),
        &sink,
        DispatchConfig::default(),
    )
    .await;
    assert_eq!(summary.stop_reason, StopReason::Completed);
    assert_eq!(summary.sources_read, 0);
    assert_eq!(sink.submit_count(), 0);
}
