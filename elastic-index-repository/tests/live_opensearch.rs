//! End-to-end tests against a running OpenSearch node.
//!
//! The node is taken from `ELASTIC_URL` (default http://localhost:9200).
//!
//! Run with: cargo test -p elastic-index-repository --test live_opensearch -- --ignored

use elastic_index_repository::{
    BulkOptions, Document, DumpOptions, IndexHandle, IndexOptions, ReindexOptions, ScrollOptions,
};
use serde_json::{json, Value};
use uuid::Uuid;

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("test documents must be objects"),
    }
}

async fn open(name: &str, mapping: Option<Value>) -> IndexHandle {
    let mut options = IndexOptions::from_env()
        .expect("Failed to read options")
        .replacing_existing(true);
    if let Some(mapping) = mapping {
        options = options.with_mapping(mapping);
    }
    IndexHandle::open(name, "document", options)
        .await
        .expect("Failed to open index")
}

async fn populate(handle: &IndexHandle) {
    for (id, flag) in [("1", true), ("2", false), ("3", true), ("4", false)] {
        let accepted = handle
            .index_into(&doc(json!({"test": flag})), id)
            .await
            .expect("Failed to index document");
        assert!(accepted);
    }
    handle.refresh().await.expect("Failed to refresh");
}

#[tokio::test]
#[ignore = "Requires a running OpenSearch node"]
async fn test_scan_and_scroll() {
    let handle = open(&unique_name("scan"), None).await;
    populate(&handle).await;

    let all = handle.scan_all(None).await.expect("Failed to scan");
    assert_eq!(all.len(), 4);

    let mut cursor = handle.scroll(None, ScrollOptions::default().with_size(2));
    let mut sizes = Vec::new();
    while let Some(batch) = cursor.next_batch().await.expect("Failed to scroll") {
        sizes.push(batch.len());
    }
    assert_eq!(sizes, vec![2, 2]);
    assert!(cursor.is_exhausted());

    handle.delete().await.expect("Failed to delete index");
}

#[tokio::test]
#[ignore = "Requires a running OpenSearch node"]
async fn test_index_into_rejects_mapping_conflict() {
    let mapping = json!({"properties": {"object": {"type": "text"}}});
    let handle = open(&unique_name("mapping"), Some(mapping)).await;

    let accepted = handle
        .index_into(&doc(json!({"test": true, "object": "string"})), "5")
        .await
        .expect("Failed to index document");
    assert!(accepted);

    let rejected = handle
        .index_into(&doc(json!({"test": true, "object": {"sub": "string"}})), "6")
        .await
        .expect("Rejection must not be an error");
    assert!(!rejected);

    assert_eq!(
        handle.get("5").await.expect("Failed to get"),
        Some(doc(json!({"test": true, "object": "string"})))
    );
    assert_eq!(handle.get("6").await.expect("Failed to get"), None);

    handle.delete().await.expect("Failed to delete index");
}

#[tokio::test]
#[ignore = "Requires a running OpenSearch node"]
async fn test_bulk_mixed_validity() {
    let mapping = json!({"properties": {"object": {"type": "text"}}});
    let handle = open(&unique_name("bulk"), Some(mapping)).await;

    let documents = vec![
        doc(json!({"key": "a", "object": "fine"})),
        doc(json!({"key": "b", "object": {"nested": true}})),
        doc(json!({"key": "c", "object": "fine"})),
    ];
    let result = handle
        .bulk_apply(documents, &BulkOptions::index_by("key"))
        .await
        .expect("Bulk request failed");

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded + result.failures.len(), 3);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].id.as_deref(), Some("b"));

    handle.delete().await.expect("Failed to delete index");
}

#[tokio::test]
#[ignore = "Requires a running OpenSearch node"]
async fn test_reindex_and_dump() {
    let source = open(&unique_name("source"), None).await;
    populate(&source).await;

    let documents: Vec<Document> = (0..25)
        .map(|i| doc(json!({"key": format!("k{}", i), "n": i})))
        .collect();
    source
        .bulk_apply(documents, &BulkOptions::index_by("key"))
        .await
        .expect("Bulk request failed");
    source.refresh().await.expect("Failed to refresh");

    let report = source
        .reindex(
            &unique_name("target"),
            None,
            ReindexOptions::default().replacing_existing(true).with_batch_size(10),
        )
        .await
        .expect("Reindex failed");
    assert!(report.result.is_success());
    report.target.refresh().await.expect("Failed to refresh");
    assert_eq!(
        report.target.count(None).await.expect("Failed to count"),
        source.count(None).await.expect("Failed to count")
    );

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let summary = source
        .dump(dir.path(), DumpOptions::default())
        .await
        .expect("Dump failed");
    let content = std::fs::read_to_string(&summary.path).expect("Failed to read dump");
    let parsed: Vec<Document> = serde_json::from_str(&content).expect("Dump is not a JSON array");
    assert_eq!(parsed.len(), 29);

    let scanned = source.scan_all(None).await.expect("Failed to scan");
    for document in &scanned {
        assert!(parsed.contains(document));
    }

    report.target.delete().await.expect("Failed to delete target");
    source.delete().await.expect("Failed to delete source");
}
