//! Statement shape and failure propagation for the partitioned copy.

mod common;

use common::{MockBackend, MockTable};
use partition_watch::ops::PartitionedCopy;
use partition_watch::MonitorError;

#[tokio::test]
async fn copy_creates_target_then_loads_the_partition() {
    let backend = MockBackend::new(vec![MockTable::new("warehouse.src").with_rows(
        &["vin", "area"],
        Vec::new(),
    )]);
    let copier = PartitionedCopy::new(&backend, "ds");

    copier
        .copy("warehouse.src", "warehouse.tgt", "2025-06-10")
        .await
        .unwrap();

    let statements = backend.issued();
    assert_eq!(
        statements,
        vec![
            "CREATE TABLE IF NOT EXISTS \"warehouse\".\"tgt\" \
             (\"vin\" text, \"area\" text, \"ds\" text)"
                .to_string(),
            "INSERT INTO \"warehouse\".\"tgt\" (\"vin\", \"area\", \"ds\") \
             SELECT \"vin\", \"area\", '2025-06-10' FROM \"warehouse\".\"src\""
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn source_partition_column_is_not_duplicated() {
    // the source already carries a ds column; the target must get exactly one
    let backend = MockBackend::new(vec![MockTable::new("warehouse.src").with_rows(
        &["vin", "ds"],
        Vec::new(),
    )]);
    let copier = PartitionedCopy::new(&backend, "ds");

    copier
        .copy("warehouse.src", "warehouse.tgt", "2025-06-10")
        .await
        .unwrap();

    let statements = backend.issued();
    let create = &statements[0];
    assert_eq!(create.matches("\"ds\"").count(), 1);
    assert!(create.contains("(\"vin\" text, \"ds\" text)"));
    let insert = &statements[1];
    assert!(insert.contains("(\"vin\", \"ds\") SELECT \"vin\", '2025-06-10'"));
}

#[tokio::test]
async fn source_without_columns_is_an_error() {
    let backend = MockBackend::new(vec![MockTable::new("warehouse.src")]);
    let copier = PartitionedCopy::new(&backend, "ds");

    let error = copier
        .copy("warehouse.src", "warehouse.tgt", "2025-06-10")
        .await
        .unwrap_err();

    assert!(matches!(error, MonitorError::Query(_)));
    assert!(error.to_string().contains("no columns"));
    // nothing was created or loaded
    assert!(backend.issued().is_empty());
}

#[tokio::test]
async fn schema_lookup_failure_propagates() {
    // a copy is an action, not an observation: unlike the monitoring path
    // it must fail loudly instead of degrading
    let backend = MockBackend::new(Vec::new());
    let copier = PartitionedCopy::new(&backend, "ds");

    let error = copier
        .copy("warehouse.missing", "warehouse.tgt", "2025-06-10")
        .await
        .unwrap_err();

    assert!(matches!(error, MonitorError::Query(_)));
    assert!(backend.issued().is_empty());
}
