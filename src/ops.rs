//! Data movement: create a date-partitioned copy of a table and load one
//! partition of data.
//!
//! Composes with a `QueryBackend` instead of owning a connection. Unlike
//! the monitoring path, failures here propagate: a copy is an action, not
//! an observation.

use tracing::info;

use crate::backend::{quote_ident, quote_literal, QueryBackend};
use crate::error::{MonitorError, Result};

pub struct PartitionedCopy<'a, B: QueryBackend> {
    backend: &'a B,
    partition_column: String,
}

impl<'a, B: QueryBackend> PartitionedCopy<'a, B> {
    pub fn new(backend: &'a B, partition_column: impl Into<String>) -> Self {
        Self {
            backend,
            partition_column: partition_column.into(),
        }
    }

    /// Create `target` with the source's columns plus the partition column,
    /// then load every source row into the given partition. Returns the
    /// number of rows copied.
    pub async fn copy(&self, source: &str, target: &str, partition_value: &str) -> Result<u64> {
        let schema = self.backend.describe_schema(source).await?;
        let columns: Vec<(String, String)> = schema
            .into_iter()
            .filter(|(name, _)| !name.is_empty() && name != &self.partition_column)
            .collect();
        if columns.is_empty() {
            return Err(MonitorError::Query(format!(
                "source table {source} has no columns to copy"
            )));
        }

        let column_defs = columns
            .iter()
            .map(|(name, type_name)| format!("{} {}", quote_ident(name), type_name))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = columns
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} ({column_defs}, {} text)",
            quote_ident(target),
            quote_ident(&self.partition_column)
        );
        info!(source, target, "creating partitioned target table");
        self.backend.execute_statement(&create).await?;

        let insert = format!(
            "INSERT INTO {} ({column_list}, {}) SELECT {column_list}, {} FROM {}",
            quote_ident(target),
            quote_ident(&self.partition_column),
            quote_literal(partition_value),
            quote_ident(source)
        );
        info!(source, target, partition_value, "loading partition");
        let copied = self.backend.execute_statement(&insert).await?;
        info!(source, target, copied, "partition copy complete");
        Ok(copied)
    }
}
