//! Partition inspection: latest-partition discovery, detail-row fetch, and
//! status-column distribution.
//!
//! Everything here is a best-effort observation. A failed query during a
//! monitoring pass degrades to "no partition found" / empty output rather
//! than aborting the run, so one broken table never hides the rest.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{quote_ident, quote_literal, value_to_string, QueryBackend};

/// The most recent partition of one table, as observed by a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionSnapshot {
    pub table: String,
    /// `None` when no partition satisfies the cutoff (or the table could
    /// not be queried at all; the two are deliberately indistinguishable).
    pub partition_key: Option<String>,
    pub row_count: i64,
}

impl PartitionSnapshot {
    fn missing(table: &str) -> Self {
        Self {
            table: table.to_string(),
            partition_key: None,
            row_count: 0,
        }
    }
}

/// Distribution of the designated status column within one partition.
///
/// Absence of the column is a legitimate outcome, not an error; an
/// unrelated query fault keeps its text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub has_status_field: bool,
    pub distinct_values: BTreeSet<String>,
    pub error: Option<String>,
}

impl StatusDistribution {
    pub fn absent() -> Self {
        Self {
            has_status_field: false,
            distinct_values: BTreeSet::new(),
            error: None,
        }
    }
}

pub struct PartitionInspector<'a, B: QueryBackend> {
    backend: &'a B,
    partition_column: String,
}

impl<'a, B: QueryBackend> PartitionInspector<'a, B> {
    pub fn new(backend: &'a B, partition_column: impl Into<String>) -> Self {
        Self {
            backend,
            partition_column: partition_column.into(),
        }
    }

    /// Find the most recent partition key and its row count.
    ///
    /// Issues a MAX aggregate (optionally bounded below) and, when a
    /// maximum exists, a COUNT over that exact key.
    pub async fn latest_partition(
        &self,
        table: &str,
        lower_bound_exclusive: Option<NaiveDate>,
    ) -> PartitionSnapshot {
        let statement = max_partition_statement(
            table,
            &self.partition_column,
            lower_bound_exclusive
                .map(|d| d.format("%Y-%m-%d").to_string())
                .as_deref(),
        );
        debug!(table, %statement, "querying latest partition");

        let max_value = match self.backend.execute_scalar(&statement).await {
            Ok(value) => value.as_ref().and_then(value_to_string),
            Err(error) => {
                warn!(table, %error, "latest-partition query failed, treating as missing");
                return PartitionSnapshot::missing(table);
            }
        };
        let Some(partition_key) = max_value else {
            return PartitionSnapshot::missing(table);
        };

        let statement = count_statement(table, &self.partition_column, &partition_key);
        debug!(table, %statement, "querying partition row count");
        let row_count = match self.backend.execute_scalar(&statement).await {
            Ok(value) => value.as_ref().and_then(scalar_to_i64).unwrap_or(0),
            Err(error) => {
                warn!(table, %error, "row-count query failed, treating as missing");
                return PartitionSnapshot::missing(table);
            }
        };

        PartitionSnapshot {
            table: table.to_string(),
            partition_key: Some(partition_key),
            row_count,
        }
    }

    /// Fetch every row of one partition. Column names are normalized by
    /// stripping any `table.`-qualifier prefix the backend tacked on.
    pub async fn fetch_partition_rows(
        &self,
        table: &str,
        partition_key: &str,
    ) -> (Vec<String>, Vec<Vec<serde_json::Value>>) {
        let statement = partition_rows_statement(table, &self.partition_column, partition_key);
        debug!(table, partition_key, "fetching partition detail rows");
        match self.backend.execute_rows(&statement).await {
            Ok((columns, rows)) => {
                let columns = columns.iter().map(|c| normalize_column(c).to_string()).collect();
                (columns, rows)
            }
            Err(error) => {
                warn!(table, %error, "detail fetch failed, exporting nothing for this table");
                (Vec::new(), Vec::new())
            }
        }
    }

    /// Distinct values of the designated status field within one partition.
    ///
    /// The backend adapter decides whether a query error means the field is
    /// simply absent; any other fault keeps its text but is still non-fatal.
    pub async fn status_distribution(
        &self,
        table: &str,
        partition_key: &str,
        field: &str,
    ) -> StatusDistribution {
        let statement = distinct_statement(table, &self.partition_column, partition_key, field);
        debug!(table, partition_key, field, "checking status distribution");
        match self.backend.execute_rows(&statement).await {
            Ok((_columns, rows)) => {
                let distinct_values = rows
                    .iter()
                    .filter_map(|row| row.first().and_then(value_to_string))
                    .collect();
                StatusDistribution {
                    has_status_field: true,
                    distinct_values,
                    error: None,
                }
            }
            Err(error) if self.backend.is_missing_column(&error, field) => {
                debug!(table, field, "status field absent, skipping distribution check");
                StatusDistribution::absent()
            }
            Err(error) => {
                warn!(table, field, %error, "status distribution query failed");
                StatusDistribution {
                    has_status_field: false,
                    distinct_values: BTreeSet::new(),
                    error: Some(error.to_string()),
                }
            }
        }
    }
}

/// Single-value max-date statement, shared with the polling gate.
pub fn max_partition_statement(table: &str, column: &str, lower_bound: Option<&str>) -> String {
    let mut statement = format!(
        "SELECT max({}) FROM {}",
        quote_ident(column),
        quote_ident(table)
    );
    if let Some(bound) = lower_bound {
        statement.push_str(&format!(
            " WHERE {} > {}",
            quote_ident(column),
            quote_literal(bound)
        ));
    }
    statement
}

fn count_statement(table: &str, column: &str, key: &str) -> String {
    format!(
        "SELECT count(1) FROM {} WHERE {} = {}",
        quote_ident(table),
        quote_ident(column),
        quote_literal(key)
    )
}

fn partition_rows_statement(table: &str, column: &str, key: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = {}",
        quote_ident(table),
        quote_ident(column),
        quote_literal(key)
    )
}

fn distinct_statement(table: &str, column: &str, key: &str, field: &str) -> String {
    format!(
        "SELECT DISTINCT {} FROM {} WHERE {} = {}",
        quote_ident(field),
        quote_ident(table),
        quote_ident(column),
        quote_literal(key)
    )
}

/// Strip a `table.`-qualifier from a column name.
fn normalize_column(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}

fn scalar_to_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
