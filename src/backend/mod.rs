//! Query backend abstraction.
//!
//! The core only ever needs "run statement, get rows" and "run statement,
//! get scalar"; everything warehouse-specific (drivers, error vocabulary)
//! lives behind this trait. Statements are plain SQL text: identifier
//! quoting and literal escaping are the core's job, not the backend's.

pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{MonitorError, Result};

pub use postgres::PgBackend;

/// Rows returned by a query: column names plus row-major values.
pub type RowSet = (Vec<String>, Vec<Vec<Value>>);

#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a statement expected to yield at most one value.
    async fn execute_scalar(&self, statement: &str) -> Result<Option<Value>>;

    /// Execute a statement and return all rows with their column names.
    async fn execute_rows(&self, statement: &str) -> Result<RowSet>;

    /// Column names and type names of a table, in declaration order.
    async fn describe_schema(&self, table: &str) -> Result<Vec<(String, String)>>;

    /// Execute a DDL/DML statement, returning the affected row count.
    async fn execute_statement(&self, statement: &str) -> Result<u64>;

    /// Whether a query error means the named column simply does not exist.
    ///
    /// Backends report missing columns in their own vocabulary, so the
    /// text-matching heuristic lives here and nowhere else. The default
    /// covers the generic "column ... not found" shape plus the semantic
    /// analyzer marker some warehouses emit.
    fn is_missing_column(&self, error: &MonitorError, column: &str) -> bool {
        let MonitorError::Query(message) = error else {
            return false;
        };
        let message = message.to_lowercase();
        let column = column.to_lowercase();
        if !message.contains(&column) {
            return false;
        }
        (message.contains("column") && message.contains("not found"))
            || message.contains("semanticexception")
    }
}

/// Quote a possibly qualified identifier (`db.table` quotes each segment).
pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a string literal for embedding into SQL text.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a backend value as a plain string, if it carries one.
///
/// Warehouse columns come back with mixed encodings (ints, floats, text);
/// the health rules compare on string representations to tolerate that.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
