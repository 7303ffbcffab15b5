//! sqlx-backed `QueryBackend` adapter.
//!
//! The pool is acquired lazily on first use and held for the run; callers
//! close it on the run's exit path. Queries are built at runtime, since the
//! monitored warehouse schema is not known at compile time and that rules
//! out the compile-time checked macros.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row};
use tokio::sync::OnceCell;

use crate::backend::{QueryBackend, RowSet};
use crate::error::{MonitorError, Result};

pub struct PgBackend {
    database_url: String,
    pool: OnceCell<PgPool>,
}

impl PgBackend {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                PgPool::connect(&self.database_url)
                    .await
                    .map_err(|e| MonitorError::Connection(e.to_string()))
            })
            .await
    }

    /// Close the pool if it was ever opened.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}

/// Decode one column position to a JSON value by trying the column types a
/// warehouse realistically serves. Anything undecodable degrades to null
/// rather than failing the whole row.
fn decode_column(row: &PgRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        return v
            .map(|d| Value::from(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        return v
            .map(|d| Value::from(d.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
        return v.map(|d| Value::from(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(index) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}

#[async_trait]
impl QueryBackend for PgBackend {
    async fn execute_scalar(&self, statement: &str) -> Result<Option<Value>> {
        let pool = self.pool().await?;
        let row = sqlx::query(statement)
            .fetch_optional(pool)
            .await
            .map_err(|e| MonitorError::Query(e.to_string()))?;
        Ok(row.and_then(|row| match decode_column(&row, 0) {
            Value::Null => None,
            value => Some(value),
        }))
    }

    async fn execute_rows(&self, statement: &str) -> Result<RowSet> {
        let pool = self.pool().await?;
        let rows = sqlx::query(statement)
            .fetch_all(pool)
            .await
            .map_err(|e| MonitorError::Query(e.to_string()))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let data = rows
            .iter()
            .map(|row| (0..row.columns().len()).map(|i| decode_column(row, i)).collect())
            .collect();
        Ok((columns, data))
    }

    async fn describe_schema(&self, table: &str) -> Result<Vec<(String, String)>> {
        let pool = self.pool().await?;
        let (schema, name) = match table.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, table),
        };

        let rows = if let Some(schema) = schema {
            sqlx::query(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
            )
            .bind(schema)
            .bind(name)
            .fetch_all(pool)
            .await
        } else {
            sqlx::query(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_name = $1 ORDER BY ordinal_position",
            )
            .bind(name)
            .fetch_all(pool)
            .await
        }
        .map_err(|e| MonitorError::Query(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| {
                let column: String = row.get(0);
                let type_name: String = row.get(1);
                (column, type_name)
            })
            .collect())
    }

    async fn execute_statement(&self, statement: &str) -> Result<u64> {
        let pool = self.pool().await?;
        let result = sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| MonitorError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }

    // Postgres reports missing columns as `column "x" does not exist`
    // (SQLSTATE 42703), not the generic "not found" vocabulary.
    fn is_missing_column(&self, error: &MonitorError, column: &str) -> bool {
        let MonitorError::Query(message) = error else {
            return false;
        };
        let lowered = message.to_lowercase();
        (lowered.contains(&column.to_lowercase()) && lowered.contains("does not exist"))
            || lowered.contains("42703")
    }
}
