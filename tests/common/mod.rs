//! Shared test doubles: a canned warehouse backend and a recording sink.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use partition_watch::backend::{quote_ident, QueryBackend, RowSet};
use partition_watch::error::{MonitorError, Result};
use partition_watch::notify::NotificationSink;

/// How a mock table answers the status-distribution query.
pub enum StatusScript {
    /// Distinct values of the status column.
    Values(Vec<&'static str>),
    /// The column does not exist (error text in the generic vocabulary the
    /// default classifier understands).
    MissingColumn,
    /// An unrelated query fault.
    Fault(&'static str),
}

pub struct MockTable {
    pub name: String,
    pub max_ds: Option<String>,
    pub row_count: i64,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub status: StatusScript,
}

impl MockTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_ds: None,
            row_count: 0,
            columns: Vec::new(),
            rows: Vec::new(),
            status: StatusScript::MissingColumn,
        }
    }

    pub fn with_partition(mut self, max_ds: &str, row_count: i64) -> Self {
        self.max_ds = Some(max_ds.to_string());
        self.row_count = row_count;
        self
    }

    pub fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows;
        self
    }

    pub fn with_status(mut self, status: StatusScript) -> Self {
        self.status = status;
        self
    }
}

/// Canned warehouse: routes statements generated by the inspector to the
/// matching table's scripted answers.
pub struct MockBackend {
    pub tables: Vec<MockTable>,
    /// Every statement the core issued, for assertions on query shape.
    pub statements: Mutex<Vec<String>>,
    /// When set, every query fails with this connection-ish error.
    pub down: bool,
}

impl MockBackend {
    pub fn new(tables: Vec<MockTable>) -> Self {
        Self {
            tables,
            statements: Mutex::new(Vec::new()),
            down: false,
        }
    }

    pub fn down() -> Self {
        Self {
            tables: Vec::new(),
            statements: Mutex::new(Vec::new()),
            down: true,
        }
    }

    fn record(&self, statement: &str) {
        self.statements.lock().unwrap().push(statement.to_string());
    }

    fn table_for(&self, statement: &str) -> Option<&MockTable> {
        self.tables
            .iter()
            .find(|t| statement.contains(&quote_ident(&t.name)))
    }

    pub fn issued(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    async fn execute_scalar(&self, statement: &str) -> Result<Option<Value>> {
        self.record(statement);
        if self.down {
            return Err(MonitorError::Connection("backend unreachable".to_string()));
        }
        if statement == "SELECT 1" {
            return Ok(Some(Value::from(1)));
        }
        let table = self
            .table_for(statement)
            .ok_or_else(|| MonitorError::Query(format!("unknown table in: {statement}")))?;
        if statement.starts_with("SELECT max(") {
            return Ok(table.max_ds.clone().map(Value::from));
        }
        if statement.starts_with("SELECT count(1)") {
            return Ok(Some(Value::from(table.row_count)));
        }
        Err(MonitorError::Query(format!("unexpected scalar: {statement}")))
    }

    async fn execute_rows(&self, statement: &str) -> Result<RowSet> {
        self.record(statement);
        if self.down {
            return Err(MonitorError::Connection("backend unreachable".to_string()));
        }
        let table = self
            .table_for(statement)
            .ok_or_else(|| MonitorError::Query(format!("unknown table in: {statement}")))?;
        if statement.starts_with("SELECT DISTINCT") {
            return match &table.status {
                StatusScript::Values(values) => Ok((
                    vec!["status".to_string()],
                    values.iter().map(|v| vec![Value::from(*v)]).collect(),
                )),
                StatusScript::MissingColumn => Err(MonitorError::Query(
                    "column 'status' not found in table".to_string(),
                )),
                StatusScript::Fault(message) => {
                    Err(MonitorError::Query(message.to_string()))
                }
            };
        }
        Ok((table.columns.clone(), table.rows.clone()))
    }

    async fn describe_schema(&self, table: &str) -> Result<Vec<(String, String)>> {
        let table = self
            .tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| MonitorError::Query("unknown table".to_string()))?;
        Ok(table
            .columns
            .iter()
            .map(|c| (c.clone(), "text".to_string()))
            .collect())
    }

    async fn execute_statement(&self, statement: &str) -> Result<u64> {
        self.record(statement);
        Ok(0)
    }
}

/// Scripted scalar backend for gate tests: pops one response per attempt.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Option<Value>>>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<Option<Value>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn execute_scalar(&self, _statement: &str) -> Result<Option<Value>> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MonitorError::Query("script exhausted".to_string())))
    }

    async fn execute_rows(&self, _statement: &str) -> Result<RowSet> {
        Err(MonitorError::Query("not scripted".to_string()))
    }

    async fn describe_schema(&self, _table: &str) -> Result<Vec<(String, String)>> {
        Err(MonitorError::Query("not scripted".to_string()))
    }

    async fn execute_statement(&self, _statement: &str) -> Result<u64> {
        Err(MonitorError::Query("not scripted".to_string()))
    }
}

/// Recording notification sink.
#[derive(Default)]
pub struct MockSink {
    pub texts: Mutex<Vec<String>>,
    pub markdowns: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<PathBuf>>,
    pub attachments: Mutex<Vec<String>>,
    /// Simulate a delivery outage for the summary message.
    pub fail_markdown: bool,
}

impl MockSink {
    pub fn markdowns(&self) -> Vec<String> {
        self.markdowns.lock().unwrap().clone()
    }

    pub fn attachments(&self) -> Vec<String> {
        self.attachments.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for MockSink {
    async fn send_text(&self, content: &str) -> Result<()> {
        self.texts.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn send_markdown(&self, content: &str) -> Result<()> {
        if self.fail_markdown {
            return Err(MonitorError::Notification("webhook down".to_string()));
        }
        self.markdowns.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn upload_attachment(&self, path: &Path) -> Result<Option<String>> {
        self.uploads.lock().unwrap().push(path.to_path_buf());
        Ok(Some("media-1".to_string()))
    }

    async fn send_attachment(&self, attachment_id: &str) -> Result<()> {
        self.attachments
            .lock()
            .unwrap()
            .push(attachment_id.to_string());
        Ok(())
    }
}
