//! Per-run report assembly: Markdown summary plus CSV detail export.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::backend::value_to_string;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::health::TableVerdict;

/// Name of the injected first column of every export. Reserved: a detail
/// field with this name is renamed on ingestion (`source_1`, then `source_2`
/// and so on until free) so the originating-table column never shadows data.
pub const SOURCE_COLUMN: &str = "source";

/// One exported detail record: the originating table plus the row's fields
/// in the order the backend returned them. Export only, never consulted by
/// the health rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub source: String,
    pub fields: Vec<(String, Value)>,
}

impl DetailRow {
    pub fn from_row(source: &str, columns: &[String], row: Vec<Value>) -> Self {
        Self {
            source: source.to_string(),
            fields: columns
                .iter()
                .map(|column| export_field_name(column, columns))
                .zip(row)
                .collect(),
        }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.as_str() == name)
            .map(|(_, value)| value)
    }
}

/// The product of one monitoring run. Owned by that run; assembled once,
/// never mutated after dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: NaiveDate,
    pub verdicts: Vec<TableVerdict>,
    pub details: Vec<DetailRow>,
}

impl Report {
    pub fn aggregate(
        generated_at: NaiveDate,
        verdicts: Vec<TableVerdict>,
        details: Vec<DetailRow>,
    ) -> Self {
        Self {
            generated_at,
            verdicts,
            details,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn has_unhealthy(&self) -> bool {
        self.verdicts.iter().any(|v| !v.healthy())
    }

    /// Export schema: source table first, then the union of all field names
    /// across the detail rows in first-seen order. Deterministic for
    /// identical input.
    pub fn export_columns(&self) -> Vec<String> {
        let mut columns = vec![SOURCE_COLUMN.to_string()];
        for row in &self.details {
            for (field, _) in &row.fields {
                if !columns.iter().any(|c| c == field) {
                    columns.push(field.clone());
                }
            }
        }
        columns
    }

    /// WeCom-flavored Markdown summary: one compact line per healthy table,
    /// an expanded per-check breakdown for unhealthy ones.
    pub fn render_markdown(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut lines = vec![
            "### 📊 Data Quality Daily Report".to_string(),
            format!("> 📅 Run date: {}", self.generated_at.format("%Y-%m-%d")),
            String::new(),
            "**Table checks:**".to_string(),
        ];

        for verdict in &self.verdicts {
            let table = MonitorConfig::short_table_name(&verdict.table);
            let partition = verdict.partition_key.as_deref().unwrap_or("NULL");
            if verdict.healthy() {
                lines.push(format!(
                    "- {table}: <font color=\"info\">{partition} (rows: {})</font>",
                    verdict.row_count
                ));
            } else {
                lines.push(format!(
                    "- {table}: <font color=\"warning\">⚠️ {partition} (rows: {})</font>",
                    verdict.row_count
                ));
                for check in &verdict.checks {
                    let marker = if check.passed { "✅" } else { "❌" };
                    lines.push(format!("  - {marker} {}: {}", check.name, check.detail));
                }
            }
        }

        lines.join("\n")
    }

    /// Write the detail rows as a UTF-8 CSV with a byte-order marker, for
    /// spreadsheet compatibility. Returns whether anything was written
    /// (no details ⇒ no artifact).
    pub async fn write_csv(&self, path: &Path) -> Result<bool> {
        if self.details.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let columns = self.export_columns();
        let mut out = String::from("\u{feff}");
        out.push_str(&csv_record(columns.iter().map(String::as_str)));
        for row in &self.details {
            let record = columns.iter().map(|column| {
                if column.as_str() == SOURCE_COLUMN {
                    row.source.clone()
                } else {
                    row.field(column)
                        .and_then(value_to_string)
                        .unwrap_or_default()
                }
            });
            let record: Vec<String> = record.collect();
            out.push_str(&csv_record(record.iter().map(String::as_str)));
        }

        tokio::fs::write(path, out).await?;
        Ok(true)
    }
}

/// Keep a table's own `source` column out of the reserved slot by renaming
/// it to the first free `source_<n>`.
fn export_field_name(column: &str, columns: &[String]) -> String {
    if column != SOURCE_COLUMN {
        return column.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{SOURCE_COLUMN}_{n}");
        if !columns.iter().any(|c| c == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// RFC-4180-style record: fields holding delimiters or quotes get quoted,
/// embedded quotes doubled.
fn csv_record<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut record = fields.map(csv_field).collect::<Vec<_>>().join(",");
    record.push_str("\r\n");
    record
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn row(source: &str, fields: &[(&str, Value)]) -> DetailRow {
        DetailRow {
            source: source.to_string(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }

    #[test]
    fn export_columns_preserve_first_seen_order() {
        let report = Report::aggregate(
            date(),
            Vec::new(),
            vec![
                row("t1", &[("vin", json!("a")), ("area", json!("x"))]),
                row("t2", &[("area", json!("y")), ("hours", json!(24))]),
            ],
        );
        assert_eq!(report.export_columns(), vec!["source", "vin", "area", "hours"]);
        // deterministic on repetition
        assert_eq!(report.export_columns(), report.export_columns());
    }

    #[test]
    fn table_column_named_source_is_renamed_not_shadowed() {
        let columns = vec!["source".to_string(), "vin".to_string()];
        let detail = DetailRow::from_row("t1", &columns, vec![json!("upstream"), json!("LSV001")]);
        assert_eq!(detail.source, "t1");
        assert_eq!(detail.fields[0].0, "source_1");

        let report = Report::aggregate(date(), Vec::new(), vec![detail]);
        assert_eq!(report.export_columns(), vec!["source", "source_1", "vin"]);
    }

    #[tokio::test]
    async fn csv_keeps_both_source_table_and_source_field_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail_report_2025-06-10.csv");
        let columns = vec!["source".to_string()];
        let report = Report::aggregate(
            date(),
            Vec::new(),
            vec![DetailRow::from_row("t1", &columns, vec![json!("upstream")])],
        );

        assert!(report.write_csv(&path).await.unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next().unwrap(), "source,source_1");
        assert_eq!(lines.next().unwrap(), "t1,upstream");
    }

    #[test]
    fn renaming_skips_an_occupied_slot() {
        let columns = vec!["source".to_string(), "source_1".to_string()];
        assert_eq!(export_field_name("source", &columns), "source_2");
        assert_eq!(export_field_name("vin", &columns), "vin");
    }

    #[test]
    fn empty_report_renders_nothing() {
        let report = Report::aggregate(date(), Vec::new(), Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.render_markdown(), "");
    }

    #[test]
    fn csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn csv_export_starts_with_bom_and_source_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail_report_2025-06-10.csv");
        let report = Report::aggregate(
            date(),
            Vec::new(),
            vec![row("t1", &[("vin", json!("a,b")), ("count", json!(3))])],
        );

        assert!(report.write_csv(&path).await.unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('\u{feff}'));
        let mut lines = content.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next().unwrap(), "source,vin,count");
        assert_eq!(lines.next().unwrap(), "t1,\"a,b\",3");
    }

    #[tokio::test]
    async fn csv_export_skipped_without_details() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detail_report_2025-06-10.csv");
        let report = Report::aggregate(date(), Vec::new(), Vec::new());
        assert!(!report.write_csv(&path).await.unwrap());
        assert!(!path.exists());
    }
}
