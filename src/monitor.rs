//! The monitoring pass: sweep old artifacts, check every configured table,
//! aggregate one report, and dispatch it.
//!
//! Per-table faults are isolated: a broken table degrades its own verdict
//! and never prevents the rest from being evaluated. Notification delivery
//! is best-effort: failures are logged and never retried, and the verdicts
//! already computed stand regardless.

use chrono::{Days, Local, NaiveDate};
use tracing::{error, info, warn};

use crate::backend::QueryBackend;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::health::{evaluate, TableVerdict};
use crate::inspector::PartitionInspector;
use crate::notify::NotificationSink;
use crate::report::{DetailRow, Report};
use crate::retention;

const CONNECTIVITY_PROBE: &str = "SELECT 1";

/// Run one monitoring pass dated today.
pub async fn run_monitor<B, S>(config: &MonitorConfig, backend: &B, sink: &S) -> Result<Report>
where
    B: QueryBackend,
    S: NotificationSink,
{
    run_monitor_at(config, backend, sink, Local::now().date_naive()).await
}

/// Run one monitoring pass as of a given date.
pub async fn run_monitor_at<B, S>(
    config: &MonitorConfig,
    backend: &B,
    sink: &S,
    as_of: NaiveDate,
) -> Result<Report>
where
    B: QueryBackend,
    S: NotificationSink,
{
    let swept = retention::sweep(&config.report_dir, config.retention_days, as_of);
    if swept > 0 {
        info!(swept, "expired report artifacts removed");
    }

    // A dead backend is fatal for the whole run; per-table query faults
    // later are not.
    backend
        .execute_scalar(CONNECTIVITY_PROBE)
        .await
        .map_err(|e| MonitorError::Connection(e.to_string()))?;

    let cutoff = as_of.checked_sub_days(Days::new(config.lookback_days));
    let inspector = PartitionInspector::new(backend, config.partition_column.clone());

    let mut verdicts = Vec::with_capacity(config.tables.len());
    let mut details = Vec::new();

    for table in &config.tables {
        info!(%table, "checking table");
        let snapshot = inspector.latest_partition(table, cutoff).await;

        // the distribution scan is the expensive query: only issue it once
        // the partition is known to be current and non-empty
        let base_healthy = evaluate(&snapshot, None, as_of, &config.abnormal_sentinels)
            .iter()
            .all(|c| c.passed);
        let distribution = match (&snapshot.partition_key, base_healthy) {
            (Some(key), true) => Some(
                inspector
                    .status_distribution(table, key, &config.status_field)
                    .await,
            ),
            _ => None,
        };

        let checks = evaluate(
            &snapshot,
            distribution.as_ref(),
            as_of,
            &config.abnormal_sentinels,
        );
        let verdict = TableVerdict::new(&snapshot, checks);
        info!(%table, healthy = verdict.healthy(), "table verdict");

        if let Some(key) = &snapshot.partition_key {
            if snapshot.row_count > 0 {
                let (columns, rows) = inspector.fetch_partition_rows(table, key).await;
                let source = MonitorConfig::short_table_name(table);
                details.extend(
                    rows.into_iter()
                        .map(|row| DetailRow::from_row(source, &columns, row)),
                );
            }
        }
        verdicts.push(verdict);
    }

    let report = Report::aggregate(as_of, verdicts, details);
    dispatch(config, sink, &report).await;
    Ok(report)
}

/// Send the summary and the detail export. Every delivery is independent
/// and best-effort.
async fn dispatch<S: NotificationSink>(config: &MonitorConfig, sink: &S, report: &Report) {
    let summary = report.render_markdown();
    if summary.is_empty() {
        info!("empty report, nothing to dispatch");
        return;
    }
    if let Err(e) = sink.send_markdown(&summary).await {
        error!(error = %e, "summary delivery failed");
    }

    let csv_path = retention::artifact_path(&config.report_dir, report.generated_at);
    match report.write_csv(&csv_path).await {
        Ok(false) => info!("no detail rows, skipping export"),
        Ok(true) => {
            info!(path = %csv_path.display(), rows = report.details.len(), "detail report written");
            match sink.upload_attachment(&csv_path).await {
                Ok(Some(attachment_id)) => {
                    if let Err(e) = sink.send_attachment(&attachment_id).await {
                        error!(error = %e, "attachment delivery failed");
                    }
                }
                Ok(None) => warn!("attachment upload rejected, skipping delivery"),
                Err(e) => error!(error = %e, "attachment upload failed"),
            }
        }
        Err(e) => error!(error = %e, "detail export failed"),
    }
}
