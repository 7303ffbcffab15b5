//! Freshness / volume / status health rules.
//!
//! Pure evaluation over inspector output: no queries are issued here. The
//! caller collects the status distribution only after freshness and volume
//! both pass, because the distribution query is the expensive one.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::inspector::{PartitionSnapshot, StatusDistribution};

pub const FRESHNESS_CHECK: &str = "freshness";
pub const VOLUME_CHECK: &str = "volume";
pub const STATUS_CHECK: &str = "status";

/// Outcome of one rule for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Aggregate verdict for one table in one monitoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableVerdict {
    pub table: String,
    pub partition_key: Option<String>,
    pub row_count: i64,
    pub checks: Vec<CheckResult>,
}

impl TableVerdict {
    pub fn new(snapshot: &PartitionSnapshot, checks: Vec<CheckResult>) -> Self {
        Self {
            table: snapshot.table.clone(),
            partition_key: snapshot.partition_key.clone(),
            row_count: snapshot.row_count,
            checks,
        }
    }

    /// Always the AND of the individual checks, never stored separately.
    pub fn healthy(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }
}

/// Apply the freshness and volume rules.
///
/// A snapshot with no partition key short-circuits: both cheap checks fail
/// and the caller must not attempt the status-distribution query (querying
/// a nonexistent partition is undefined against the backend).
pub fn evaluate_base(snapshot: &PartitionSnapshot, as_of: NaiveDate) -> Vec<CheckResult> {
    let Some(partition_key) = snapshot.partition_key.as_deref() else {
        return vec![
            CheckResult::fail(FRESHNESS_CHECK, "no partition found within the cutoff"),
            CheckResult::fail(VOLUME_CHECK, "no partition found within the cutoff"),
        ];
    };

    let today = as_of.format("%Y-%m-%d").to_string();
    let yesterday = as_of
        .checked_sub_days(Days::new(1))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    // Batch jobs land same-day or with one day of lag; older is stale.
    let freshness = if partition_key == today || partition_key == yesterday {
        CheckResult::pass(FRESHNESS_CHECK, format!("latest partition {partition_key}"))
    } else {
        CheckResult::fail(
            FRESHNESS_CHECK,
            format!("latest partition {partition_key} is older than {yesterday}"),
        )
    };

    let volume = if snapshot.row_count > 0 {
        CheckResult::pass(VOLUME_CHECK, format!("{} rows", snapshot.row_count))
    } else {
        CheckResult::fail(VOLUME_CHECK, "partition holds 0 rows")
    };

    vec![freshness, volume]
}

/// Apply the status-distribution rule.
///
/// Abnormal iff the field exists and every row carries the same sentinel
/// value from the configured set; two or more distinct values, an empty
/// distribution, or an absent field are all normal.
pub fn evaluate_status(distribution: &StatusDistribution, sentinels: &[String]) -> CheckResult {
    if !distribution.has_status_field {
        return match &distribution.error {
            Some(error) => CheckResult::pass(
                STATUS_CHECK,
                format!("status distribution unavailable ({error})"),
            ),
            None => CheckResult::pass(STATUS_CHECK, "no status field, check skipped"),
        };
    }

    if distribution.distinct_values.len() == 1 {
        if let Some(only) = distribution.distinct_values.iter().next() {
            if sentinels.iter().any(|s| s == only) {
                return CheckResult::fail(
                    STATUS_CHECK,
                    format!("all rows report status {only}"),
                );
            }
        }
    }

    CheckResult::pass(
        STATUS_CHECK,
        format!(
            "status distribution normal ({})",
            distribution
                .distinct_values
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ),
    )
}

/// Full rule evaluation for one table.
///
/// `distribution` is `None` when the caller skipped the expensive query,
/// either because a cheap check already failed or because there was no
/// partition to scan.
pub fn evaluate(
    snapshot: &PartitionSnapshot,
    distribution: Option<&StatusDistribution>,
    as_of: NaiveDate,
    sentinels: &[String],
) -> Vec<CheckResult> {
    let mut checks = evaluate_base(snapshot, as_of);
    if checks.iter().all(|c| c.passed) {
        if let Some(distribution) = distribution {
            checks.push(evaluate_status(distribution, sentinels));
        }
    }
    checks
}
