//! Report-artifact retention: naming and the pre-run sweep.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::{info, warn};

pub const ARTIFACT_PREFIX: &str = "detail_report_";
pub const ARTIFACT_SUFFIX: &str = ".csv";

/// File name for the detail export of one run date.
pub fn artifact_name(date: NaiveDate) -> String {
    format!("{ARTIFACT_PREFIX}{}{ARTIFACT_SUFFIX}", date.format("%Y-%m-%d"))
}

pub fn artifact_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(artifact_name(date))
}

/// Parse the embedded date out of an artifact file name. Anything not
/// matching the fixed pattern yields `None` and is left alone by the sweep.
pub fn artifact_date(file_name: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Delete artifacts strictly older than `as_of - retention_days`.
///
/// A file dated exactly at the threshold survives. A missing directory is a
/// no-op. Returns the number of files deleted.
pub fn sweep(dir: &Path, retention_days: u64, as_of: NaiveDate) -> usize {
    let Some(cutoff) = as_of.checked_sub_days(Days::new(retention_days)) else {
        return 0;
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(artifact_date) else {
            continue;
        };
        if date < cutoff {
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    info!(artifact = %entry.path().display(), %date, "swept expired report artifact");
                    deleted += 1;
                }
                Err(error) => {
                    warn!(artifact = %entry.path().display(), %error, "failed to sweep artifact");
                }
            }
        }
    }
    deleted
}
