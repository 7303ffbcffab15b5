//! # Partition Watch
//!
//! Data-quality monitoring for a batch warehouse: inspect the latest
//! date-partition of a configured set of tables, evaluate freshness /
//! volume / status health rules, and push a Markdown report plus a CSV
//! detail export to a notification channel. A companion gating check polls
//! a single table until a target partition appears, so a dependent job can
//! wait for its upstream.
//!
//! ## Module organization
//!
//! - [`backend`] - query backend trait and the sqlx Postgres adapter
//! - [`inspector`] - latest-partition discovery and status distributions
//! - [`health`] - the freshness / volume / status rules
//! - [`report`] - per-run report aggregation and rendering
//! - [`gate`] - bounded-retry polling state machine for pre-job gating
//! - [`retention`] - report-artifact naming and expiry sweep
//! - [`notify`] - notification sink trait and the WeCom webhook sink
//! - [`ops`] - partitioned table copy operator
//! - [`monitor`] - the monitoring-run orchestration
//!
//! Each invocation is a fresh, stateless run: there is no persistence and
//! no crash recovery mid-poll.

pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod health;
pub mod inspector;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod ops;
pub mod report;
pub mod retention;

pub use backend::{PgBackend, QueryBackend};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use gate::{GateOutcome, PollAttempt, PollState, PollingGate};
pub use health::{CheckResult, TableVerdict};
pub use inspector::{PartitionInspector, PartitionSnapshot, StatusDistribution};
pub use monitor::{run_monitor, run_monitor_at};
pub use notify::{NotificationSink, WeComSink};
pub use report::{DetailRow, Report};
