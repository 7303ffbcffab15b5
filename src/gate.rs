//! Pre-job gating: poll one table until a target partition appears.
//!
//! The decision logic is a small explicit state machine so the transition
//! rules can be tested (and rehosted on any scheduler) without timing. The
//! async driver adds the fixed-interval waits on top.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{value_to_string, QueryBackend};
use crate::inspector::max_partition_statement;

/// Gate states. `Matched` and `Exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Polling,
    Matched,
    Exhausted,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::Exhausted)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polling => write!(f, "polling"),
            Self::Matched => write!(f, "matched"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// One observation of the table's max date-like value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollAttempt {
    pub attempt: u32,
    pub observed: Option<String>,
    pub matched: bool,
}

/// Final result of a gate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub state: PollState,
    pub attempts: Vec<PollAttempt>,
}

impl GateOutcome {
    pub fn matched(&self) -> bool {
        self.state == PollState::Matched
    }

    pub fn last_observation(&self) -> Option<&str> {
        self.attempts.last().and_then(|a| a.observed.as_deref())
    }
}

pub struct PollingGate {
    table: String,
    target_value: String,
    max_attempts: u32,
    interval: Duration,
    partition_column: String,
}

impl PollingGate {
    pub fn new(
        table: impl Into<String>,
        target_value: impl Into<String>,
        max_attempts: u32,
        interval: Duration,
        partition_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            target_value: target_value.into(),
            // the contract requires at least one attempt
            max_attempts: max_attempts.max(1),
            interval,
            partition_column: partition_column.into(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Truncate a raw backend value at the first whitespace, so timestamp
    /// columns (`2025-12-11 10:00:00`) compare against a plain date.
    pub fn normalize_observation(raw: &str) -> &str {
        raw.trim().split_whitespace().next().unwrap_or("")
    }

    /// Pure transition: fold one observation into the machine.
    pub fn observe(&self, attempt: u32, raw: Option<&str>) -> (PollAttempt, PollState) {
        let observed = raw.map(|v| Self::normalize_observation(v).to_string());
        let matched = observed.as_deref() == Some(self.target_value.as_str());
        let state = if matched {
            PollState::Matched
        } else if attempt >= self.max_attempts {
            PollState::Exhausted
        } else {
            PollState::Polling
        };
        (
            PollAttempt {
                attempt,
                observed,
                matched,
            },
            state,
        )
    }

    /// Drive the machine against a live backend.
    ///
    /// A backend error counts as a non-match for that attempt. The
    /// inter-attempt wait never runs after the final attempt.
    pub async fn run<B: QueryBackend>(&self, backend: &B) -> GateOutcome {
        let statement = max_partition_statement(&self.table, &self.partition_column, None);
        let mut attempts = Vec::with_capacity(self.max_attempts as usize);

        for attempt in 1..=self.max_attempts {
            info!(
                table = %self.table,
                attempt,
                max_attempts = self.max_attempts,
                "gating check attempt"
            );

            let raw = match backend.execute_scalar(&statement).await {
                Ok(value) => value.as_ref().and_then(value_to_string),
                Err(error) => {
                    warn!(table = %self.table, attempt, %error, "gate query failed, counting as non-match");
                    None
                }
            };

            let (record, state) = self.observe(attempt, raw.as_deref());
            info!(
                table = %self.table,
                attempt,
                observed = record.observed.as_deref().unwrap_or("none"),
                %state,
                "gating check observation"
            );
            attempts.push(record);

            if state.is_terminal() {
                return GateOutcome { state, attempts };
            }
            tokio::time::sleep(self.interval).await;
        }

        // unreachable in practice: the final attempt is always terminal
        GateOutcome {
            state: PollState::Exhausted,
            attempts,
        }
    }
}
