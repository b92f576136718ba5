use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

use eyre::Report;
use serde::Serialize;
use time::OffsetDateTime;

/// Outcome of a single sync cycle.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Amount of records received from upstream.
    pub fetched: usize,
    /// Amount of records that were written successfully.
    pub stored: usize,
    pub failures: Vec<RecordFailure>,
    /// Amount of rows removed because they are no longer in the catalog.
    pub pruned: Option<u64>,
}

impl SyncReport {
    pub fn new(fetched: usize) -> Self {
        Self {
            fetched,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.stored == self.fetched
    }
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "stored {}/{} medals ({} failed)",
            self.stored,
            self.fetched,
            self.failures.len()
        )?;

        if let Some(pruned) = self.pruned {
            write!(f, ", pruned {pruned}")?;
        }

        Ok(())
    }
}

/// A record that could not be stored.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record within the upstream array.
    pub index: usize,
    pub medal_id: Option<i32>,
    pub error: Report,
}

/// What is remembered of the most recent sync cycle.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncSummary {
    Finished {
        #[serde(with = "time::serde::rfc3339")]
        started_at: OffsetDateTime,
        duration_ms: u64,
        fetched: usize,
        stored: usize,
        failed: usize,
        pruned: Option<u64>,
    },
    Failed {
        #[serde(with = "time::serde::rfc3339")]
        started_at: OffsetDateTime,
        duration_ms: u64,
        error: String,
    },
}

impl SyncSummary {
    pub fn finished(started_at: OffsetDateTime, elapsed: Duration, report: &SyncReport) -> Self {
        Self::Finished {
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            fetched: report.fetched,
            stored: report.stored,
            failed: report.failures.len(),
            pruned: report.pruned,
        }
    }

    pub fn failed(started_at: OffsetDateTime, elapsed: Duration, err: &Report) -> Self {
        Self::Failed {
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            error: format!("{err:#}"),
        }
    }
}
