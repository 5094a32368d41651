//! Per-task outcomes and their aggregation

use std::time::Duration;

use crate::error::TransferError;

/// Result of one transfer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Local path or object key the task worked on
    pub subject: String,
    /// Wall-clock time spent on the task
    pub elapsed: Duration,
    /// Bytes moved, when known
    pub bytes: u64,
    /// Failure, if any
    pub error: Option<TransferError>,
}

impl TransferOutcome {
    pub fn success(subject: impl Into<String>, elapsed: Duration, bytes: u64) -> Self {
        Self {
            subject: subject.into(),
            elapsed,
            bytes,
            error: None,
        }
    }

    pub fn failure(subject: impl Into<String>, elapsed: Duration, error: TransferError) -> Self {
        Self {
            subject: subject.into(),
            elapsed,
            bytes: 0,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated outcome of a batch run
///
/// The run is successful only while no failed outcome has been recorded;
/// outcomes are only ever added, so a failed run stays failed.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    outcomes: Vec<TransferOutcome>,
    failed: usize,
    /// Wall-clock time for the whole run
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the report
    pub fn record(&mut self, outcome: TransferOutcome) {
        if !outcome.succeeded() {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }

    /// True when every recorded task succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Total bytes moved by successful tasks
    pub fn bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }

    pub fn outcomes(&self) -> &[TransferOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

impl FromIterator<TransferOutcome> for RunReport {
    fn from_iter<I: IntoIterator<Item = TransferOutcome>>(iter: I) -> Self {
        let mut report = Self::new();
        for outcome in iter {
            report.record(outcome);
        }
        report
    }
}
