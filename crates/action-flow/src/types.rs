//! Step outcomes and run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of one dispatched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    /// Soft failure: logged, run continues.
    Warned,
    /// Recognized but outside browser scope; nothing executed.
    Acknowledged,
    Section,
    /// Matched no command.
    Unknown,
    /// Hard failure.
    Failed,
    /// Never started because the run deadline elapsed.
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Warned => "warned",
            StepStatus::Acknowledged => "acknowledged",
            StepStatus::Section => "section",
            StepStatus::Unknown => "unknown",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler reports when it did not fail hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub message: String,
}

impl StepOutcome {
    pub fn passed(message: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Passed, message)
    }

    pub fn warned(message: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Warned, message)
    }

    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Acknowledged, message)
    }

    pub fn section(message: impl Into<String>) -> Self {
        Self::with_status(StepStatus::Section, message)
    }

    pub fn with_status(status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the normalized step sequence.
    pub number: usize,
    pub line: String,
    /// Name of the command that matched, if any.
    pub command: Option<String>,
    pub status: StepStatus,
    pub message: String,
    pub latency_ms: u64,
}

/// Per-status totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub acknowledged: usize,
    pub section: usize,
    pub unknown: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a StepRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.total += 1;
            match record.status {
                StepStatus::Passed => counts.passed += 1,
                StepStatus::Warned => counts.warned += 1,
                StepStatus::Acknowledged => counts.acknowledged += 1,
                StepStatus::Section => counts.section += 1,
                StepStatus::Unknown => counts.unknown += 1,
                StepStatus::Failed => counts.failed += 1,
                StepStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
    pub counts: StatusCounts,
}

impl RunReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            counts: StatusCounts::default(),
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn finish(mut self) -> Self {
        self.counts = StatusCounts::tally(&self.steps);
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    /// A run succeeds when no step failed hard. Unknown and skipped lines do not count.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: usize, status: StepStatus) -> StepRecord {
        StepRecord {
            number,
            line: format!("line {}", number),
            command: None,
            status,
            message: String::new(),
            latency_ms: 0,
        }
    }

    #[test]
    fn counts_and_success() {
        let mut report = RunReport::new("steps.txt");
        report.push(record(1, StepStatus::Passed));
        report.push(record(2, StepStatus::Unknown));
        report.push(record(3, StepStatus::Warned));
        let report = report.finish();
        assert!(report.is_success());
        assert_eq!(report.counts.total, 3);
        assert_eq!(report.counts.unknown, 1);
        assert!(report.finished_at.is_some());

        let mut failing = RunReport::new("steps.txt");
        failing.push(record(1, StepStatus::Failed));
        let failing = failing.finish();
        assert!(!failing.is_success());
        assert_eq!(failing.failures().count(), 1);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&StepStatus::Acknowledged).unwrap();
        assert_eq!(json, "\"acknowledged\"");
    }
}
