//! Command dispatcher
//!
//! Feeds canonical lines through the [`CommandTable`] one at a time. Every line yields a
//! [`StepRecord`]; hard failures are recorded and the run moves on to the next line.

use crate::context::ExecutionContext;
use crate::table::{CommandAction, CommandTable};
use crate::types::{RunReport, StepOutcome, StepRecord, StepStatus};
use std::time::{Duration, Instant};
use step_script::CanonicalLine;
use tokio::time::timeout_at;
use tracing::{debug, error, info, warn};

pub struct Dispatcher {
    table: CommandTable,
    context: ExecutionContext,
}

impl Dispatcher {
    pub fn new(table: CommandTable, context: ExecutionContext) -> Self {
        Self { table, context }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Runs the first matching command for `line`.
    pub async fn dispatch(&mut self, line: &CanonicalLine) -> StepRecord {
        info!(step = line.number, line = %line.text, "step");
        let started = Instant::now();

        let (command, outcome) = match self.table.find(&line.text) {
            None => (
                None,
                StepOutcome::with_status(StepStatus::Unknown, "no command matches this line"),
            ),
            Some((matcher, args)) => {
                debug!(command = matcher.name(), "matched");
                let name = matcher.name();
                let outcome = match matcher.action() {
                    CommandAction::Section => StepOutcome::section(line.text.clone()),
                    CommandAction::Note { category } => {
                        StepOutcome::acknowledged(format!("{} check noted, not automated", category))
                    }
                    CommandAction::Handler(handler) => match handler(&mut self.context, args).await {
                        Ok(outcome) => outcome,
                        Err(err) => StepOutcome::with_status(
                            StepStatus::Failed,
                            format!("{}: {}", err.kind(), err),
                        ),
                    },
                };
                (Some(name.to_string()), outcome)
            }
        };

        let record = StepRecord {
            number: line.number,
            line: line.text.clone(),
            command,
            status: outcome.status,
            message: outcome.message,
            latency_ms: started.elapsed().as_millis() as u64,
        };
        log_record(&record);
        record
    }

    /// Dispatches every line in order under the configured run deadline.
    ///
    /// When the deadline elapses the in-flight step is recorded as failed and every line
    /// after it as skipped.
    pub async fn execute_all(&mut self, source: &str, lines: &[CanonicalLine]) -> RunReport {
        let budget = Duration::from_millis(self.context.settings().timeouts.run_ms);
        let deadline = tokio::time::Instant::now() + budget;
        let mut report = RunReport::new(source);
        let mut expired = false;

        for line in lines {
            if expired {
                report.push(StepRecord {
                    number: line.number,
                    line: line.text.clone(),
                    command: None,
                    status: StepStatus::Skipped,
                    message: "run deadline elapsed".into(),
                    latency_ms: 0,
                });
                continue;
            }
            match timeout_at(deadline, self.dispatch(line)).await {
                Ok(record) => report.push(record),
                Err(_) => {
                    expired = true;
                    let record = StepRecord {
                        number: line.number,
                        line: line.text.clone(),
                        command: self.table.find(&line.text).map(|(m, _)| m.name().to_string()),
                        status: StepStatus::Failed,
                        message: format!("timeout: run exceeded {} ms", budget.as_millis()),
                        latency_ms: 0,
                    };
                    log_record(&record);
                    report.push(record);
                }
            }
        }

        let report = report.finish();
        info!(
            total = report.counts.total,
            passed = report.counts.passed,
            warned = report.counts.warned,
            unknown = report.counts.unknown,
            failed = report.counts.failed,
            skipped = report.counts.skipped,
            "run finished"
        );
        report
    }
}

fn log_record(record: &StepRecord) {
    let step = record.number;
    match record.status {
        StepStatus::Passed | StepStatus::Acknowledged | StepStatus::Section => {
            info!(step, status = %record.status, latency_ms = record.latency_ms, "{}", record.message)
        }
        StepStatus::Warned | StepStatus::Unknown | StepStatus::Skipped => {
            warn!(step, status = %record.status, "{}", record.message)
        }
        StepStatus::Failed => error!(step, status = %record.status, "{}", record.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RunSettings;
    use cdp_adapter::InMemorySession;
    use std::sync::Arc;

    fn line(number: usize, text: &str) -> CanonicalLine {
        CanonicalLine {
            number,
            text: text.to_string(),
            source_line: number,
        }
    }

    fn dispatcher() -> Dispatcher {
        let settings = RunSettings::default().with_pacing_scale(0.0);
        let context = ExecutionContext::new(Arc::new(InMemorySession::new()), settings);
        Dispatcher::new(CommandTable::standard(), context)
    }

    #[tokio::test]
    async fn unknown_lines_are_recorded() {
        let mut dispatcher = dispatcher();
        let record = dispatcher.dispatch(&line(1, "dance the tango")).await;
        assert_eq!(record.status, StepStatus::Unknown);
        assert!(record.command.is_none());
    }

    #[tokio::test]
    async fn notes_and_sections_do_not_touch_the_browser() {
        let mut dispatcher = dispatcher();
        let note = dispatcher.dispatch(&line(1, "lighthouse score")).await;
        assert_eq!(note.status, StepStatus::Acknowledged);
        let section = dispatcher.dispatch(&line(2, "phase 2: marketplace")).await;
        assert_eq!(section.status, StepStatus::Section);
    }

    #[tokio::test]
    async fn handler_errors_become_failed_records() {
        let mut dispatcher = dispatcher();
        // no base url configured
        let record = dispatcher.dispatch(&line(1, "open homepage")).await;
        assert_eq!(record.status, StepStatus::Failed);
        assert!(record.message.starts_with("missing_configuration"));
        assert_eq!(record.command.as_deref(), Some("open homepage"));
    }
}
