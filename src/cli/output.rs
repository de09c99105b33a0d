use action_flow::{RunReport, StepStatus};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write;

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

pub fn render_structured<T: Serialize + ?Sized>(value: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("Failed to serialize output as YAML")
        }
        OutputFormat::Human => Err(anyhow::anyhow!("human output is not structured")),
    }
}

pub fn render_report(report: &RunReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human_report(report)),
        structured => render_structured(report, structured),
    }
}

fn mark(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Passed => "✅",
        StepStatus::Warned => "⚠️",
        StepStatus::Acknowledged => "ℹ️",
        StepStatus::Section => "§",
        StepStatus::Unknown => "❓",
        StepStatus::Failed => "❌",
        StepStatus::Skipped => "⏭",
    }
}

fn human_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Run: {} ({} steps, {} ms)",
        report.source,
        report.counts.total,
        report.duration_ms()
    );
    for step in &report.steps {
        let _ = writeln!(
            out,
            "{:>3}. {} {:<12} {}",
            step.number,
            mark(step.status),
            step.status.as_str(),
            step.line
        );
        if !step.message.is_empty() && step.status != StepStatus::Section {
            let _ = writeln!(out, "       {}", step.message);
        }
    }
    let counts = &report.counts;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "passed {}  warned {}  acknowledged {}  section {}  unknown {}  failed {}  skipped {}",
        counts.passed,
        counts.warned,
        counts.acknowledged,
        counts.section,
        counts.unknown,
        counts.failed,
        counts.skipped
    );
    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "Failed steps:");
        for step in failures {
            let _ = writeln!(out, "  {}: {} ({})", step.number, step.line, step.message);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::StepRecord;

    fn report() -> RunReport {
        let mut report = RunReport::new("steps.txt");
        report.push(StepRecord {
            number: 1,
            line: "open homepage".into(),
            command: Some("open homepage".into()),
            status: StepStatus::Passed,
            message: "opened https://shop.test/ (200)".into(),
            latency_ms: 12,
        });
        report.push(StepRecord {
            number: 2,
            line: "check status 201".into(),
            command: Some("check status".into()),
            status: StepStatus::Failed,
            message: "status_mismatch: expected status 201 but got 200".into(),
            latency_ms: 1,
        });
        report.finish()
    }

    #[test]
    fn human_report_lists_failures() {
        let text = render_report(&report(), &OutputFormat::Human).unwrap();
        assert!(text.contains("  1. ✅ passed"));
        assert!(text.contains("failed 1"));
        assert!(text.contains("Failed steps:\n  2: check status 201"));
    }

    #[test]
    fn json_report_round_trips_counts() {
        let text = render_report(&report(), &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["counts"]["failed"], 1);
        assert_eq!(value["steps"][1]["status"], "failed");
    }
}
