//! Coverage auditor
//!
//! Cross-checks normalized lines against a [`CommandTable`] without executing anything.

use crate::table::CommandTable;
use serde::Serialize;
use std::fmt::Write;
use step_script::CanonicalLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub number: usize,
    pub text: String,
    pub known: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub entries: Vec<AuditEntry>,
}

impl CoverageReport {
    pub fn build(lines: &[CanonicalLine], table: &CommandTable) -> Self {
        let entries = lines
            .iter()
            .map(|line| AuditEntry {
                number: line.number,
                text: line.text.clone(),
                known: table.is_known(&line.text),
            })
            .collect();
        Self { entries }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn known(&self) -> usize {
        self.entries.iter().filter(|e| e.known).count()
    }

    pub fn unknown(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(|e| !e.known)
    }

    /// Zero when there are no lines.
    pub fn coverage_percent(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.known() as f64 * 100.0 / self.total() as f64
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== NORMALIZED STEPS LIST ===");
        for entry in &self.entries {
            let mark = if entry.known { "✅" } else { "❌" };
            let _ = writeln!(out, "{:>3}. {} {}", entry.number, mark, entry.text);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "=== SUMMARY ===");
        let _ = writeln!(out, "Total steps: {}", self.total());
        let _ = writeln!(out, "Known (✅): {}", self.known());
        let _ = writeln!(out, "Unknown (❌): {}", self.total() - self.known());
        let _ = writeln!(out, "Coverage: {:.1}%", self.coverage_percent());

        let unknown: Vec<_> = self.unknown().collect();
        if !unknown.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "=== UNKNOWN STEPS TO IMPLEMENT ===");
            for entry in unknown {
                let _ = writeln!(out, "Line {}: \"{}\"", entry.number, entry.text);
            }
        }
        out
    }
}
