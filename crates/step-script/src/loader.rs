//! Step loading and run scoping

use crate::{errors::ScriptError, normalizer::PhraseNormalizer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files tried, in order, when no step file is named.
pub const DEFAULT_STEP_FILES: &[&str] = &["steps.txt", "deep_website_testing_steps.txt"];

const BOM: char = '\u{feff}';

/// Raw step text, read once.
#[derive(Clone, Debug)]
pub struct StepSource {
    origin: String,
    text: String,
}

impl StepSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(path.display().to_string(), text))
    }

    /// A leading byte-order mark is dropped.
    pub fn from_text(origin: impl Into<String>, text: impl Into<String>) -> Self {
        let mut text: String = text.into();
        if text.starts_with(BOM) {
            text.drain(..BOM.len_utf8());
        }
        Self {
            origin: origin.into(),
            text,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Trimmed lines with blanks and `#` comments removed, paired with their 1-based
    /// position in the file.
    pub fn instructions(&self) -> impl Iterator<Item = (usize, &str)> {
        self.text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
    }
}

/// First existing entry of [`DEFAULT_STEP_FILES`] under `dir`.
pub fn discover_steps_file(dir: &Path) -> Result<PathBuf, ScriptError> {
    DEFAULT_STEP_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ScriptError::NotFound(DEFAULT_STEP_FILES.join(", ")))
}

/// Optional 1-based inclusive range and keyword filter, applied after normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub keyword: Option<String>,
}

impl RunOptions {
    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start_line: Some(start),
            end_line: Some(end),
            keyword: None,
        }
    }

    pub fn matching(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    pub fn is_scoped(&self) -> bool {
        self.start_line.is_some() || self.end_line.is_some() || self.keyword.is_some()
    }
}

/// A dispatch-ready command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLine {
    /// 1-based position in the normalized sequence; what ranges refer to.
    pub number: usize,
    pub text: String,
    /// Line in the step file it came from.
    pub source_line: usize,
}

/// Normalizes every instruction, then applies the range and keyword filter in that order.
pub fn load(
    source: &StepSource,
    normalizer: &PhraseNormalizer,
    options: &RunOptions,
) -> Vec<CanonicalLine> {
    let normalized: Vec<CanonicalLine> = source
        .instructions()
        .map(|(source_line, raw)| (source_line, normalizer.normalize(raw)))
        .filter(|(_, text)| !text.is_empty())
        .enumerate()
        .map(|(idx, (source_line, text))| CanonicalLine {
            number: idx + 1,
            text,
            source_line,
        })
        .collect();
    let total = normalized.len();

    let mut lines = normalized;
    if options.start_line.is_some() || options.end_line.is_some() {
        let start = options.start_line.unwrap_or(1).max(1);
        let end = options.end_line.unwrap_or(total).min(total);
        lines = if start > end {
            Vec::new()
        } else {
            lines.drain(start - 1..end).collect()
        };
    }
    if let Some(keyword) = options.keyword.as_deref().filter(|k| !k.is_empty()) {
        let keyword = keyword.to_lowercase();
        lines.retain(|line| line.text.to_lowercase().contains(&keyword));
    }

    if options.is_scoped() {
        info!(
            origin = source.origin(),
            total,
            selected = lines.len(),
            from = ?options.start_line,
            to = ?options.end_line,
            keyword = ?options.keyword,
            "scoped step run"
        );
    } else {
        debug!(origin = source.origin(), total, "loaded steps");
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> StepSource {
        let text: String = (1..=count).map(|i| format!("wait {}\n", i)).collect();
        StepSource::from_text("numbered", text)
    }

    fn texts(lines: &[CanonicalLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let source = StepSource::from_text("bom", "\u{feff}# comment\n1. load homepage\n");
        let lines = load(&source, &PhraseNormalizer::standard(), &RunOptions::default());
        assert_eq!(texts(&lines), vec!["open homepage"]);
        assert_eq!(lines[0].source_line, 2);

        let source = StepSource::from_text("bom", "\u{feff}1. load homepage\ncheck status 200\n");
        let lines = load(&source, &PhraseNormalizer::standard(), &RunOptions::default());
        assert_eq!(texts(&lines), vec!["open homepage", "check status 200"]);
    }

    #[test]
    fn range_is_one_based_inclusive() {
        let lines = load(&numbered(20), &PhraseNormalizer::standard(), &RunOptions::range(5, 8));
        assert_eq!(texts(&lines), vec!["wait 5", "wait 6", "wait 7", "wait 8"]);
        assert_eq!(lines[0].number, 5);
    }

    #[test]
    fn range_is_clamped() {
        let normalizer = PhraseNormalizer::standard();
        let opts = RunOptions {
            start_line: Some(0),
            end_line: Some(99),
            keyword: None,
        };
        assert_eq!(load(&numbered(3), &normalizer, &opts).len(), 3);

        let open_ended = RunOptions {
            start_line: Some(3),
            ..RunOptions::default()
        };
        assert_eq!(texts(&load(&numbered(4), &normalizer, &open_ended)), vec!["wait 3", "wait 4"]);

        assert!(load(&numbered(4), &normalizer, &RunOptions::range(4, 2)).is_empty());
        assert!(load(&numbered(4), &normalizer, &RunOptions::range(7, 9)).is_empty());
    }

    #[test]
    fn keyword_filter_runs_after_range() {
        let source = StepSource::from_text(
            "mixed",
            "add to cart\nsearch for \"lamp\"\nGo to Cart page\nremove from CART\nlogin\n",
        );
        let normalizer = PhraseNormalizer::standard();
        let lines = load(&source, &normalizer, &RunOptions::matching("cart"));
        assert_eq!(
            texts(&lines),
            vec!["add to cart", "Go to Cart page", "remove from CART"]
        );

        let scoped = RunOptions {
            start_line: Some(2),
            end_line: Some(3),
            keyword: Some("Cart".into()),
        };
        assert_eq!(texts(&load(&source, &normalizer, &scoped)), vec!["Go to Cart page"]);
    }

    #[test]
    fn blanks_comments_and_markers_are_dropped() {
        let source = StepSource::from_text(
            "steps",
            "# comment\n\n1. load homepage\r\ncheck status 200\n  -  \nenter otp 654321\n",
        );
        let lines = load(&source, &PhraseNormalizer::standard(), &RunOptions::default());
        assert_eq!(
            texts(&lines),
            vec!["open homepage", "check status 200", "enter otp 654321"]
        );
        assert_eq!(lines[0].source_line, 3);
        assert_eq!(lines[2].number, 3);
    }
}
