//! Phrase normalization
//!
//! Natural phrasings ("Verify HTTP status is 404") are rewritten to canonical commands
//! ("check status 404") by an ordered rule table. The first matching rule wins and
//! lines that match nothing pass through unchanged.

use crate::errors::ScriptError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

static LIST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s*").unwrap());
static LIST_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-\s*").unwrap());
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").unwrap());

/// Natural phrase to canonical command, in precedence order.
const STANDARD_RULES: &[(&str, &str)] = &[
    (r"^load homepage$", "open homepage"),
    (r"^take full-?page screenshot$", "screenshot \"full_page\""),
    (r"^go to login page$", "open /login"),
    (r"^open product detail$", "open /garage-sale/marketplace"),
    (r"^verify http status is (\d{3})$", "check status $1"),
    (r"^check page load time$", "check loadtime"),
    (r"^confirm no javascript console errors$", "check console"),
    (r"^check missing css/?js resources$", "check missing-resources"),
    (r"^click each menu item$", "click each menu item"),
    (r"^check broken images$", "check broken-images"),
    (r"^check broken links$", "check broken-links"),
    (r"^verify favicon and metadata load$", "check favicon-meta"),
    (r"^wait (\d+) ?ms$", "wait $1"),
    (r#"^take screenshot "(.+)"$"#, "screenshot \"$1\""),
    (r#"^verify page contains "(.+)"$"#, "expect page to contain \"$1\""),
    (r#"^verify url contains "(.+)"$"#, "expect url contains \"$1\""),
    (r#"^search "(.+)"$"#, "search for \"$1\""),
    (r"^go to cart$", "go to cart page"),
];

static STANDARD: Lazy<Vec<NormalizationRule>> = Lazy::new(|| {
    STANDARD_RULES
        .iter()
        .map(|&(pattern, template)| {
            NormalizationRule::new(pattern, template).expect("standard normalization rule")
        })
        .collect()
});

/// Removes a leading `12.` / `12)` number, then a leading `-` bullet.
///
/// The number needs its punctuation, so "400 errors" keeps its digits.
pub fn strip_list_marker(line: &str) -> &str {
    let rest = match LIST_NUMBER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let rest = match LIST_BULLET.find(rest) {
        Some(m) => &rest[m.end()..],
        None => rest,
    };
    rest.trim()
}

/// A case-insensitive pattern and the template it rewrites to.
#[derive(Clone, Debug)]
pub struct NormalizationRule {
    pattern: Regex,
    template: String,
}

impl NormalizationRule {
    pub fn new(pattern: &str, template: impl Into<String>) -> Result<Self, ScriptError> {
        let pattern = Regex::new(&format!("(?i){}", pattern)).map_err(|source| {
            ScriptError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            pattern,
            template: template.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expands `$n` in the template with the n-th capture; a missing group expands to "".
    pub fn apply(&self, line: &str) -> Option<String> {
        let caps = self.pattern.captures(line)?;
        Some(expand(&self.template, &caps))
    }
}

fn expand(template: &str, caps: &Captures<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |placeholder: &Captures<'_>| {
            placeholder[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| caps.get(idx))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Ordered rule table; first match wins.
#[derive(Clone, Debug)]
pub struct PhraseNormalizer {
    rules: Vec<NormalizationRule>,
}

impl Default for PhraseNormalizer {
    fn default() -> Self {
        Self::standard()
    }
}

impl PhraseNormalizer {
    pub fn standard() -> Self {
        Self {
            rules: STANDARD.clone(),
        }
    }

    pub fn new(rules: Vec<NormalizationRule>) -> Self {
        Self { rules }
    }

    /// Appends a rule after the existing ones.
    pub fn with_rule(mut self, rule: NormalizationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[NormalizationRule] {
        &self.rules
    }

    pub fn normalize(&self, raw: &str) -> String {
        let line = strip_list_marker(raw);
        for rule in &self.rules {
            if let Some(canonical) = rule.apply(line) {
                trace!(raw, canonical = %canonical, rule = rule.pattern(), "normalized");
                return canonical;
            }
        }
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rules_compile() {
        let normalizer = PhraseNormalizer::standard();
        assert_eq!(normalizer.rules().len(), STANDARD_RULES.len());
        assert_eq!(normalizer.rules()[0].template(), "open homepage");
    }

    #[test]
    fn maps_documented_phrases() {
        let normalizer = PhraseNormalizer::standard();
        let cases = [
            ("Verify HTTP status is 404", "check status 404"),
            ("1. Load homepage", "open homepage"),
            ("2) Take fullpage screenshot", "screenshot \"full_page\""),
            ("- Check missing CSS/JS resources", "check missing-resources"),
            ("Confirm no JavaScript console errors", "check console"),
            ("wait 500ms", "wait 500"),
            ("Go to cart", "go to cart page"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalizer.normalize(raw), expected, "input {:?}", raw);
        }
    }

    #[test]
    fn list_markers() {
        assert_eq!(strip_list_marker("  12. click \"Go\" "), "click \"Go\"");
        assert_eq!(strip_list_marker("3) - enter otp"), "enter otp");
        assert_eq!(strip_list_marker("- add to cart"), "add to cart");
        assert_eq!(strip_list_marker("400 errors"), "400 errors");
        assert_eq!(strip_list_marker("Phase 3: Login"), "Phase 3: Login");
    }

    #[test]
    fn earlier_rule_shadows_later_overlap() {
        let normalizer = PhraseNormalizer::new(vec![
            NormalizationRule::new(r"^visit (.+)$", "open /$1").unwrap(),
            NormalizationRule::new(r"^visit home$", "open homepage").unwrap(),
        ]);
        assert_eq!(normalizer.normalize("visit home"), "open /home");

        let reversed = PhraseNormalizer::new(normalizer.rules().iter().rev().cloned().collect());
        assert_eq!(reversed.normalize("visit home"), "open homepage");
    }

    #[test]
    fn missing_group_expands_empty() {
        let rule = NormalizationRule::new(r"^go (a)?b$", "x$1y$7").unwrap();
        assert_eq!(rule.apply("go b").as_deref(), Some("xy"));
        assert_eq!(rule.apply("GO AB").as_deref(), Some("xAy"));
    }

    #[test]
    fn canonical_lines_are_fixed_points() {
        let normalizer = PhraseNormalizer::standard();
        for line in [
            "open homepage",
            "check status 200",
            "screenshot \"full_page\"",
            "wait 2000",
            "search for \"teddy bear\"",
            "go to cart page",
            "expect page to contain \"Welcome\"",
            "enter otp 654321",
        ] {
            assert_eq!(normalizer.normalize(line), line);
            assert_eq!(normalizer.normalize(&normalizer.normalize(line)), line);
        }
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = NormalizationRule::new("(unclosed", "x").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidPattern { .. }));
    }
}
