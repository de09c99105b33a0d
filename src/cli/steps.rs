use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use step_script::{discover_steps_file, load, CanonicalLine, PhraseNormalizer, RunOptions, StepSource};

use crate::config::Config;

/// Run-scoping flags shared by `run` and `normalize`.
#[derive(Args, Clone, Debug, Default)]
pub struct ScopeArgs {
    /// First normalized step to keep (1-based)
    #[arg(long = "from", env = "STEP_FROM", value_name = "N")]
    pub from: Option<usize>,

    /// Last normalized step to keep (inclusive)
    #[arg(long = "to", env = "STEP_TO", value_name = "N")]
    pub to: Option<usize>,

    /// Keep only steps containing this text (case-insensitive)
    #[arg(long = "match", env = "STEP_MATCH", value_name = "KEYWORD")]
    pub keyword: Option<String>,
}

impl ScopeArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            start_line: self.from,
            end_line: self.to,
            keyword: self.keyword.clone().filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Explicit path, then the configured `steps_file`, then the default names in the
/// working directory.
pub fn resolve_steps_path(explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.steps_file {
        return Ok(path.clone());
    }
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    discover_steps_file(&cwd).context("No steps file given")
}

pub fn read_source(explicit: Option<&Path>, config: &Config) -> Result<StepSource> {
    let path = resolve_steps_path(explicit, config)?;
    StepSource::from_path(&path)
        .with_context(|| format!("Failed to load steps from {}", path.display()))
}

pub fn canonical_lines(source: &StepSource, scope: &RunOptions) -> Vec<CanonicalLine> {
    load(source, &PhraseNormalizer::standard(), scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_config() {
        let mut config = Config::default();
        config.steps_file = Some(PathBuf::from("configured.txt"));
        let explicit = resolve_steps_path(Some(Path::new("cli.txt")), &config).unwrap();
        assert_eq!(explicit, PathBuf::from("cli.txt"));
        let configured = resolve_steps_path(None, &config).unwrap();
        assert_eq!(configured, PathBuf::from("configured.txt"));
    }

    #[test]
    fn blank_keyword_is_ignored() {
        let scope = ScopeArgs {
            from: Some(2),
            to: None,
            keyword: Some("  ".into()),
        };
        let options = scope.options();
        assert_eq!(options.start_line, Some(2));
        assert!(options.keyword.is_none());
    }
}
