//! StepDriver browser session capability.
//!
//! The interpreter never talks to a browser engine directly. It consumes the
//! [`BrowserSession`] trait defined here, which has two implementations: a Chromium
//! DevTools backend built on `chromiumoxide` and an in-memory scripted page model that
//! the test suites and `--dry-run` use in place of a real browser.

use std::{env, path::PathBuf};
use which::which;

pub mod chromium;
pub mod memory;
mod session;

pub use chromium::ChromiumSession;
pub use error::{AdapterError, AdapterErrorKind};
pub use events::{ConsoleLevel, ConsoleMessage, EventListener, NetworkResponse, ResourceKind, SessionEvent};
pub use memory::{InMemorySession, Interaction, MemoryElement, MemoryPage};
pub use session::{
    BrowserSession, ElementHandle, HttpMethod, ImageState, LoadTiming, NavResponse, Query,
    TextMatch, WaitPolicy,
};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by a browser session.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("browser action timed out")]
        ActionTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("invalid selector")]
        InvalidSelector,
        #[error("http request failed")]
        Http,
        #[error("internal error")]
        Internal,
    }

    /// Error returned by every [`crate::BrowserSession`] operation.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self { kind, hint: None }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn is_timeout(&self) -> bool {
            matches!(
                self.kind,
                AdapterErrorKind::NavTimeout | AdapterErrorKind::ActionTimeout
            )
        }
    }
}

pub mod events {
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    /// Severity reported for a console message.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConsoleLevel {
        Log,
        Info,
        Warning,
        Error,
        Debug,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ConsoleMessage {
        pub level: ConsoleLevel,
        pub text: String,
    }

    /// Resource type of a network response, as reported by the browser.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ResourceKind {
        Document,
        Stylesheet,
        Script,
        Image,
        Font,
        Fetch,
        Other,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NetworkResponse {
        pub url: String,
        pub status: u16,
        pub resource: ResourceKind,
    }

    /// Events pushed to subscribers for the lifetime of a session.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum SessionEvent {
        Console(ConsoleMessage),
        Response(NetworkResponse),
    }

    /// Subscriber callback registered through [`crate::BrowserSession::subscribe`].
    pub type EventListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Configuration for launching and tuning a Chromium session.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub headless: bool,
        pub window_width: u32,
        pub window_height: u32,
        pub navigation_timeout_ms: u64,
        pub action_timeout_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                headless: resolve_headless_default(),
                window_width: 1280,
                window_height: 800,
                navigation_timeout_ms: 60_000,
                action_timeout_ms: 30_000,
            }
        }
    }

    fn resolve_headless_default() -> bool {
        // "0", "false", "no" and "off" mean headful
        match env::var("STEPDRIVER_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            Err(_) => true,
        }
    }

    fn default_chrome_path() -> PathBuf {
        detect_chrome_executable().unwrap_or_default()
    }
}

pub(crate) fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("STEPDRIVER_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("STEPDRIVER_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        for candidate in os_specific_chrome_paths() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let root = PathBuf::from(value.trim());
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Chromium/Application/chrome.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}

/// Explicit executable first, then discovery.
pub(crate) fn resolve_chrome_path(cfg: &config::CdpConfig) -> Option<PathBuf> {
    if !cfg.executable.as_os_str().is_empty() && cfg.executable.exists() {
        return Some(cfg.executable.clone());
    }
    detect_chrome_executable()
}

#[cfg(test)]
mod tests {
    use super::{chrome_executable_names, detect_chrome_executable, AdapterError, AdapterErrorKind};
    use std::{env, fs};
    use tempfile::tempdir;

    #[test]
    fn detects_from_env_var() {
        let dir = tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();
        let original = env::var("STEPDRIVER_CHROME").ok();
        env::set_var("STEPDRIVER_CHROME", exe_path.to_string_lossy().to_string());
        let detected = detect_chrome_executable();
        if let Some(value) = original {
            env::set_var("STEPDRIVER_CHROME", value);
        } else {
            env::remove_var("STEPDRIVER_CHROME");
        }
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    fn executable_names_are_not_empty() {
        assert!(!chrome_executable_names().is_empty());
    }

    #[test]
    fn error_display_includes_hint() {
        let err = AdapterError::new(AdapterErrorKind::NavTimeout).with_hint("https://example.test");
        assert_eq!(err.to_string(), "navigation timed out: https://example.test");
        assert!(err.is_timeout());
        assert!(!AdapterError::new(AdapterErrorKind::Http).is_timeout());
    }
}
