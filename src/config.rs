//! StepDriver configuration
//!
//! Loaded from YAML (see [`crate::cli::runtime::load_config`]) and then overridden by
//! `STEPDRIVER_*` environment variables.

use action_flow::{Credentials, RunSettings, TestData, Timeouts};
use anyhow::{Context, Result};
use cdp_adapter::config::CdpConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site under test; `open homepage` and every relative path resolve against it.
    pub base_url: Option<Url>,
    pub login: Credentials,
    pub browser: BrowserSection,
    pub timeouts: TimeoutSection,
    pub pacing_scale: f64,
    pub screenshots_dir: PathBuf,
    pub steps_file: Option<PathBuf>,
    pub test_data: TestData,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            login: Credentials::default(),
            browser: BrowserSection::default(),
            timeouts: TimeoutSection::default(),
            pacing_scale: 1.0,
            screenshots_dir: PathBuf::from("screenshots"),
            steps_file: None,
            test_data: TestData::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    /// Chromium binary; detected from PATH and the usual install locations when unset.
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1280,
            window_height: 800,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub navigation_ms: u64,
    pub action_ms: u64,
    pub wait_for_ms: u64,
    pub run_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        let step = Timeouts::default();
        Self {
            navigation_ms: 60_000,
            action_ms: 30_000,
            wait_for_ms: step.wait_for_ms,
            run_ms: step.run_ms,
        }
    }
}

impl Config {
    /// Applies `STEPDRIVER_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = lookup("STEPDRIVER_BASE_URL") {
            let url = Url::parse(raw.trim())
                .with_context(|| format!("STEPDRIVER_BASE_URL is not a valid URL: {}", raw))?;
            self.base_url = Some(url);
        }
        if let Some(raw) = lookup("STEPDRIVER_HEADLESS") {
            let lower = raw.trim().to_ascii_lowercase();
            self.browser.headless = !matches!(lower.as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(raw) = lookup("STEPDRIVER_CHROME") {
            self.browser.executable = Some(PathBuf::from(raw.trim()));
        }
        if let Some(phone) = lookup("STEPDRIVER_PHONE") {
            self.login.phone = Some(phone);
        }
        if let Some(code) = lookup("STEPDRIVER_COUNTRY_CODE") {
            self.login.country_code = Some(code);
        }
        if let Some(otp) = lookup("STEPDRIVER_OTP") {
            self.login.otp = Some(otp);
        }
        Ok(())
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            base_url: self.base_url.clone(),
            credentials: self.login.clone(),
            timeouts: Timeouts {
                wait_for_ms: self.timeouts.wait_for_ms,
                run_ms: self.timeouts.run_ms,
            },
            screenshots_dir: self.screenshots_dir.clone(),
            pacing_scale: self.pacing_scale.max(0.0),
            test_data: self.test_data.clone(),
        }
    }

    pub fn cdp_config(&self) -> CdpConfig {
        let mut cdp = CdpConfig::default();
        cdp.headless = self.browser.headless;
        if let Some(executable) = &self.browser.executable {
            cdp.executable = executable.clone();
        }
        cdp.window_width = self.browser.window_width;
        cdp.window_height = self.browser.window_height;
        cdp.navigation_timeout_ms = self.timeouts.navigation_ms;
        cdp.action_timeout_ms = self.timeouts.action_ms;
        cdp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_sections_fill_in_defaults() {
        let config: Config = serde_yaml::from_str(
            "base_url: https://shop.test/\nlogin:\n  phone: \"5550100\"\ntimeouts:\n  run_ms: 1000\n",
        )
        .unwrap();
        assert_eq!(config.base_url.as_ref().map(Url::as_str), Some("https://shop.test/"));
        assert_eq!(config.login.phone.as_deref(), Some("5550100"));
        assert_eq!(config.timeouts.run_ms, 1000);
        assert_eq!(config.timeouts.navigation_ms, 60_000);
        assert!(config.browser.headless);

        let settings = config.run_settings();
        assert_eq!(settings.timeouts.run_ms, 1000);
        assert_eq!(settings.credentials.phone.as_deref(), Some("5550100"));
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("STEPDRIVER_BASE_URL", "https://staging.test/"),
            ("STEPDRIVER_HEADLESS", "off"),
            ("STEPDRIVER_OTP", "111222"),
            ("STEPDRIVER_PHONE", "  "),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.login.phone = Some("5550100".into());
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url.unwrap().as_str(), "https://staging.test/");
        assert!(!config.browser.headless);
        assert_eq!(config.login.otp.as_deref(), Some("111222"));
        assert_eq!(config.login.phone.as_deref(), Some("5550100"));
    }

    #[test]
    fn invalid_base_url_override_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "STEPDRIVER_BASE_URL").then(|| "not a url".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn cdp_config_carries_browser_section() {
        let mut config = Config::default();
        config.browser.executable = Some(PathBuf::from("/opt/chrome"));
        config.timeouts.action_ms = 5_000;
        let cdp = config.cdp_config();
        assert_eq!(cdp.executable, PathBuf::from("/opt/chrome"));
        assert_eq!(cdp.action_timeout_ms, 5_000);
        assert_eq!(cdp.window_width, 1280);
    }
}
