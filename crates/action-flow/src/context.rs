//! Per-run execution state shared by every handler

use crate::{errors::StepError, settings::RunSettings};
use action_locator::{FallbackChain, LocatorError, Resolved};
use cdp_adapter::{AdapterErrorKind, BrowserSession, HttpMethod, NavResponse, Query, WaitPolicy};
use session_tap::{config::TapConfig, CaptureLog, SessionTap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Session handle, capture log and last navigation result for one run.
///
/// Owned by the dispatcher and lent mutably to one handler at a time. The capture log
/// is filled by the session listeners independently of the handlers.
pub struct ExecutionContext {
    session: Arc<dyn BrowserSession>,
    settings: RunSettings,
    capture: CaptureLog,
    last_response: Option<NavResponse>,
}

impl ExecutionContext {
    /// Attaches the capture listeners to `session`.
    pub fn new(session: Arc<dyn BrowserSession>, settings: RunSettings) -> Self {
        let capture = SessionTap::attach(session.as_ref(), TapConfig::default());
        Self::with_capture(session, settings, capture)
    }

    pub fn with_capture(
        session: Arc<dyn BrowserSession>,
        settings: RunSettings,
        capture: CaptureLog,
    ) -> Self {
        Self {
            session,
            settings,
            capture,
            last_response: None,
        }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn capture(&self) -> &CaptureLog {
        &self.capture
    }

    pub fn last_response(&self) -> Option<&NavResponse> {
        self.last_response.as_ref()
    }

    fn base_url(&self) -> Result<&Url, StepError> {
        self.settings.base_url.as_ref().ok_or_else(|| {
            StepError::MissingConfiguration("base_url is required for relative paths".into())
        })
    }

    pub fn homepage(&self) -> Result<String, StepError> {
        Ok(self.base_url()?.to_string())
    }

    /// Absolute http(s) URLs pass through; anything else is joined onto the base URL.
    pub fn resolve_url(&self, target: &str) -> Result<String, StepError> {
        if let Ok(url) = Url::parse(target) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url.to_string());
            }
        }
        let base = self.base_url()?;
        base.join(target)
            .map(|url| url.to_string())
            .map_err(|err| StepError::Navigation {
                url: target.to_string(),
                reason: err.to_string(),
            })
    }

    /// Navigates and records the response as the last navigation result.
    pub async fn navigate(&mut self, target: &str) -> Result<NavResponse, StepError> {
        let url = self.resolve_url(target)?;
        let response = self
            .session
            .navigate(&url, WaitPolicy::DomContentLoaded)
            .await
            .map_err(|err| match err.kind {
                AdapterErrorKind::NavTimeout => StepError::Timeout(format!("navigation to {}", url)),
                _ => StepError::Navigation {
                    url: url.clone(),
                    reason: err.to_string(),
                },
            })?;
        debug!(url = %response.url, status = ?response.status, "navigated");
        self.last_response = Some(response.clone());
        Ok(response)
    }

    /// Settle pause between UI actions, scaled by the configured pacing.
    pub async fn settle(&self, ms: u64) {
        let scaled = (ms as f64 * self.settings.pacing_scale).round() as u64;
        if scaled > 0 {
            tokio::time::sleep(Duration::from_millis(scaled)).await;
        }
    }

    pub async fn locate(&self, chain: &FallbackChain) -> Result<Option<Resolved>, StepError> {
        Ok(chain.resolve(self.session()).await?)
    }

    /// Like [`ExecutionContext::locate`] but an exhausted chain is a hard failure.
    pub async fn require(&self, chain: &FallbackChain) -> Result<Resolved, StepError> {
        chain.require(self.session()).await.map_err(|err| match err {
            LocatorError::ElementNotFound(what) => StepError::RequiredElementMissing(what),
            other => StepError::Locator(other),
        })
    }

    pub async fn count(&self, selector: &str) -> Result<usize, StepError> {
        Ok(self.session.query(&Query::css(selector)).await?.len())
    }

    /// Requests `path` relative to the base URL. Returns the status or the transport
    /// error text, plus the elapsed time.
    pub async fn probe(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(Result<u16, String>, Duration), StepError> {
        let url = self.resolve_url(path)?;
        let started = Instant::now();
        let status = self
            .session
            .request(method, &url, body)
            .await
            .map_err(|err| err.to_string());
        let elapsed = started.elapsed();
        debug!(%method, url = %url, status = ?status, elapsed_ms = elapsed.as_millis() as u64, "probe");
        Ok((status, elapsed))
    }
}
