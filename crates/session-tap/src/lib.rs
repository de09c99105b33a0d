//! StepDriver session tap.
//!
//! Two passive listeners registered once per session: one keeps console errors, the
//! other keeps every network response. Both append to a shared [`CaptureLog`] that
//! step handlers read as snapshots.

pub mod config;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::TapConfig;
use cdp_adapter::{BrowserSession, ConsoleLevel, ConsoleMessage, NetworkResponse, SessionEvent};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Cumulative counters over everything captured so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub responses: u64,
    pub res2xx: u64,
    pub res3xx: u64,
    pub res4xx: u64,
    pub res5xx: u64,
    pub console_errors: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Inner {
    console: RwLock<Vec<ConsoleMessage>>,
    responses: RwLock<Vec<NetworkResponse>>,
    dropped: AtomicU64,
}

/// Append-only console and response log shared between the listeners and the handlers.
#[derive(Clone)]
pub struct CaptureLog {
    inner: Arc<Inner>,
    config: Arc<TapConfig>,
}

impl Default for CaptureLog {
    fn default() -> Self {
        Self::new(TapConfig::default())
    }
}

impl CaptureLog {
    pub fn new(config: TapConfig) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            config: Arc::new(config),
        }
    }

    pub fn record(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Console(message) => {
                let keep = match message.level {
                    ConsoleLevel::Error => true,
                    ConsoleLevel::Warning => self.config.capture_warnings,
                    _ => false,
                };
                if keep {
                    self.push(&self.inner.console, message.clone());
                }
            }
            SessionEvent::Response(response) => {
                trace!(url = %response.url, status = response.status, "response captured");
                self.push(&self.inner.responses, response.clone());
            }
        }
    }

    fn push<T>(&self, log: &RwLock<Vec<T>>, entry: T) {
        let mut entries = log.write();
        if entries.len() >= self.config.max_entries {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        entries.push(entry);
    }

    pub fn console_errors(&self) -> Vec<ConsoleMessage> {
        self.inner.console.read().clone()
    }

    pub fn responses(&self) -> Vec<NetworkResponse> {
        self.inner.responses.read().clone()
    }

    /// Responses with status 404 or any 5xx.
    pub fn failed_resources(&self) -> Vec<NetworkResponse> {
        self.inner
            .responses
            .read()
            .iter()
            .filter(|r| r.status == 404 || r.status >= 500)
            .cloned()
            .collect()
    }

    pub fn server_errors(&self) -> Vec<NetworkResponse> {
        self.inner
            .responses
            .read()
            .iter()
            .filter(|r| r.status >= 500)
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> CaptureSummary {
        let mut summary = CaptureSummary {
            console_errors: self.inner.console.read().len() as u64,
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            ..CaptureSummary::default()
        };
        for response in self.inner.responses.read().iter() {
            summary.responses += 1;
            match response.status {
                200..=299 => summary.res2xx += 1,
                300..=399 => summary.res3xx += 1,
                400..=499 => summary.res4xx += 1,
                500..=599 => summary.res5xx += 1,
                _ => {}
            }
        }
        summary
    }
}

/// Registers the capture listeners on a session.
pub struct SessionTap;

impl SessionTap {
    /// Subscribes exactly two callbacks and returns the log they feed.
    pub fn attach(session: &dyn BrowserSession, config: TapConfig) -> CaptureLog {
        let log = CaptureLog::new(config);

        let console_log = log.clone();
        session.subscribe(Arc::new(move |event: &SessionEvent| {
            if matches!(event, SessionEvent::Console(_)) {
                console_log.record(event);
            }
        }));

        let response_log = log.clone();
        session.subscribe(Arc::new(move |event: &SessionEvent| {
            if matches!(event, SessionEvent::Response(_)) {
                response_log.record(event);
            }
        }));

        log
    }
}
