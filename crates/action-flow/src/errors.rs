//! Step failure types

use action_locator::LocatorError;
use cdp_adapter::AdapterError;
use thiserror::Error;

/// A hard step failure. Soft failures never reach this type; handlers report them
/// as a warned [`crate::types::StepOutcome`].
#[derive(Debug, Error)]
pub enum StepError {
    #[error("expected status {expected} but got {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("required element not found: {0}")]
    RequiredElementMissing(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("browser error: {0}")]
    Browser(#[from] AdapterError),

    #[error("element resolution failed: {0}")]
    Locator(#[from] LocatorError),
}

impl StepError {
    /// Short label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::StatusMismatch { .. } => "status_mismatch",
            StepError::RequiredElementMissing(_) => "required_element_missing",
            StepError::Navigation { .. } => "navigation",
            StepError::Assertion(_) => "assertion",
            StepError::Timeout(_) => "timeout",
            StepError::MissingConfiguration(_) => "missing_configuration",
            StepError::Browser(_) => "browser",
            StepError::Locator(_) => "locator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::AdapterErrorKind;

    #[test]
    fn adapter_errors_convert() {
        let err: StepError = AdapterError::new(AdapterErrorKind::CdpIo).with_hint("socket closed").into();
        assert_eq!(err.kind(), "browser");
        assert!(err.to_string().contains("socket closed"));

        let mismatch = StepError::StatusMismatch { expected: 200, actual: 404 };
        assert_eq!(mismatch.to_string(), "expected status 200 but got 404");
    }
}
