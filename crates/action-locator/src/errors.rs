//! Error types for locator system

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Element not found with any strategy
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Strategy execution failed
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Selector the session could not parse
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Timeout during resolution
    #[error("Resolution timeout: {0}")]
    Timeout(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::Timeout(_))
    }

    pub(crate) fn from_adapter(strategy: &str, err: AdapterError) -> Self {
        match err.kind {
            AdapterErrorKind::InvalidSelector => {
                LocatorError::InvalidSelector(err.hint.unwrap_or_else(|| strategy.to_string()))
            }
            AdapterErrorKind::ActionTimeout | AdapterErrorKind::NavTimeout => {
                LocatorError::Timeout(err.to_string())
            }
            _ => LocatorError::StrategyFailed {
                strategy: strategy.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_errors_map_to_locator_errors() {
        let timeout = LocatorError::from_adapter(
            "css",
            AdapterError::new(AdapterErrorKind::ActionTimeout),
        );
        assert!(timeout.is_retryable());

        let invalid = LocatorError::from_adapter(
            "css",
            AdapterError::new(AdapterErrorKind::InvalidSelector).with_hint("a[b"),
        );
        assert_eq!(invalid, LocatorError::InvalidSelector("a[b".into()));

        let io = LocatorError::from_adapter("role", AdapterError::new(AdapterErrorKind::CdpIo));
        assert!(matches!(io, LocatorError::StrategyFailed { ref strategy, .. } if strategy == "role"));
        assert!(!io.is_retryable());
    }
}
