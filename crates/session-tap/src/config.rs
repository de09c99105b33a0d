//! Configuration types for the session tap.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TapConfig {
    /// Upper bound per log; entries past it are counted but not stored.
    pub max_entries: usize,
    /// Also keep `console.warn` output, not just errors.
    pub capture_warnings: bool,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            capture_warnings: false,
        }
    }
}
