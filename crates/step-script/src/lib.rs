//! Plain-text step scripts.
//!
//! A step file is read once, stripped of blanks, comments and list markers, and each
//! line is rewritten to a canonical command by the [`PhraseNormalizer`]. [`load`]
//! then scopes the resulting sequence with [`RunOptions`].

pub mod errors;
pub mod loader;
pub mod normalizer;

pub use errors::ScriptError;
pub use loader::{discover_steps_file, load, CanonicalLine, RunOptions, StepSource, DEFAULT_STEP_FILES};
pub use normalizer::{strip_list_marker, NormalizationRule, PhraseNormalizer};
