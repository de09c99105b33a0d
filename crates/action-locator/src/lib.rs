//! Tiered element resolution.
//!
//! Handlers describe what they are looking for as an ordered [`FallbackChain`] of
//! strategies (role, label, placeholder, heuristic selectors, broad fallbacks). The
//! chain short-circuits on the first strategy that yields any element and acts on the
//! first element it returned.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
