//! Step interpreter
//!
//! Routes canonical step lines through an ordered command table onto a
//! [`cdp_adapter::BrowserSession`], recording one [`StepRecord`] per line.

pub mod audit;
pub mod context;
pub mod errors;
pub mod executor;
mod handlers;
pub mod settings;
pub mod table;
pub mod types;

pub use audit::{AuditEntry, CoverageReport};
pub use context::ExecutionContext;
pub use errors::StepError;
pub use executor::Dispatcher;
pub use settings::{ApiEndpoints, Credentials, RunSettings, SitePaths, TestData, Timeouts};
pub use table::{CommandAction, CommandArgs, CommandMatcher, CommandTable, HandlerFn, HandlerFuture};
pub use types::{RunReport, StatusCounts, StepOutcome, StepRecord, StepStatus};
