pub mod app;
pub mod audit;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod normalize;
pub mod output;
pub mod run;
pub mod runtime;
pub mod steps;

pub use audit::{cmd_audit, AuditArgs};
pub use normalize::{cmd_normalize, NormalizeArgs};
pub use run::{cmd_run, RunArgs};
