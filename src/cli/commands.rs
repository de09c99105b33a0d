use clap::Subcommand;

use super::audit::AuditArgs;
use super::normalize::NormalizeArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Execute a steps file against a browser session
    Run(RunArgs),

    /// Report which normalized steps match a known command, without executing anything
    Audit(AuditArgs),

    /// Print the canonical lines a run would dispatch
    Normalize(NormalizeArgs),
}
