use super::audit::cmd_audit;
use super::env::CliArgs;
use super::normalize::cmd_normalize;
use super::run::cmd_run;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;
use std::process::ExitCode;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx, cli.output.clone()).await,
        Commands::Audit(args) => cmd_audit(args, ctx, cli.output.clone()).await,
        Commands::Normalize(args) => cmd_normalize(args, ctx, cli.output.clone()).await,
    }
}
