use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

use action_flow::{CommandTable, CoverageReport};
use step_script::RunOptions;
use tracing::info;

use super::context::CliContext;
use super::output::{render_structured, OutputFormat};
use super::steps::{canonical_lines, read_source};

#[derive(Args, Clone, Debug)]
pub struct AuditArgs {
    /// Steps file (defaults to steps.txt, then deep_website_testing_steps.txt)
    pub steps: Option<PathBuf>,
}

pub async fn cmd_audit(args: AuditArgs, ctx: &CliContext, output: OutputFormat) -> Result<ExitCode> {
    let source = read_source(args.steps.as_deref(), ctx.config())?;
    let lines = canonical_lines(&source, &RunOptions::default());
    let report = CoverageReport::build(&lines, &CommandTable::standard());
    info!(
        source = source.origin(),
        total = report.total(),
        known = report.known(),
        "coverage audit"
    );

    match output {
        OutputFormat::Human => print!("{}", report.render()),
        structured => println!("{}", render_structured(&report, &structured)?),
    }
    Ok(ExitCode::SUCCESS)
}
