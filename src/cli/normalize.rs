use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

use super::context::CliContext;
use super::output::{render_structured, OutputFormat};
use super::steps::{canonical_lines, read_source, ScopeArgs};

#[derive(Args, Clone, Debug)]
pub struct NormalizeArgs {
    /// Steps file (defaults to steps.txt, then deep_website_testing_steps.txt)
    pub steps: Option<PathBuf>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

pub async fn cmd_normalize(
    args: NormalizeArgs,
    ctx: &CliContext,
    output: OutputFormat,
) -> Result<ExitCode> {
    let source = read_source(args.steps.as_deref(), ctx.config())?;
    let lines = canonical_lines(&source, &args.scope.options());

    match output {
        OutputFormat::Human => {
            for line in &lines {
                println!("{:>3}. {}", line.number, line.text);
            }
        }
        structured => println!("{}", render_structured(&lines, &structured)?),
    }
    Ok(ExitCode::SUCCESS)
}
