use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use action_flow::{CommandTable, Dispatcher, ExecutionContext, RunReport};
use cdp_adapter::{BrowserSession, ChromiumSession, InMemorySession};
use tracing::{info, warn};
use url::Url;

use super::context::CliContext;
use super::output::{render_report, OutputFormat};
use super::steps::{canonical_lines, read_source, ScopeArgs};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Steps file (defaults to steps.txt, then deep_website_testing_steps.txt)
    pub steps: Option<PathBuf>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Site under test, overriding the configured base_url
    #[arg(long, value_name = "URL")]
    pub base_url: Option<Url>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Dispatch against an in-memory page model instead of a browser
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext, output: OutputFormat) -> Result<ExitCode> {
    let config = ctx.config();
    let source = read_source(args.steps.as_deref(), config)?;
    let lines = canonical_lines(&source, &args.scope.options());
    info!(
        source = source.origin(),
        steps = lines.len(),
        config = %ctx.config_path().display(),
        "loaded steps"
    );

    let mut settings = config.run_settings();
    if let Some(base_url) = args.base_url.clone() {
        settings = settings.with_base_url(base_url);
    }
    if settings.base_url.is_none() {
        warn!("no base_url configured; relative paths and `open homepage` will fail");
    }

    let report = if args.dry_run {
        // every URL answers 200 so that routing, not the site, is what gets exercised
        let session: Arc<dyn BrowserSession> =
            Arc::new(InMemorySession::new().with_fallback_status(200));
        execute(session, settings.with_pacing_scale(0.0), source.origin(), &lines).await
    } else {
        let mut cdp = config.cdp_config();
        if args.headed {
            cdp.headless = false;
        }
        let browser = Arc::new(
            ChromiumSession::launch(cdp)
                .await
                .context("Failed to launch browser")?,
        );
        let session: Arc<dyn BrowserSession> = browser.clone();
        let report = execute(session, settings, source.origin(), &lines).await;
        if let Err(err) = browser.shutdown().await {
            warn!(?err, "browser shutdown failed");
        }
        report
    };

    println!("{}", render_report(&report, &output)?);
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn execute(
    session: Arc<dyn BrowserSession>,
    settings: action_flow::RunSettings,
    origin: &str,
    lines: &[step_script::CanonicalLine],
) -> RunReport {
    let context = ExecutionContext::new(session, settings);
    let mut dispatcher = Dispatcher::new(CommandTable::standard(), context);
    dispatcher.execute_all(origin, lines).await
}
