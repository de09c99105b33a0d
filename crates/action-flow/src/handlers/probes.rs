//! Raw HTTP probes and environment reports

use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use cdp_adapter::HttpMethod;
use std::time::Duration;

/// Status and latency of one probe; transport errors are soft.
async fn report(
    ctx: &ExecutionContext,
    label: &str,
    method: HttpMethod,
    path: &str,
    body: Option<serde_json::Value>,
) -> Result<StepOutcome, StepError> {
    let (status, elapsed) = ctx.probe(method, path, body).await?;
    Ok(outcome(label, path, status, elapsed))
}

fn outcome(label: &str, path: &str, status: Result<u16, String>, elapsed: Duration) -> StepOutcome {
    match status {
        Ok(status) => StepOutcome::passed(format!(
            "{}: {} {} in {} ms",
            label,
            path,
            status,
            elapsed.as_millis()
        )),
        Err(err) => StepOutcome::warned(format!("{}: {} failed: {}", label, path, err)),
    }
}

pub(crate) fn listing_creation(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let data = &ctx.settings().test_data;
        let path = data.endpoints.listings.clone();
        let body = data.listing_payload.clone();
        report(ctx, "listing creation", HttpMethod::Post, &path, Some(body)).await
    })
}

pub(crate) fn marketplace_search(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.marketplace_search.clone();
        report(ctx, "marketplace search", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn vendor_comments(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.vendor_comments.clone();
        report(ctx, "vendor comments", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn groups_api(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.groups.clone();
        report(ctx, "groups api", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn user_profile_api(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.user_profile.clone();
        report(ctx, "user profile api", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn api_latency(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.latency.clone();
        report(ctx, "api latency", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn invalid_endpoint(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.endpoints.invalid.clone();
        report(ctx, "invalid endpoint", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn missing_product(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.paths.missing_product.clone();
        report(ctx, "non-existent product", HttpMethod::Get, &path, None).await
    })
}

pub(crate) fn browser_device(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        Ok(StepOutcome::acknowledged(format!(
            "{} noted, running on {}",
            args.line(),
            ctx.session().browser_name()
        )))
    })
}

pub(crate) fn desktop_viewport(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        match ctx.session().viewport().await? {
            Some((width, height)) => Ok(StepOutcome::passed(format!("viewport {}x{}", width, height))),
            None => Ok(StepOutcome::warned("viewport size not available")),
        }
    })
}
