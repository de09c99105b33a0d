use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use cdp_adapter::NavResponse;

fn opened(response: &NavResponse) -> StepOutcome {
    match response.status {
        Some(status) => StepOutcome::passed(format!("opened {} ({})", response.url, status)),
        None => StepOutcome::passed(format!("opened {}", response.url)),
    }
}

/// Navigates to a configured site path and settles.
async fn visit(
    ctx: &mut ExecutionContext,
    path: String,
    settle_ms: u64,
) -> Result<StepOutcome, StepError> {
    let response = ctx.navigate(&path).await?;
    ctx.settle(settle_ms).await;
    Ok(opened(&response))
}

pub(crate) fn open_homepage(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let home = ctx.homepage()?;
        let response = ctx.navigate(&home).await?;
        Ok(opened(&response))
    })
}

pub(crate) fn open(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let response = ctx.navigate(args.text(1)).await?;
        Ok(opened(&response))
    })
}

pub(crate) fn go_to_cart(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.paths.cart.clone();
        visit(ctx, path, 1000).await
    })
}

pub(crate) fn create_listing(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.paths.create_listing.clone();
        visit(ctx, path, 1500).await
    })
}

pub(crate) fn load_vendor_list(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.paths.vendors.clone();
        visit(ctx, path, 1500).await
    })
}

pub(crate) fn load_groups_list(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx.settings().test_data.paths.groups.clone();
        visit(ctx, path, 1000).await
    })
}
