//! Vendors, groups and comments

use super::{any_of, click_optional, excerpt, first_text, named_button};
use crate::{
    context::ExecutionContext,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::TextMatch;

pub(crate) fn click_notify_group(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = named_button("notify group button", &["notify", "group"]);
        click_optional(ctx, chain, 1000, "clicked notify group").await
    })
}

pub(crate) fn open_vendor(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("vendor link").css("a[href*=\"vendor\"], [class*=\"vendor\"]");
        click_optional(ctx, chain, 1000, "opened vendor page").await
    })
}

pub(crate) fn submit_comment(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let field = FallbackChain::new("comment field")
            .css("textarea[name*=\"comment\"], textarea[placeholder*=\"comment\"]")
            .fallback("textarea");
        let Some(found) = ctx.locate(&field).await? else {
            return Ok(StepOutcome::warned("comment field not found"));
        };
        let comment = ctx.settings().test_data.comment.clone();
        ctx.session().fill(&found.element, &comment).await?;
        let submit = named_button("comment submit button", &["submit", "post"]);
        let outcome = click_optional(ctx, submit, 1000, "submitted comment").await?;
        if outcome.status == crate::types::StepStatus::Warned {
            return Ok(StepOutcome::warned("comment entered but submit button not found"));
        }
        Ok(outcome)
    })
}

pub(crate) fn join_leave_group(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("join or leave button")
            .css_with_text("button", any_of(&["join", "leave"]));
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("join/leave button not found"));
        };
        let label = ctx.session().text(&found.element).await?;
        ctx.session().click(&found.element).await?;
        ctx.settle(1000).await;
        Ok(StepOutcome::passed(format!("group action: {}", excerpt(&label, 30))))
    })
}

pub(crate) fn post_listing_in_group(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("post button")
            .css_with_text("button", any_of(&["post", "share"]));
        click_optional(ctx, chain, 1000, "post listing initiated").await
    })
}

pub(crate) fn validate_feed(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let items = ctx
            .count("[class*=\"feed\"], [class*=\"post\"], [class*=\"item\"]")
            .await?;
        Ok(StepOutcome::passed(format!("feed has {} items", items)))
    })
}

pub(crate) fn pagination_check(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("next page control")
            .css_with_text("a, button", TextMatch::contains("next"))
            .css("[aria-label*=\"next\"]");
        match ctx.locate(&chain).await? {
            Some(_) => Ok(StepOutcome::passed("pagination next control found")),
            None => Ok(StepOutcome::warned("pagination not detected")),
        }
    })
}

pub(crate) fn validate_moderation(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("moderation status")
            .css("[class*=\"moderation\"], [class*=\"status\"], [title*=\"moderation\"]");
        match first_text(ctx, &chain).await? {
            Some(text) => Ok(StepOutcome::passed(format!("moderation status: {}", excerpt(&text, 30)))),
            None => Ok(StepOutcome::warned("moderation status not visible")),
        }
    })
}

pub(crate) fn open_comment_menu(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("comment menu")
            .css("[class*=\"comment-menu\"], [class*=\"comment-actions\"], .menu");
        click_optional(ctx, chain, 500, "comment menu opened").await
    })
}
