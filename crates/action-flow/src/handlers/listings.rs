//! Listing creation and editing

use super::{any_of, click_optional, named_button, BUTTONISH};
use crate::{
    context::ExecutionContext,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::TextMatch;
use tracing::debug;

pub(crate) fn upload_images(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        if ctx.count("input[type=\"file\"]").await? > 0 {
            Ok(StepOutcome::passed("file input found, upload skipped"))
        } else {
            Ok(StepOutcome::warned("no file input found"))
        }
    })
}

pub(crate) fn enter_details(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("details field")
            .css("textarea, input[type=\"text\"][name*=\"title\"], input[type=\"text\"][name*=\"description\"]")
            .fallback("textarea, input[type=\"text\"]");
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("details field not found"));
        };
        let details = ctx.settings().test_data.listing_details.clone();
        ctx.session().fill(&found.element, &details).await?;
        ctx.settle(500).await;
        Ok(StepOutcome::passed("entered listing details"))
    })
}

pub(crate) fn submit_listing(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = named_button("submit listing button", &["submit", "create", "publish"]);
        click_optional(ctx, chain, 1500, "submitted listing").await
    })
}

pub(crate) fn validate_listing_appears(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let found = ctx.count("[class*=\"listing\"], [class*=\"product\"]").await?;
        if found > 0 {
            Ok(StepOutcome::passed(format!("{} listing elements on page", found)))
        } else {
            Ok(StepOutcome::warned("no listing visible"))
        }
    })
}

pub(crate) fn negative_price(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("price input")
            .css("input[type=\"number\"], input[name*=\"price\"]");
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("price input not found"));
        };
        let value = ctx.settings().test_data.negative_price.clone();
        ctx.session().fill(&found.element, &value).await?;
        let kept = ctx.session().input_value(&found.element).await?;
        Ok(StepOutcome::passed(format!(
            "entered {} into price, field holds \"{}\"",
            value, kept
        )))
    })
}

pub(crate) fn ai_description(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("ai description button")
            .css_with_text("button", any_of(&["ai", "auto-generate", "generate"]));
        click_optional(ctx, chain, 2000, "ai description requested").await
    })
}

pub(crate) fn edit_listing(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("edit button")
            .css_with_text("button", TextMatch::contains("edit"))
            .css("[href*=\"edit\"]");
        click_optional(ctx, chain, 1000, "edit listing opened").await
    })
}

pub(crate) fn save_changes(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("save button")
            .css_with_text("button", any_of(&["save", "update"]));
        click_optional(ctx, chain, 1500, "changes saved").await
    })
}

pub(crate) fn delete_listing(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let delete = FallbackChain::new("delete button")
            .css_with_text("button", any_of(&["delete", "remove"]));
        let Some(found) = ctx.locate(&delete).await? else {
            return Ok(StepOutcome::warned("delete button not found"));
        };
        ctx.session().click(&found.element).await?;
        ctx.settle(1000).await;
        let confirm = FallbackChain::new("confirm button")
            .css_with_text("button", any_of(&["confirm", "yes"]));
        match ctx.locate(&confirm).await? {
            Some(found) => {
                ctx.session().click(&found.element).await?;
                ctx.settle(1000).await;
                Ok(StepOutcome::passed("listing deleted"))
            }
            None => {
                debug!("no confirmation prompt after delete");
                Ok(StepOutcome::passed("delete initiated"))
            }
        }
    })
}

pub(crate) fn confirm_popup(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("confirm button")
            .css_with_text("button", any_of(&["confirm", "ok", "yes"]))
            .css_with_text(BUTTONISH, any_of(&["confirm", "ok", "yes"]));
        click_optional(ctx, chain, 800, "popup confirmed").await
    })
}
