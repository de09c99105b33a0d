//! Contact and bug-report form checks

use super::{any_of, click_optional, excerpt, first_text, named_button};
use crate::{
    context::ExecutionContext,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::TextMatch;

fn submit_button() -> FallbackChain {
    FallbackChain::new("submit button")
        .css_with_text("button", TextMatch::contains("submit"))
        .css("button[type=\"submit\"]")
}

pub(crate) fn submit_form(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = named_button("submit button", &["submit", "send"]).fallback("button");
        click_optional(ctx, chain, 1500, "submitted form").await
    })
}

pub(crate) fn validate_success(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("success message")
            .css("[class*=\"success\"], [class*=\"alert-success\"], [role=\"alert\"]");
        match first_text(ctx, &chain).await? {
            Some(text) if !text.trim().is_empty() => Ok(StepOutcome::passed(format!(
                "success message: {}",
                excerpt(&text, 50)
            ))),
            _ => Ok(StepOutcome::warned("no success message visible")),
        }
    })
}

pub(crate) fn submit_invalid_email(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let email = FallbackChain::new("email input").css("input[type=\"email\"]");
        let Some(found) = ctx.locate(&email).await? else {
            return Ok(StepOutcome::warned("email input not found"));
        };
        let value = ctx.settings().test_data.invalid_email.clone();
        ctx.session().fill(&found.element, &value).await?;
        click_optional(ctx, submit_button(), 1000, "invalid email submission attempted").await
    })
}

pub(crate) fn successful_submission(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("confirmation message")
            .css("[class*=\"success\"], [class*=\"confirmation\"]")
            .text(any_of(&["success", "submitted"]));
        match first_text(ctx, &chain).await? {
            Some(text) => Ok(StepOutcome::passed(format!("confirmation: {}", excerpt(&text, 50)))),
            None => Ok(StepOutcome::warned("success message not found")),
        }
    })
}

pub(crate) fn missing_fields(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(found) = ctx.locate(&submit_button()).await? else {
            return Ok(StepOutcome::warned("submit button not found"));
        };
        ctx.session().click(&found.element).await?;
        ctx.settle(1000).await;
        let errors = ctx
            .count("[class*=\"error\"], .field-error, [role=\"alert\"]")
            .await?;
        Ok(StepOutcome::passed(format!(
            "empty form submitted, {} error fields shown",
            errors
        )))
    })
}

pub(crate) fn validation_check(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let errors = ctx.count("[class*=\"error\"], [aria-invalid=\"true\"]").await?;
        Ok(StepOutcome::passed(format!("{} error elements found", errors)))
    })
}

pub(crate) fn form_field_count(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let fields = ctx.count("input, textarea, select").await?;
        Ok(StepOutcome::passed(format!("{} form fields", fields)))
    })
}
