//! Generic interactions addressed by visible text

use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::{AdapterErrorKind, Query, TextMatch};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const URL_ASSERT_TIMEOUT: Duration = Duration::from_secs(5);
const URL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Button by role, then link by role, then button-ish class names, then any text.
pub(crate) fn clickable_text_chain(text: &str) -> FallbackChain {
    let name = TextMatch::contains(text);
    FallbackChain::new(format!("clickable \"{}\"", text))
        .role("button", name.clone())
        .role("link", name.clone())
        .css_with_text(
            "[class*=\"btn\"], [class*=\"button\"], [role=\"button\"]",
            name.clone(),
        )
        .text(name)
}

/// Placeholder, then label, then the first input or textarea.
pub(crate) fn field_chain(field: &str) -> FallbackChain {
    FallbackChain::new(format!("field \"{}\"", field))
        .placeholder(TextMatch::contains(field))
        .label(TextMatch::contains(field))
        .fallback("input, textarea")
}

/// `<name>.png` with whitespace runs replaced by `_`, lowercased.
pub(crate) fn screenshot_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out.push_str(".png");
    out
}

async fn click_required(
    ctx: &ExecutionContext,
    chain: FallbackChain,
) -> Result<StepOutcome, StepError> {
    let found = ctx.require(&chain).await?;
    ctx.session().click(&found.element).await?;
    Ok(StepOutcome::passed(format!(
        "clicked {} via {}",
        chain.target(),
        found.tier.name()
    )))
}

async fn fill_field(
    ctx: &ExecutionContext,
    field: &str,
    value: &str,
) -> Result<StepOutcome, StepError> {
    let chain = field_chain(field);
    let found = ctx.require(&chain).await?;
    ctx.session().fill(&found.element, value).await?;
    Ok(StepOutcome::passed(format!(
        "filled {} via {}",
        chain.target(),
        found.tier.name()
    )))
}

pub(crate) fn click_text(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move { click_required(ctx, clickable_text_chain(args.text(1))).await })
}

pub(crate) fn click_button(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = args.text(1);
        let chain = FallbackChain::new(format!("button \"{}\"", text))
            .role("button", TextMatch::contains(text));
        click_required(ctx, chain).await
    })
}

pub(crate) fn click_button_containing(
    ctx: &mut ExecutionContext,
    args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = args.text(1);
        let chain = FallbackChain::new(format!("button containing \"{}\"", text))
            .css_with_text("button", TextMatch::contains(text))
            .role("button", TextMatch::contains(text));
        super::click_optional(ctx, chain, 0, &format!("clicked button containing \"{}\"", text))
            .await
    })
}

pub(crate) fn click_link(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = args.text(1);
        let chain = FallbackChain::new(format!("link \"{}\"", text))
            .role("link", TextMatch::contains(text));
        click_required(ctx, chain).await
    })
}

pub(crate) fn type_into(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move { fill_field(ctx, args.text(2), args.text(1)).await })
}

pub(crate) fn fill_with(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move { fill_field(ctx, args.text(1), args.text(2)).await })
}

pub(crate) fn expect_page_contains(
    ctx: &mut ExecutionContext,
    args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = args.text(1);
        let found = ctx
            .session()
            .query(&Query::Text(TextMatch::contains(text)))
            .await?
            .len();
        if found > 0 {
            Ok(StepOutcome::passed(format!(
                "found \"{}\" ({} occurrences)",
                text, found
            )))
        } else {
            Ok(StepOutcome::warned(format!("text not found on page: \"{}\"", text)))
        }
    })
}

pub(crate) fn expect_url_contains(
    ctx: &mut ExecutionContext,
    args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let fragment = args.text(1);
        let deadline = Instant::now() + URL_ASSERT_TIMEOUT;
        loop {
            let url = ctx.session().current_url().await?;
            if url.contains(fragment) {
                return Ok(StepOutcome::passed(format!("url {} contains \"{}\"", url, fragment)));
            }
            if Instant::now() >= deadline {
                return Err(StepError::Assertion(format!(
                    "url {} does not contain \"{}\"",
                    url, fragment
                )));
            }
            sleep(URL_POLL_INTERVAL).await;
        }
    })
}

pub(crate) fn wait_for_text(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = args.text(1);
        let timeout = Duration::from_millis(ctx.settings().timeouts.wait_for_ms);
        ctx.session()
            .wait_for(&Query::Text(TextMatch::contains(text)), timeout)
            .await
            .map_err(|err| match err.kind {
                AdapterErrorKind::ActionTimeout => StepError::Timeout(format!(
                    "\"{}\" did not appear within {} ms",
                    text,
                    timeout.as_millis()
                )),
                _ => StepError::Browser(err),
            })?;
        Ok(StepOutcome::passed(format!("\"{}\" appeared", text)))
    })
}

pub(crate) fn wait_ms(_ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let ms: u64 = args
            .parse(1)
            .ok_or_else(|| StepError::Assertion(format!("wait out of range in `{}`", args.line())))?;
        sleep(Duration::from_millis(ms)).await;
        Ok(StepOutcome::passed(format!("waited {} ms", ms)))
    })
}

pub(crate) fn screenshot(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = ctx
            .settings()
            .screenshots_dir
            .join(screenshot_file_name(args.text(1)));
        ctx.session().screenshot(&path, true).await?;
        Ok(StepOutcome::passed(format!("saved {}", path.display())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_names() {
        assert_eq!(screenshot_file_name("Full Page"), "full_page.png");
        assert_eq!(screenshot_file_name("cart  after\tadd"), "cart_after_add.png");
        assert_eq!(screenshot_file_name("full_page"), "full_page.png");
    }

    #[test]
    fn chains_have_expected_depth() {
        assert_eq!(clickable_text_chain("Go").len(), 4);
        assert_eq!(field_chain("Email").len(), 3);
    }
}
