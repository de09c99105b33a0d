//! Step handlers, grouped by workflow.
//!
//! Every handler has the [`crate::table::HandlerFn`] shape. Optional UI elements that
//! cannot be found produce a warned outcome; `Err` is reserved for hard failures.

pub(crate) mod auth;
pub(crate) mod checks;
pub(crate) mod community;
pub(crate) mod forms;
pub(crate) mod interaction;
pub(crate) mod listings;
pub(crate) mod marketplace;
pub(crate) mod navigation;
pub(crate) mod probes;

use crate::{context::ExecutionContext, errors::StepError, types::StepOutcome};
use action_locator::FallbackChain;
use cdp_adapter::TextMatch;

/// Clickable things that are not necessarily `<button>`s.
pub(crate) const BUTTONISH: &str = "button, [role=\"button\"]";

pub(crate) fn any_of(needles: &[&str]) -> TextMatch {
    TextMatch::any_of(needles.iter().copied())
}

/// Role button by name, then any button-like element carrying the text.
pub(crate) fn named_button(target: &str, names: &[&str]) -> FallbackChain {
    FallbackChain::new(target)
        .role("button", any_of(names))
        .css_with_text(BUTTONISH, any_of(names))
}

/// Clicks whatever `chain` resolves to and settles; an empty chain is a soft failure.
pub(crate) async fn click_optional(
    ctx: &ExecutionContext,
    chain: FallbackChain,
    settle_ms: u64,
    done: &str,
) -> Result<StepOutcome, StepError> {
    match ctx.locate(&chain).await? {
        Some(found) => {
            ctx.session().click(&found.element).await?;
            ctx.settle(settle_ms).await;
            Ok(StepOutcome::passed(done))
        }
        None => Ok(StepOutcome::warned(format!("{} not found", chain.target()))),
    }
}

/// Text of the first element `chain` resolves to.
pub(crate) async fn first_text(
    ctx: &ExecutionContext,
    chain: &FallbackChain,
) -> Result<Option<String>, StepError> {
    match ctx.locate(chain).await? {
        Some(found) => Ok(Some(ctx.session().text(&found.element).await?)),
        None => Ok(None),
    }
}

/// First `max` characters of `text` with whitespace runs collapsed.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max)
        .collect()
}
