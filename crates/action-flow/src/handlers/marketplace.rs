//! Marketplace browsing and cart workflows

use super::{any_of, click_optional, excerpt, first_text, named_button};
use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::{Query, TextMatch};
use tracing::{info, warn};

const ITEM_CARDS: &str = ".product-item, [class*=\"item\"], .card, [role=\"article\"]";
const BROWSE_CARDS: &str = ".product-item, [class*=\"item\"], .card";
const MAX_BROWSED_ITEMS: usize = 3;
const CAROUSELS: &[&str] = &["[class*=\"carousel\"]", "[class*=\"slider\"]", ".swiper", ".gallery"];

/// `selector` applied inside every carousel container.
fn within_carousels(selector: &str) -> String {
    CAROUSELS
        .iter()
        .map(|container| format!("{} {}", container, selector))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn search_for(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let query = args.text(1);
        let chain = FallbackChain::new("search input")
            .css("input[name=\"search\"], input[placeholder=\"Search items...\"]")
            .placeholder(TextMatch::contains("search items"))
            .fallback("input[type=\"text\"]");
        let found = ctx.require(&chain).await?;
        ctx.session().fill(&found.element, query).await?;
        ctx.session().press(&found.element, "Enter").await?;
        ctx.settle(2000).await;
        Ok(StepOutcome::passed(format!("searched for \"{}\"", query)))
    })
}

pub(crate) fn click_first_item(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let found = ctx
            .require(&FallbackChain::new("marketplace item").css(ITEM_CARDS))
            .await?;
        ctx.session().click(&found.element).await?;
        ctx.settle(2000).await;
        Ok(StepOutcome::passed("opened first item"))
    })
}

pub(crate) fn click_item_image(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let found = ctx
            .require(&FallbackChain::new("item image").fallback("img"))
            .await?;
        ctx.session().click(&found.element).await?;
        ctx.settle(1000).await;
        Ok(StepOutcome::passed("clicked item image"))
    })
}

pub(crate) fn add_to_cart(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("add to cart button")
            .role("button", any_of(&["add to cart", "add cart", "cart", "add"]))
            .css_with_text(
                "button:not([class*=\"mobile\"]), [role=\"button\"]:not([class*=\"mobile\"]), a",
                any_of(&["add", "cart"]),
            )
            .css_with_text("button", any_of(&["add", "cart"]));
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("add to cart button not found, skipped"));
        };
        if let Err(err) = ctx.session().click(&found.element).await {
            warn!("add to cart click failed: {}", err);
            return Ok(StepOutcome::warned(format!("could not click add to cart: {}", err)));
        }
        ctx.settle(1500).await;
        Ok(StepOutcome::passed("added item to cart"))
    })
}

pub(crate) fn proceed_to_checkout(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let names = ["checkout", "purchase", "proceed", "buy"];
        let chain = FallbackChain::new("checkout button")
            .role("button", any_of(&names))
            .css_with_text(
                "button:not([class*=\"mobile\"]), a, [role=\"button\"]",
                any_of(&names),
            );
        if let Some(found) = ctx.locate(&chain).await? {
            ctx.session().click(&found.element).await?;
            ctx.settle(2000).await;
            return Ok(StepOutcome::passed("proceeded to checkout"));
        }
        let cart = ctx.settings().test_data.paths.cart.clone();
        ctx.navigate(&cart).await?;
        Ok(StepOutcome::warned(format!(
            "checkout button not found, navigated to {}",
            cart
        )))
    })
}

pub(crate) fn complete_purchase(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let names = ["complete", "pay", "purchase", "submit", "confirm", "checkout"];
        let chain = FallbackChain::new("complete purchase button")
            .role("button", any_of(&names))
            .css_with_text(
                "button:not([class*=\"mobile\"]), a, [role=\"button\"]",
                any_of(&names),
            )
            .fallback("button:not([class*=\"mobile\"])");
        click_optional(ctx, chain, 2000, "completed purchase").await
    })
}

async fn view_item(ctx: &ExecutionContext, index: usize) -> Result<(), StepError> {
    let session = ctx.session();
    let items = session.query(&Query::css(BROWSE_CARDS)).await?;
    let item = items
        .get(index)
        .ok_or_else(|| StepError::RequiredElementMissing(format!("item {}", index + 1)))?;
    session.click(item).await?;
    ctx.settle(1000).await;
    session.go_back().await?;
    ctx.settle(1000).await;
    Ok(())
}

pub(crate) fn iterate_items(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let total = ctx.count(BROWSE_CARDS).await?;
        info!(total, "marketplace items found");
        let wanted = total.min(MAX_BROWSED_ITEMS);
        let mut viewed = 0;
        for index in 0..wanted {
            match view_item(ctx, index).await {
                Ok(()) => viewed += 1,
                Err(err) => warn!(item = index + 1, "could not view item: {}", err),
            }
        }
        if viewed == wanted {
            Ok(StepOutcome::passed(format!("viewed {} of {} items", viewed, total)))
        } else {
            Ok(StepOutcome::warned(format!(
                "viewed {} of {} items ({} failed)",
                viewed,
                total,
                wanted - viewed
            )))
        }
    })
}

pub(crate) fn apply_price_filter(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("price filter input")
            .css("input[type=\"range\"], input[name*=\"price\"]")
            .fallback("[class*=\"price\"] input");
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("price filter input not found"));
        };
        let value = ctx.settings().test_data.price_filter.clone();
        ctx.session().fill(&found.element, &value).await?;
        ctx.settle(1000).await;
        Ok(StepOutcome::passed(format!("applied price filter {}", value)))
    })
}

pub(crate) fn sort_items(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("sort control")
            .role("button", TextMatch::contains("sort"))
            .css("select, [class*=\"sort\"]");
        click_optional(ctx, chain, 1000, "clicked sort control").await
    })
}

pub(crate) fn remove_from_cart(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = named_button("remove button", &["remove", "delete"]);
        click_optional(ctx, chain, 1000, "removed item from cart").await
    })
}

pub(crate) fn image_carousel(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        if ctx.count(&CAROUSELS.join(", ")).await? == 0 {
            return Ok(StepOutcome::warned("image carousel not found"));
        }
        let images = ctx.count(&within_carousels("img")).await?;
        let next = FallbackChain::new("carousel next control")
            .css(&within_carousels("[class*=\"next\"]"))
            .css_with_text(&within_carousels("button"), TextMatch::contains("next"));
        match ctx.locate(&next).await? {
            Some(found) => {
                ctx.session().click(&found.element).await?;
                ctx.settle(500).await;
                Ok(StepOutcome::passed(format!(
                    "carousel with {} images advanced",
                    images
                )))
            }
            None => Ok(StepOutcome::passed(format!(
                "carousel with {} images, no next control",
                images
            ))),
        }
    })
}

pub(crate) fn seller_info(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("seller info")
            .css("[class*=\"seller\"], [class*=\"vendor\"], [class*=\"author\"]");
        match first_text(ctx, &chain).await? {
            Some(text) => Ok(StepOutcome::passed(format!("seller info: {}", excerpt(&text, 50)))),
            None => Ok(StepOutcome::warned("seller info section not found")),
        }
    })
}

pub(crate) fn description_load(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("description")
            .css("[class*=\"description\"], [class*=\"details\"], p");
        match first_text(ctx, &chain).await? {
            Some(text) if text.trim().chars().count() > 10 => Ok(StepOutcome::passed(format!(
                "description loaded ({} chars)",
                text.trim().chars().count()
            ))),
            Some(_) => Ok(StepOutcome::warned("description text too short")),
            None => Ok(StepOutcome::warned("description element not found")),
        }
    })
}

pub(crate) fn add_same_item_twice(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("add to cart button")
            .css_with_text("button", TextMatch::contains("add to cart"));
        let Some(found) = ctx.locate(&chain).await? else {
            return Ok(StepOutcome::warned("add to cart button not found"));
        };
        for _ in 0..2 {
            ctx.session().click(&found.element).await?;
            ctx.settle(800).await;
        }
        Ok(StepOutcome::passed("added same item twice"))
    })
}
