//! Page health checks over the current page and the capture log

use super::excerpt;
use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use cdp_adapter::{HttpMethod, Query};
use tracing::{debug, info, warn};
use url::Url;

const MENU_LINKS: &str = "nav a, header a, .menu a";
const MAX_MENU_LINKS: usize = 12;
const MAX_CHECKED_LINKS: usize = 50;

pub(crate) fn check_status(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let expected: u16 = args
            .parse(1)
            .ok_or_else(|| StepError::Assertion(format!("no status code in `{}`", args.line())))?;
        let actual = match ctx.last_response().and_then(|r| r.status) {
            Some(status) => status,
            None => {
                let url = ctx.session().current_url().await?;
                debug!(url = %url, "no recorded navigation status, requesting current url");
                ctx.session().request(HttpMethod::Get, &url, None).await?
            }
        };
        if actual != expected {
            return Err(StepError::StatusMismatch { expected, actual });
        }
        Ok(StepOutcome::passed(format!("status {}", actual)))
    })
}

pub(crate) fn check_loadtime(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let timing = ctx.session().load_timing().await?;
        Ok(StepOutcome::passed(format!(
            "load {} ms, domcontentloaded {} ms",
            timing.load_ms, timing.dom_content_loaded_ms
        )))
    })
}

pub(crate) fn check_console(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let errors = ctx.capture().console_errors();
        if errors.is_empty() {
            return Ok(StepOutcome::passed("no console errors captured"));
        }
        let sample: Vec<String> = errors.iter().take(5).map(|m| excerpt(&m.text, 120)).collect();
        Ok(StepOutcome::warned(format!(
            "{} console errors: {}",
            errors.len(),
            sample.join(" | ")
        )))
    })
}

pub(crate) fn check_missing_resources(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let failed = ctx.capture().failed_resources();
        if failed.is_empty() {
            return Ok(StepOutcome::passed("no missing or errored resources"));
        }
        let sample: Vec<String> = failed
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.status, r.url))
            .collect();
        Ok(StepOutcome::warned(format!(
            "{} missing or errored resources: {}",
            failed.len(),
            sample.join(", ")
        )))
    })
}

/// `href` made absolute against the page URL; only http(s) targets are kept.
fn absolute_href(page: Option<&Url>, href: &str) -> Option<String> {
    let url = match page {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Absolute hrefs of the elements matching `selector`, in document order.
async fn collect_hrefs(ctx: &ExecutionContext, selector: &str) -> Result<Vec<String>, StepError> {
    let session = ctx.session();
    let page = Url::parse(&session.current_url().await?).ok();
    let mut hrefs = Vec::new();
    for element in session.query(&Query::css(selector)).await? {
        if let Some(href) = session.attribute(&element, "href").await? {
            hrefs.push(href);
        }
    }
    Ok(hrefs
        .into_iter()
        .filter_map(|href| {
            if href.trim().is_empty() || href.starts_with("mailto:") {
                None
            } else {
                absolute_href(page.as_ref(), &href)
            }
        })
        .collect())
}

/// `menu_` plus the first four bytes of the href, hex encoded.
pub(crate) fn menu_screenshot_name(href: &str) -> String {
    let hex: String = href.bytes().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("menu_{}.png", hex)
}

async fn visit_menu_link(ctx: &mut ExecutionContext, href: &str) -> Result<(), StepError> {
    ctx.navigate(href).await?;
    let path = ctx.settings().screenshots_dir.join(menu_screenshot_name(href));
    ctx.session().screenshot(&path, true).await?;
    Ok(())
}

pub(crate) fn click_each_menu_item(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let mut hrefs: Vec<String> = Vec::new();
        for href in collect_hrefs(ctx, MENU_LINKS).await? {
            if !hrefs.contains(&href) {
                hrefs.push(href);
            }
        }
        hrefs.truncate(MAX_MENU_LINKS);
        if hrefs.is_empty() {
            return Ok(StepOutcome::warned("no menu links found"));
        }

        let mut failed = Vec::new();
        for href in &hrefs {
            info!(href = %href, "visiting menu link");
            if let Err(err) = visit_menu_link(ctx, href).await {
                warn!(href = %href, "menu visit failed: {}", err);
                failed.push(href.clone());
            }
        }
        if failed.is_empty() {
            Ok(StepOutcome::passed(format!("visited {} menu links", hrefs.len())))
        } else {
            Ok(StepOutcome::warned(format!(
                "{} of {} menu links failed: {}",
                failed.len(),
                hrefs.len(),
                failed.join(", ")
            )))
        }
    })
}

pub(crate) fn check_broken_images(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let images = ctx.session().images().await?;
        let broken: Vec<String> = images
            .iter()
            .filter(|img| img.is_broken())
            .map(|img| img.src.clone())
            .collect();
        if broken.is_empty() {
            return Ok(StepOutcome::passed(format!("{} images loaded", images.len())));
        }
        Ok(StepOutcome::warned(format!(
            "{} broken images: {}",
            broken.len(),
            broken.iter().take(20).cloned().collect::<Vec<_>>().join(", ")
        )))
    })
}

pub(crate) fn check_broken_links(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let mut hrefs = collect_hrefs(ctx, "a[href]").await?;
        hrefs.truncate(MAX_CHECKED_LINKS);
        let mut broken = Vec::new();
        for href in &hrefs {
            match ctx.session().request(HttpMethod::Get, href, None).await {
                Ok(status) if status < 400 => {}
                Ok(status) => broken.push(format!("{} {}", status, href)),
                Err(err) => broken.push(format!("{} ({})", href, err)),
            }
        }
        if broken.is_empty() {
            Ok(StepOutcome::passed(format!("{} links ok", hrefs.len())))
        } else {
            Ok(StepOutcome::warned(format!(
                "{} of {} links broken: {}",
                broken.len(),
                hrefs.len(),
                broken.join(", ")
            )))
        }
    })
}

async fn first_attribute(
    ctx: &ExecutionContext,
    selector: &str,
    name: &str,
) -> Result<Option<String>, StepError> {
    let session = ctx.session();
    match session.query(&Query::css(selector)).await?.first() {
        Some(element) => Ok(session.attribute(element, name).await?),
        None => Ok(None),
    }
}

pub(crate) fn check_favicon_meta(
    ctx: &mut ExecutionContext,
    _args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let favicon = first_attribute(ctx, "link[rel~=\"icon\"]", "href").await?;
        let viewport = first_attribute(ctx, "meta[name=\"viewport\"]", "content").await?;
        let summary = format!(
            "favicon: {}, meta viewport: {}",
            favicon.as_deref().unwrap_or("none"),
            viewport.as_deref().unwrap_or("none")
        );
        if favicon.is_some() && viewport.is_some() {
            Ok(StepOutcome::passed(summary))
        } else {
            Ok(StepOutcome::warned(summary))
        }
    })
}

pub(crate) fn missing_images(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let images = ctx.session().images().await?;
        let missing = images.iter().filter(|img| img.src.trim().len() < 5).count();
        if missing == 0 {
            Ok(StepOutcome::passed(format!("{} images, none without a source", images.len())))
        } else {
            Ok(StepOutcome::warned(format!("{} images without a usable source", missing)))
        }
    })
}

pub(crate) fn page_load_budget(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let budget: f64 = args
            .parse(1)
            .ok_or_else(|| StepError::Assertion(format!("no time budget in `{}`", args.line())))?;
        let timing = ctx.session().load_timing().await?;
        if timing.load_ms <= 0 {
            return Ok(StepOutcome::warned("load timing not available"));
        }
        let seconds = timing.load_ms as f64 / 1000.0;
        let message = format!("page load {:.2}s (budget {}s)", seconds, budget);
        if seconds <= budget {
            Ok(StepOutcome::passed(message))
        } else {
            Ok(StepOutcome::warned(message))
        }
    })
}

pub(crate) fn asset_counts(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let styles = ctx.count("link[rel=\"stylesheet\"]").await?;
        let scripts = ctx.count("script[src]").await?;
        Ok(StepOutcome::passed(format!(
            "{} stylesheets, {} scripts",
            styles, scripts
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_screenshot_names_are_stable() {
        assert_eq!(menu_screenshot_name("https://shop.test/a"), "menu_68747470.png");
        assert_eq!(menu_screenshot_name("ab"), "menu_6162.png");
    }

    #[test]
    fn hrefs_are_made_absolute() {
        let page = Url::parse("https://shop.test/deals/").unwrap();
        assert_eq!(
            absolute_href(Some(&page), "/cart").as_deref(),
            Some("https://shop.test/cart")
        );
        assert_eq!(
            absolute_href(Some(&page), "today").as_deref(),
            Some("https://shop.test/deals/today")
        );
        assert_eq!(absolute_href(Some(&page), "javascript:void(0)"), None);
        assert_eq!(absolute_href(None, "/cart"), None);
    }
}
