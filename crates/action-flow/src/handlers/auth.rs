//! Phone and OTP login flows
//!
//! Phone numbers, country codes and OTPs come from the step line when present and
//! otherwise from the injected credentials. Neither source means a hard failure.

use super::{any_of, click_optional};
use crate::{
    context::ExecutionContext,
    errors::StepError,
    table::{CommandArgs, HandlerFuture},
    types::StepOutcome,
};
use action_locator::FallbackChain;
use cdp_adapter::TextMatch;
use tracing::debug;

const PHONE_HINTS: &[&str] = &["phone", "mobile", "number", "digit"];
const OTP_HINTS: &[&str] = &["otp", "code", "verification"];

fn value_or_configured(
    from_line: Option<&str>,
    configured: &Option<String>,
    what: &str,
) -> Result<String, StepError> {
    from_line
        .map(str::to_string)
        .or_else(|| configured.clone())
        .ok_or_else(|| {
            StepError::MissingConfiguration(format!(
                "no {} in the step and none configured",
                what
            ))
        })
}

pub(crate) fn otp_chain() -> FallbackChain {
    FallbackChain::new("otp input")
        .placeholder(any_of(OTP_HINTS))
        .label(any_of(OTP_HINTS))
        .css("input[type=\"text\"][name*=\"otp\"], input[name*=\"code\"]")
        .nth("input[type=\"text\"]", 1, 2)
}

pub(crate) fn enter_phone(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let phone = value_or_configured(args.get(1), &ctx.settings().credentials.phone, "phone")?;
        let chain = FallbackChain::new("phone input")
            .placeholder(any_of(PHONE_HINTS))
            .label(any_of(PHONE_HINTS))
            .css("input[type=\"tel\"]")
            .fallback("input[type=\"text\"]")
            .fallback("input");
        let found = ctx.require(&chain).await?;
        ctx.session().fill(&found.element, &phone).await?;
        Ok(StepOutcome::passed(format!("entered phone {}", phone)))
    })
}

pub(crate) fn enter_phone_with_country_code(
    ctx: &mut ExecutionContext,
    args: CommandArgs,
) -> HandlerFuture<'_> {
    Box::pin(async move {
        let credentials = &ctx.settings().credentials;
        let code = value_or_configured(args.get(1), &credentials.country_code, "country code")?;
        let phone = value_or_configured(args.get(2), &credentials.phone, "phone")?;

        let selector = FallbackChain::new("country selector").css(
            "select[name*=\"country\"], button[id*=\"country\"], input[placeholder*=\"country\" i]",
        );
        if let Some(found) = ctx.locate(&selector).await? {
            ctx.session().click(&found.element).await?;
            ctx.settle(500).await;
            let option = FallbackChain::new(format!("country option {}", code))
                .css_with_text("option", TextMatch::contains(code.as_str()));
            if let Some(option) = ctx.locate(&option).await? {
                ctx.session().click(&option.element).await?;
                debug!(code = %code, "selected country code");
            }
        }

        let chain = FallbackChain::new("phone input")
            .css("input#phone")
            .css("input[type=\"tel\"]")
            .placeholder(any_of(&["phone", "mobile", "number"]))
            .fallback("input[type=\"text\"]");
        match ctx.locate(&chain).await? {
            Some(found) => {
                ctx.session().fill(&found.element, &phone).await?;
                Ok(StepOutcome::passed(format!("entered phone +{} {}", code, phone)))
            }
            None => Ok(StepOutcome::warned("phone input not found")),
        }
    })
}

pub(crate) fn login(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let credentials = ctx.settings().credentials.clone();
        let phone = value_or_configured(None, &credentials.phone, "phone")?;

        if let Some(code) = credentials.country_code.as_deref() {
            let country = FallbackChain::new("country code input")
                .css("input[placeholder*=\"code\" i], select[name*=\"country\"]");
            if let Some(found) = ctx.locate(&country).await? {
                if found.element.tag == "input" {
                    ctx.session().fill(&found.element, code).await?;
                    debug!(code, "entered country code");
                }
            }
        }

        ctx.settle(300).await;
        let chain = FallbackChain::new("phone input")
            .placeholder(any_of(PHONE_HINTS))
            .css("input[type=\"tel\"]")
            .fallback("input[type=\"text\"]");
        match ctx.locate(&chain).await? {
            Some(found) => {
                ctx.session().fill(&found.element, &phone).await?;
                Ok(StepOutcome::passed(format!("logged in with phone {}", phone)))
            }
            None => Ok(StepOutcome::warned("phone input not found")),
        }
    })
}

pub(crate) fn enter_otp(ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let otp = value_or_configured(args.get(1), &ctx.settings().credentials.otp, "otp")?;
        let found = ctx.require(&otp_chain()).await?;
        ctx.session().fill(&found.element, &otp).await?;
        Ok(StepOutcome::passed(format!(
            "entered otp via {}",
            found.tier.name()
        )))
    })
}

pub(crate) fn otp_generation(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let chain = FallbackChain::new("otp generation button")
            .css_with_text("button", any_of(&["send otp", "generate otp"]));
        click_optional(ctx, chain, 2000, "otp generation triggered").await
    })
}

pub(crate) fn otp_verify(ctx: &mut ExecutionContext, _args: CommandArgs) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(otp) = ctx.settings().credentials.otp.clone() else {
            return Ok(StepOutcome::warned("no otp configured, verification skipped"));
        };
        let input = FallbackChain::new("otp input").css("input[placeholder*=\"OTP\"], input[name*=\"otp\"]");
        let Some(found) = ctx.locate(&input).await? else {
            return Ok(StepOutcome::warned("otp input not found"));
        };
        ctx.session().fill(&found.element, &otp).await?;
        let verify = FallbackChain::new("verify button")
            .css_with_text("button", any_of(&["verify", "confirm"]));
        click_optional(ctx, verify, 1000, "otp verification attempted").await
    })
}
