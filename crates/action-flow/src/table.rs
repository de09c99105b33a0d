//! Ordered command table
//!
//! Matchers are scanned linearly and the first one whose pattern matches the whole
//! canonical line wins. Overlapping patterns are allowed; the earlier registration
//! shadows the later one.

use crate::{context::ExecutionContext, errors::StepError, handlers::*, types::StepOutcome};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

pub type HandlerFuture<'a> = BoxFuture<'a, Result<StepOutcome, StepError>>;

/// Step handler: borrows the context for the duration of one step.
pub type HandlerFn = for<'a> fn(&'a mut ExecutionContext, CommandArgs) -> HandlerFuture<'a>;

/// What happens when a matcher fires.
#[derive(Clone, Copy)]
pub enum CommandAction {
    Handler(HandlerFn),
    /// Recognized but outside browser scope; logged as acknowledged.
    Note { category: &'static str },
    /// Outline heading; logged, no browser action.
    Section,
}

impl fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandAction::Handler(_) => f.write_str("Handler"),
            CommandAction::Note { category } => f.debug_struct("Note").field("category", category).finish(),
            CommandAction::Section => f.write_str("Section"),
        }
    }
}

/// Captures of a matched line. Group 0 is the whole line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    line: String,
    groups: Vec<Option<String>>,
}

impl CommandArgs {
    pub fn line(&self) -> &str {
        &self.line
    }

    /// The n-th capture, if it participated and is non-empty.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups
            .get(index)
            .and_then(|g| g.as_deref())
            .filter(|g| !g.is_empty())
    }

    /// The n-th capture or "".
    pub fn text(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }

    pub fn parse<T: FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|g| g.parse().ok())
    }
}

#[derive(Clone)]
pub struct CommandMatcher {
    name: &'static str,
    pattern: Regex,
    action: CommandAction,
}

impl CommandMatcher {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn action(&self) -> CommandAction {
        self.action
    }

    fn capture(&self, line: &str) -> Option<CommandArgs> {
        let caps = self.pattern.captures(line)?;
        Some(CommandArgs {
            line: line.to_string(),
            groups: caps
                .iter()
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }
}

impl fmt::Debug for CommandMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMatcher")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("action", &self.action)
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandTable {
    matchers: Vec<CommandMatcher>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in command set, in dispatch order.
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Appends a matcher. Patterns are case-insensitive.
    pub fn register(
        mut self,
        name: &'static str,
        pattern: &str,
        action: CommandAction,
    ) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("(?i){}", pattern))?;
        self.matchers.push(CommandMatcher {
            name,
            pattern,
            action,
        });
        Ok(self)
    }

    pub fn matchers(&self) -> &[CommandMatcher] {
        &self.matchers
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// First matcher for `line`, with its captures.
    pub fn find(&self, line: &str) -> Option<(&CommandMatcher, CommandArgs)> {
        self.matchers
            .iter()
            .find_map(|matcher| matcher.capture(line).map(|args| (matcher, args)))
    }

    pub fn is_known(&self, line: &str) -> bool {
        self.matchers.iter().any(|m| m.pattern.is_match(line))
    }
}

static STANDARD: Lazy<CommandTable> = Lazy::new(|| {
    STANDARD_COMMANDS
        .iter()
        .try_fold(CommandTable::new(), |table, &(name, pattern, action)| {
            table.register(name, pattern, action)
        })
        .expect("standard command patterns compile")
});

use CommandAction::{Handler, Note, Section};

const STANDARD_COMMANDS: &[(&str, &str, CommandAction)] = &[
    ("open homepage", r"^open homepage$", Handler(navigation::open_homepage)),
    ("open", r"^open\s+(https?://\S+|/\S*)$", Handler(navigation::open)),
    ("check status", r"^check status\s+(\d{3})$", Handler(checks::check_status)),
    ("check loadtime", r"^check loadtime$", Handler(checks::check_loadtime)),
    ("check console", r"^check console$", Handler(checks::check_console)),
    ("check missing-resources", r"^check missing-resources$", Handler(checks::check_missing_resources)),
    ("click each menu item", r"^click each menu item$", Handler(checks::click_each_menu_item)),
    ("check broken-images", r"^check broken-images$", Handler(checks::check_broken_images)),
    ("check broken-links", r"^check broken-links$", Handler(checks::check_broken_links)),
    ("check favicon-meta", r"^check favicon-meta$", Handler(checks::check_favicon_meta)),
    ("click", r#"^click\s+"(.+)"$"#, Handler(interaction::click_text)),
    ("click button", r#"^click button\s+"(.+)"$"#, Handler(interaction::click_button)),
    ("click button containing", r#"^click button containing\s+"(.+)"$"#, Handler(interaction::click_button_containing)),
    ("click link", r#"^click link\s+"(.+)"$"#, Handler(interaction::click_link)),
    ("type into", r#"^type\s+"(.+)"\s+into\s+"(.+)"$"#, Handler(interaction::type_into)),
    ("fill with", r#"^fill\s+"(.+)"\s+with\s+"(.+)"$"#, Handler(interaction::fill_with)),
    ("expect page to contain", r#"^expect page to contain\s+"(.+)"$"#, Handler(interaction::expect_page_contains)),
    ("expect url contains", r#"^expect url contains\s+"(.+)"$"#, Handler(interaction::expect_url_contains)),
    ("wait for", r#"^wait for\s+"(.+)"$"#, Handler(interaction::wait_for_text)),
    ("wait", r"^wait\s+(\d+)$", Handler(interaction::wait_ms)),
    ("screenshot", r#"^screenshot\s+"(.+)"$"#, Handler(interaction::screenshot)),
    ("enter phone", r"^enter phone(?:\s+(\d+))?$", Handler(auth::enter_phone)),
    ("enter phone with country code", r"^enter phone with country code(?:\s+(\d+))?(?:\s+(\d+))?$", Handler(auth::enter_phone_with_country_code)),
    ("login", r"^(?:default )?login(?: with default credentials)?$", Handler(auth::login)),
    ("enter otp", r"^enter otp(?:\s+(\d+))?$", Handler(auth::enter_otp)),
    ("search for", r#"^search\s+for\s+"(.+)"$"#, Handler(marketplace::search_for)),
    ("click on first item", r"^click on first item$", Handler(marketplace::click_first_item)),
    ("click on item image", r"^click on item image$", Handler(marketplace::click_item_image)),
    ("add to cart", r"^add to cart$", Handler(marketplace::add_to_cart)),
    ("proceed to checkout", r"^proceed to checkout$", Handler(marketplace::proceed_to_checkout)),
    ("complete purchase", r"^complete purchase$", Handler(marketplace::complete_purchase)),
    ("iterate through items", r"^iterate through items$", Handler(marketplace::iterate_items)),
    ("apply price filter", r"^apply price filter$", Handler(marketplace::apply_price_filter)),
    ("sort items", r"^sort items$", Handler(marketplace::sort_items)),
    ("remove from cart", r"^remove from cart$", Handler(marketplace::remove_from_cart)),
    ("go to cart page", r"^go to cart page$", Handler(navigation::go_to_cart)),
    ("submit form", r"^submit (?:empty )?form$", Handler(forms::submit_form)),
    ("validate success", r"^validate success.*$", Handler(forms::validate_success)),
    ("create listing", r"^create listing.*$", Handler(navigation::create_listing)),
    ("upload images", r"^upload images$", Handler(listings::upload_images)),
    ("enter details", r"^enter details$", Handler(listings::enter_details)),
    ("submit listing", r"^submit listing$", Handler(listings::submit_listing)),
    ("validate listing appears", r"^validate listing appears$", Handler(listings::validate_listing_appears)),
    ("click notify group", r"^click notify group$", Handler(community::click_notify_group)),
    ("load vendor list", r"^load vendor list$", Handler(navigation::load_vendor_list)),
    ("open a vendor", r"^open a vendor$", Handler(community::open_vendor)),
    ("submit comment", r"^submit comment$", Handler(community::submit_comment)),
    ("image carousel test", r"^image carousel test$", Handler(marketplace::image_carousel)),
    ("seller info test", r"^seller info test$", Handler(marketplace::seller_info)),
    ("description load", r"^description load$", Handler(marketplace::description_load)),
    ("add same item twice", r"^add same item twice$", Handler(marketplace::add_same_item_twice)),
    (
        "section marker",
        r"^(listings|cart testing|edge cases|phase \d+|my listings testing|edit/delete listing|notify group|contact us|bug report form|api testing|performance testing|cross-browser testing|device testing|security testing|post deployment testing)[:–]?$",
        Section,
    ),
    ("negative price", r"^negative price$", Handler(listings::negative_price)),
    ("missing images", r"^missing images$", Handler(checks::missing_images)),
    ("non-existent product url", r"^non-existent product url$", Handler(probes::missing_product)),
    ("ai description", r"^ai description$", Handler(listings::ai_description)),
    ("edit listing", r"^edit listing$", Handler(listings::edit_listing)),
    ("save changes", r"^save changes$", Handler(listings::save_changes)),
    ("delete listing", r"^delete listing$", Handler(listings::delete_listing)),
    ("confirm popup", r"^confirm popup$", Handler(listings::confirm_popup)),
    ("load groups list", r"^load groups list$", Handler(navigation::load_groups_list)),
    ("join/leave group", r"^join/leave group$", Handler(community::join_leave_group)),
    ("post listing in group", r"^post listing in group$", Handler(community::post_listing_in_group)),
    ("validate feed", r"^validate feed$", Handler(community::validate_feed)),
    ("pagination check", r"^pagination check$", Handler(community::pagination_check)),
    ("validate moderation", r"^validate moderation$", Handler(community::validate_moderation)),
    ("delete/edit comment", r"^delete/edit comment$", Handler(community::open_comment_menu)),
    ("submit invalid email", r"^submit invalid email$", Handler(forms::submit_invalid_email)),
    ("successful submission", r"^successful submission$", Handler(forms::successful_submission)),
    ("missing fields", r"^missing fields$", Handler(forms::missing_fields)),
    ("validation check", r"^validation check$", Handler(forms::validation_check)),
    ("otp generation", r"^otp generation$", Handler(auth::otp_generation)),
    ("otp verify", r"^otp verify$", Handler(auth::otp_verify)),
    ("listing creation", r"^listing creation$", Handler(probes::listing_creation)),
    ("marketplace search", r"^marketplace search$", Handler(probes::marketplace_search)),
    ("vendor comments", r"^vendor comments$", Handler(probes::vendor_comments)),
    ("upload service", r"^upload service$", Note { category: "upload service" }),
    ("groups api", r"^groups api$", Handler(probes::groups_api)),
    ("user profile api", r"^user profile api$", Handler(probes::user_profile_api)),
    ("http status", r"^http (\d{3})$", Note { category: "http status check" }),
    ("page load budget", r"^page load < ([\d.]+) seconds$", Handler(checks::page_load_budget)),
    ("lighthouse score", r"^lighthouse score$", Note { category: "lighthouse audit" }),
    ("build optimization", r"^(optimize images|minify css|minify js|check caching)$", Note { category: "build analysis" }),
    ("api latency check", r"^api latency check$", Handler(probes::api_latency)),
    ("browser or device", r"^(chrome|firefox|safari|edge|iphone|android|ipad|laptop|desktop)$", Handler(probes::browser_device)),
    (
        "visual check",
        r"^(layout differences|font issues|button alignment|animations|responsive grids|touch interactions|navigation menu)$",
        Note { category: "visual regression" },
    ),
    (
        "security check",
        r"^(sql injection checks|xss injection checks|csrf protection|session expiration|brute-force otp attempts|exposed endpoints|open redirect issues)$",
        Note { category: "security scanning" },
    ),
    (
        "post-deployment check",
        r"^(uptime monitoring|cloudwatch error logs|otp error rate|ecs task stability|cdn cache behavior|storage testing on aws efs|run nightly automated tests)$",
        Note { category: "infrastructure monitoring" },
    ),
    ("phase heading", r"^phase \d+[\s–:-].*$", Section),
    ("section header", r"^(test endpoints|check|devices)[:–]?$", Section),
    ("400 errors", r"^400 errors$", Handler(probes::invalid_endpoint)),
    ("500 errors", r"^500 errors$", Note { category: "backend error scenario" }),
    ("response times", r"^response times$", Handler(probes::api_latency)),
    ("minify css/js", r"^minify css/js$", Handler(checks::asset_counts)),
    ("iphone 14/15", r"^iphone 14/15$", Handler(probes::browser_device)),
    ("android phones", r"^android phones$", Handler(probes::browser_device)),
    ("laptop + desktop monitors", r"^laptop \+ desktop monitors$", Handler(probes::desktop_viewport)),
    ("form validation", r"^form validation$", Handler(forms::form_field_count)),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn section_table() -> CommandTable {
        CommandTable::new()
            .register("first", r"^check (.+)$", Section)
            .unwrap()
            .register("second", r"^check console$", Note { category: "x" })
            .unwrap()
    }

    #[test]
    fn standard_table_compiles_in_order() {
        let table = CommandTable::standard();
        assert!(table.len() > 90);
        assert_eq!(table.matchers()[0].name(), "open homepage");
        assert_eq!(table.matchers().last().map(|m| m.name()), Some("form validation"));
    }

    #[test]
    fn earlier_registration_shadows_later() {
        let table = section_table();
        let (matcher, args) = table.find("check console").unwrap();
        assert_eq!(matcher.name(), "first");
        assert_eq!(args.get(1), Some("console"));
    }

    #[test]
    fn captures_keep_case_and_optional_groups() {
        let table = CommandTable::standard();
        let (matcher, args) = table.find("Click \"Get OTP\"").unwrap();
        assert_eq!(matcher.name(), "click");
        assert_eq!(args.text(1), "Get OTP");

        let (matcher, args) = table.find("enter otp").unwrap();
        assert_eq!(matcher.name(), "enter otp");
        assert_eq!(args.get(1), None);
        assert_eq!(args.text(1), "");

        let (_, args) = table.find("check status 404").unwrap();
        assert_eq!(args.parse::<u16>(1), Some(404));
    }

    #[test]
    fn open_only_takes_urls_and_rooted_paths() {
        let table = CommandTable::standard();
        assert_eq!(table.find("open /login").unwrap().0.name(), "open");
        assert_eq!(table.find("open https://shop.test/x").unwrap().0.name(), "open");
        assert_eq!(table.find("open a vendor").unwrap().0.name(), "open a vendor");
        assert!(table.find("open sesame").is_none());
    }

    #[test]
    fn routing_of_representative_lines() {
        let table = CommandTable::standard();
        let cases = [
            ("click button \"Save\"", "click button"),
            ("click button containing \"Sav\"", "click button containing"),
            ("enter phone with country code 91 5550100", "enter phone with country code"),
            ("default login", "login"),
            ("login with default credentials", "login"),
            ("validate success message", "validate success"),
            ("Phase 3: Login", "phase heading"),
            ("phase 2", "section marker"),
            ("Cart testing:", "section marker"),
            ("400 errors", "400 errors"),
            ("http 500", "http status"),
            ("page load < 2.5 seconds", "page load budget"),
            ("iPhone 14/15", "iphone 14/15"),
            ("CloudWatch error logs", "post-deployment check"),
            ("check", "section header"),
        ];
        for (line, expected) in cases {
            let found = table.find(line).map(|(m, _)| m.name());
            assert_eq!(found, Some(expected), "line {:?}", line);
        }
        assert!(!table.is_known("loginx"));
        assert!(!table.is_known("do a barrel roll"));
    }
}
