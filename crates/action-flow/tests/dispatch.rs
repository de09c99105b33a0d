use action_flow::{
    CommandAction, CommandArgs, CommandTable, CoverageReport, Dispatcher, ExecutionContext,
    HandlerFuture, RunSettings, StepOutcome, StepStatus,
};
use cdp_adapter::{BrowserSession, InMemorySession, Interaction, MemoryElement, MemoryPage};
use std::sync::Arc;
use step_script::{load, PhraseNormalizer, RunOptions, StepSource};
use url::Url;

const HOME: &str = "https://shop.test/";

fn settings() -> RunSettings {
    RunSettings::default()
        .with_base_url(Url::parse(HOME).unwrap())
        .with_pacing_scale(0.0)
}

fn dispatcher(session: &Arc<InMemorySession>, settings: RunSettings) -> Dispatcher {
    let session: Arc<dyn BrowserSession> = session.clone();
    Dispatcher::new(CommandTable::standard(), ExecutionContext::new(session, settings))
}

fn lines(text: &str) -> Vec<step_script::CanonicalLine> {
    let source = StepSource::from_text("steps.txt", text);
    load(&source, &PhraseNormalizer::standard(), &RunOptions::default())
}

fn otp_page() -> MemoryPage {
    MemoryPage::new()
        .element(MemoryElement::new("input").attr("type", "text").attr("placeholder", "Enter OTP"))
        .element(MemoryElement::new("button").text("Verify"))
}

fn statuses(report: &action_flow::RunReport) -> Vec<StepStatus> {
    report.steps.iter().map(|s| s.status).collect()
}

#[tokio::test]
async fn homepage_status_and_otp() {
    let session = Arc::new(InMemorySession::new().route(HOME, 200, otp_page()));
    let mut dispatcher = dispatcher(&session, settings());

    let steps = lines("# comment\n\n1. load homepage\ncheck status 200\nenter otp 654321\n");
    assert_eq!(steps.len(), 3);
    let report = dispatcher.execute_all("steps.txt", &steps).await;

    assert_eq!(
        statuses(&report),
        vec![StepStatus::Passed, StepStatus::Passed, StepStatus::Passed]
    );
    assert!(report.is_success());
    assert!(session.journal().contains(&Interaction::Fill {
        element: 0,
        value: "654321".into()
    }));
    assert_eq!(dispatcher.context().last_response().and_then(|r| r.status), Some(200));
}

#[tokio::test]
async fn unknown_lines_do_not_stop_the_run() {
    let session = Arc::new(InMemorySession::new().route(HOME, 200, MemoryPage::new()));
    let mut dispatcher = dispatcher(&session, settings());

    let report = dispatcher
        .execute_all("steps.txt", &lines("open homepage\nfeed the cat\ncheck status 200"))
        .await;

    assert_eq!(
        statuses(&report),
        vec![StepStatus::Passed, StepStatus::Unknown, StepStatus::Passed]
    );
    assert_eq!(report.counts.unknown, 1);
    assert!(report.is_success());
}

#[tokio::test]
async fn click_falls_back_to_class_heuristic() {
    let page = MemoryPage::new()
        .element(MemoryElement::new("span").text("Welcome"))
        .element(MemoryElement::new("div").attr("class", "btn primary").text("Continue"));
    let session = Arc::new(InMemorySession::new().route(HOME, 200, page));
    let mut dispatcher = dispatcher(&session, settings());

    let report = dispatcher
        .execute_all("steps.txt", &lines("open homepage\nclick \"Continue\""))
        .await;

    assert_eq!(report.steps[1].status, StepStatus::Passed);
    assert!(session.journal().contains(&Interaction::Click { element: 1 }));
}

#[tokio::test]
async fn status_mismatch_fails_the_step_only() {
    let session = Arc::new(InMemorySession::new().route(HOME, 500, MemoryPage::new()));
    let mut dispatcher = dispatcher(&session, settings());

    let report = dispatcher
        .execute_all("steps.txt", &lines("open homepage\ncheck status 200\nlighthouse score"))
        .await;

    assert_eq!(
        statuses(&report),
        vec![StepStatus::Passed, StepStatus::Failed, StepStatus::Acknowledged]
    );
    assert!(report.steps[1].message.starts_with("status_mismatch"));
    assert!(!report.is_success());
}

#[tokio::test]
async fn missing_otp_field_is_a_hard_failure() {
    let page = MemoryPage::new().element(MemoryElement::new("p").text("Nothing to see"));
    let session = Arc::new(InMemorySession::new().route(HOME, 200, page));
    let mut dispatcher = dispatcher(&session, settings());

    let report = dispatcher
        .execute_all("steps.txt", &lines("open homepage\nenter otp 123456"))
        .await;

    assert_eq!(report.steps[1].status, StepStatus::Failed);
    assert!(report.steps[1].message.starts_with("required_element_missing"));
}

#[tokio::test]
async fn optional_buttons_degrade_to_warnings() {
    let session = Arc::new(InMemorySession::new().route(HOME, 200, MemoryPage::new()));
    let mut dispatcher = dispatcher(&session, settings());

    let report = dispatcher
        .execute_all("steps.txt", &lines("open homepage\nadd to cart\nclick notify group"))
        .await;

    assert_eq!(
        statuses(&report),
        vec![StepStatus::Passed, StepStatus::Warned, StepStatus::Warned]
    );
    assert!(report.is_success());
}

#[tokio::test]
async fn run_deadline_skips_remaining_lines() {
    let session = Arc::new(InMemorySession::new().route(HOME, 200, MemoryPage::new()));
    let mut settings = settings();
    settings.timeouts.run_ms = 100;
    let mut dispatcher = dispatcher(&session, settings);

    let report = dispatcher
        .execute_all("steps.txt", &lines("wait 1\nwait 5000\nopen homepage\ncheck status 200"))
        .await;

    assert_eq!(
        statuses(&report),
        vec![
            StepStatus::Passed,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Skipped
        ]
    );
    assert!(report.steps[1].message.starts_with("timeout"));
    assert_eq!(report.counts.skipped, 2);
}

fn greet(_ctx: &mut ExecutionContext, args: CommandArgs) -> HandlerFuture<'_> {
    let name = args.text(1).to_string();
    Box::pin(async move { Ok(StepOutcome::passed(format!("hello {}", name))) })
}

#[tokio::test]
async fn first_registered_matcher_wins() {
    let table = CommandTable::new()
        .register("greet", r"^hello (\w+)$", CommandAction::Handler(greet))
        .unwrap()
        .register("catch-all", r"^hello .*$", CommandAction::Note { category: "greeting" })
        .unwrap();
    let session: Arc<dyn BrowserSession> = Arc::new(InMemorySession::new());
    let mut dispatcher = Dispatcher::new(table, ExecutionContext::new(session, settings()));

    let report = dispatcher
        .execute_all("steps.txt", &lines("hello world\nhello big world"))
        .await;

    assert_eq!(report.steps[0].command.as_deref(), Some("greet"));
    assert_eq!(report.steps[0].message, "hello world");
    assert_eq!(report.steps[1].command.as_deref(), Some("catch-all"));
    assert_eq!(report.steps[1].status, StepStatus::Acknowledged);
}

#[test]
fn auditor_uses_the_dispatch_table() {
    let steps = lines("Open homepage\nVerify page contains \"Deals\"\nfly to the moon\nwait 300ms");
    let report = CoverageReport::build(&steps, &CommandTable::standard());
    assert_eq!(report.total(), 4);
    assert_eq!(report.known(), 3);
    let unknown: Vec<_> = report.unknown().map(|e| e.text.as_str()).collect();
    assert_eq!(unknown, vec!["fly to the moon"]);
}
