use cdp_adapter::{BrowserSession, InMemorySession, MemoryPage, ResourceKind, WaitPolicy};
use session_tap::{config::TapConfig, SessionTap};

#[tokio::test]
async fn attached_tap_collects_across_navigations() {
    let home = MemoryPage::new()
        .resource("https://shop.test/app.js", 200, ResourceKind::Script)
        .resource("https://shop.test/theme.css", 404, ResourceKind::Stylesheet)
        .console_error("Failed to load resource");
    let broken = MemoryPage::new().console_error("Uncaught ReferenceError: cart is not defined");
    let session = InMemorySession::new()
        .route("https://shop.test/", 200, home)
        .route("https://shop.test/cart", 500, broken);

    let log = SessionTap::attach(&session, TapConfig::default());
    assert!(log.responses().is_empty());

    session.navigate("https://shop.test/", WaitPolicy::DomContentLoaded).await.unwrap();
    session.navigate("https://shop.test/cart", WaitPolicy::DomContentLoaded).await.unwrap();

    assert_eq!(log.console_errors().len(), 2);
    assert_eq!(log.responses().len(), 4);

    let failed: Vec<String> = log.failed_resources().into_iter().map(|r| r.url).collect();
    assert_eq!(failed, vec!["https://shop.test/theme.css", "https://shop.test/cart"]);
    assert_eq!(log.server_errors().len(), 1);
}

#[tokio::test]
async fn snapshots_are_independent_of_later_appends() {
    let session = InMemorySession::new().with_fallback_status(200);
    let log = SessionTap::attach(&session, TapConfig::default());

    session.navigate("https://a.test/", WaitPolicy::Load).await.unwrap();
    let before = log.responses();
    session.navigate("https://b.test/", WaitPolicy::Load).await.unwrap();

    assert_eq!(before.len(), 1);
    assert_eq!(log.responses().len(), 2);
}
