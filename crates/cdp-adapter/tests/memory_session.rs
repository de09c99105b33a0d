use cdp_adapter::{
    AdapterErrorKind, BrowserSession, ConsoleLevel, HttpMethod, InMemorySession, Interaction,
    MemoryElement, MemoryPage, Query, ResourceKind, SessionEvent, TextMatch, WaitPolicy,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const HOME: &str = "https://shop.test/";

fn session() -> InMemorySession {
    let home = MemoryPage::new()
        .element(MemoryElement::new("a").attr("href", "/cart").text("Cart"))
        .element(MemoryElement::new("img").attr("src", "/logo.png"))
        .element(MemoryElement::new("img").attr("src", "/missing.png").broken())
        .resource("https://shop.test/app.css", 404, ResourceKind::Stylesheet)
        .console_error("Uncaught TypeError: x is undefined")
        .timing(850, 420);
    let cart = MemoryPage::new().element(MemoryElement::new("h1").text("Your cart"));
    InMemorySession::new()
        .route(HOME, 200, home)
        .route("https://shop.test/cart", 200, cart)
        .http_status("https://shop.test/api/groups", 503)
}

#[tokio::test]
async fn navigation_reports_status_and_emits_events() {
    let session = session();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.subscribe(Arc::new(move |event: &SessionEvent| sink.lock().push(event.clone())));

    let nav = session.navigate("https://shop.test", WaitPolicy::DomContentLoaded).await.unwrap();
    assert_eq!(nav.status, Some(200));
    assert_eq!(nav.url, HOME);

    let events = seen.lock().clone();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], SessionEvent::Response(r) if r.resource == ResourceKind::Document));
    assert!(matches!(&events[1], SessionEvent::Response(r) if r.status == 404));
    assert!(matches!(&events[2], SessionEvent::Console(m) if m.level == ConsoleLevel::Error));
}

#[tokio::test]
async fn unknown_route_uses_fallback_status() {
    let session = InMemorySession::new().with_fallback_status(200);
    let nav = session.navigate("https://nowhere.test/x", WaitPolicy::Load).await.unwrap();
    assert_eq!(nav.status, Some(200));
    assert_eq!(InMemorySession::new().navigate("https://nowhere.test/", WaitPolicy::Load).await.unwrap().status, Some(404));
}

#[tokio::test]
async fn clicking_a_link_follows_href_and_go_back_returns() {
    let session = session();
    session.navigate(HOME, WaitPolicy::DomContentLoaded).await.unwrap();
    let links = session
        .query(&Query::role("link", TextMatch::contains("cart")))
        .await
        .unwrap();
    session.click(&links[0]).await.unwrap();
    assert_eq!(session.current_url().await.unwrap(), "https://shop.test/cart");

    session.go_back().await.unwrap();
    assert_eq!(session.current_url().await.unwrap(), HOME);
}

#[tokio::test]
async fn stale_handles_are_rejected_after_navigation() {
    let session = session();
    session.navigate(HOME, WaitPolicy::DomContentLoaded).await.unwrap();
    let images = session.query(&Query::css("img")).await.unwrap();
    session.navigate("https://shop.test/cart", WaitPolicy::DomContentLoaded).await.unwrap();
    let err = session.click(&images[1]).await.unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::TargetNotFound);
}

#[tokio::test]
async fn probes_and_raw_requests() {
    let session = session();
    session.navigate(HOME, WaitPolicy::DomContentLoaded).await.unwrap();

    let images = session.images().await.unwrap();
    assert_eq!(images.iter().filter(|img| img.is_broken()).count(), 1);
    assert_eq!(session.load_timing().await.unwrap().load_ms, 850);
    assert_eq!(session.viewport().await.unwrap(), Some((1280, 800)));

    let status = session
        .request(HttpMethod::Get, "https://shop.test/api/groups", None)
        .await
        .unwrap();
    assert_eq!(status, 503);
    assert!(session.journal().contains(&Interaction::Request {
        method: HttpMethod::Get,
        url: "https://shop.test/api/groups".to_string(),
    }));
}

#[tokio::test]
async fn wait_for_times_out_when_nothing_appears() {
    let session = session();
    session.navigate(HOME, WaitPolicy::DomContentLoaded).await.unwrap();
    let err = session
        .wait_for(&Query::Text(TextMatch::contains("never")), Duration::from_millis(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::ActionTimeout);

    let found = session
        .wait_for(&Query::Text(TextMatch::contains("cart")), Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(found.tag, "a");
}

#[tokio::test]
async fn fill_updates_value() {
    let page = MemoryPage::new().element(MemoryElement::new("input").attr("placeholder", "Search items..."));
    let session = InMemorySession::new().route(HOME, 200, page);
    session.navigate(HOME, WaitPolicy::DomContentLoaded).await.unwrap();
    let inputs = session
        .query(&Query::Placeholder(TextMatch::contains("search")))
        .await
        .unwrap();
    session.fill(&inputs[0], "teddy bear").await.unwrap();
    assert_eq!(session.input_value(&inputs[0]).await.unwrap(), "teddy bear");
    assert_eq!(session.value_of(0).as_deref(), Some("teddy bear"));
}
