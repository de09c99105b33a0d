//! Chromium DevTools backend.
//!
//! Element handles are realised by a locator script that tags every matched node with a
//! `data-stepdriver-id` attribute; later actions re-find the node through that attribute.

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::events::{
    ConsoleLevel, ConsoleMessage, EventListener, NetworkResponse, ResourceKind, SessionEvent,
};
use crate::resolve_chrome_path;
use crate::session::{
    BrowserSession, ElementHandle, HttpMethod, ImageState, LoadTiming, NavResponse, Query,
    TextMatch, WaitPolicy,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EvaluateParams, EventConsoleApiCalled, EventExceptionThrown,
    RemoteObject,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use futures::{Future, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const ID_ATTRIBUTE: &str = "data-stepdriver-id";

const LOCATOR_JS: &str = r#"function (q) {
  const lower = (s) => (s || '').toLowerCase();
  const hit = (text, needles) => { const t = lower(text); return needles.some((n) => t.includes(n)); };
  const visibleText = (el) => (el.innerText || el.textContent || '').trim();
  const roleOf = (el) => {
    const explicit = el.getAttribute('role');
    if (explicit) return explicit.toLowerCase();
    const tag = el.tagName.toLowerCase();
    const type = lower(el.getAttribute('type')) || 'text';
    if (tag === 'button') return 'button';
    if (tag === 'a' && el.hasAttribute('href')) return 'link';
    if (tag === 'input' && ['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
    if (tag === 'input' && type === 'checkbox') return 'checkbox';
    if (tag === 'input' || tag === 'textarea') return 'textbox';
    if (tag === 'select') return 'combobox';
    if (tag === 'img') return 'img';
    return '';
  };
  const accessibleName = (el) => el.getAttribute('aria-label') || visibleText(el) || el.value || el.getAttribute('title') || el.getAttribute('alt') || '';
  const labelText = (el) => {
    const parts = [el.getAttribute('aria-label') || ''];
    if (el.labels) for (const l of el.labels) parts.push(l.textContent || '');
    const by = el.getAttribute('aria-labelledby');
    if (by) for (const id of by.split(/\s+/)) { const n = document.getElementById(id); if (n) parts.push(n.textContent || ''); }
    return parts.join(' ');
  };
  const visible = (el) => el.getClientRects().length > 0
    && el.getAttribute('aria-hidden') !== 'true'
    && getComputedStyle(el).visibility !== 'hidden';
  const all = (sel) => Array.from(document.querySelectorAll(sel));
  const shown = (sel) => all(sel).filter(visible);
  const skipped = ['HTML', 'HEAD', 'TITLE', 'SCRIPT', 'STYLE', 'META', 'LINK'];
  let found = [];
  switch (q.kind) {
    case 'role': found = shown('*').filter((el) => roleOf(el) === q.role && hit(accessibleName(el), q.needles)); break;
    case 'label': found = shown('input, textarea, select').filter((el) => hit(labelText(el), q.needles)); break;
    case 'placeholder': found = shown('[placeholder]').filter((el) => hit(el.getAttribute('placeholder'), q.needles)); break;
    case 'text':
      found = shown('body *')
        .filter((el) => !skipped.includes(el.tagName) && hit(el.textContent, q.needles))
        .filter((el) => !Array.from(el.children).some((c) => hit(c.textContent, q.needles)));
      break;
    case 'css':
      found = all(q.selector);
      if (q.needles) found = found.filter((el) => hit(el.textContent, q.needles));
      break;
  }
  window.__stepdriverSeq = window.__stepdriverSeq || 0;
  return found.map((el) => {
    let id = el.getAttribute('data-stepdriver-id');
    if (!id) { id = String(++window.__stepdriverSeq); el.setAttribute('data-stepdriver-id', id); }
    return { id: Number(id), tag: el.tagName.toLowerCase() };
  });
}"#;

const FILL_JS: &str = r#"function (id, value) {
  const el = document.querySelector('[data-stepdriver-id="' + id + '"]');
  if (!el) return false;
  el.focus();
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
    : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype : HTMLInputElement.prototype;
  const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
  if (descriptor && descriptor.set) descriptor.set.call(el, value); else el.value = value;
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}"#;

const VALUE_JS: &str = r#"function (id) {
  const el = document.querySelector('[data-stepdriver-id="' + id + '"]');
  return el ? String(el.value ?? '') : null;
}"#;

const TIMING_JS: &str = r#"(() => {
  const t = performance.timing || {};
  return {
    load_ms: (t.loadEventEnd || 0) - (t.navigationStart || 0),
    dom_content_loaded_ms: (t.domContentLoadedEventEnd || 0) - (t.navigationStart || 0),
  };
})()"#;

const IMAGES_JS: &str = r#"Array.from(document.images).map((i) => ({
  src: i.currentSrc || i.src || '',
  complete: i.complete,
  natural_width: i.naturalWidth,
}))"#;

const VIEWPORT_JS: &str = "({ width: window.innerWidth, height: window.innerHeight })";

#[derive(Deserialize)]
struct ViewportSize {
    width: u32,
    height: u32,
}

type Listeners = Arc<RwLock<Vec<EventListener>>>;

/// [`BrowserSession`] over a single Chromium page.
pub struct ChromiumSession {
    browser: tokio::sync::Mutex<Browser>,
    page: Page,
    http: reqwest::Client,
    config: CdpConfig,
    listeners: Listeners,
    last_document: Arc<Mutex<Option<NetworkResponse>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumSession {
    /// Launches Chromium, opens a blank page and starts the console and network listeners.
    pub async fn launch(config: CdpConfig) -> Result<Self, AdapterError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(config.window_width, config.window_height)
            .viewport(Viewport {
                width: config.window_width,
                height: config.window_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(config.action_timeout_ms));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = resolve_chrome_path(&config) {
            debug!(path = %path.display(), "using chrome executable");
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("invalid browser config: {}", err))
        })?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(cdp_error)?;

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler event loop ended");
                    break;
                }
            }
        }));

        let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(cdp_error)?;

        let listeners: Listeners = Arc::new(RwLock::new(Vec::new()));
        let last_document = Arc::new(Mutex::new(None));

        let mut console_events = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(cdp_error)?;
        let console_listeners = listeners.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let message = ConsoleMessage {
                    level: console_level(&event.r#type),
                    text: console_text(&event.args),
                };
                broadcast(&console_listeners, SessionEvent::Console(message));
            }
        }));

        let mut exceptions = page
            .event_listener::<EventExceptionThrown>()
            .await
            .map_err(cdp_error)?;
        let exception_listeners = listeners.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = exceptions.next().await {
                let details = &event.exception_details;
                let text = details
                    .exception
                    .as_ref()
                    .and_then(|ex| ex.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                broadcast(
                    &exception_listeners,
                    SessionEvent::Console(ConsoleMessage {
                        level: ConsoleLevel::Error,
                        text,
                    }),
                );
            }
        }));

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_error)?;
        let response_listeners = listeners.clone();
        let document_slot = last_document.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let response = NetworkResponse {
                    url: event.response.url.clone(),
                    status: u16::try_from(event.response.status).unwrap_or(0),
                    resource: resource_kind(&event.r#type),
                };
                if response.resource == ResourceKind::Document {
                    let mut slot = document_slot.lock();
                    if slot.is_none() {
                        *slot = Some(response.clone());
                    }
                }
                broadcast(&response_listeners, SessionEvent::Response(response));
            }
        }));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.action_timeout_ms))
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Http).with_hint(err.to_string()))?;

        info!(headless = config.headless, "Chromium session ready");
        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            http,
            config,
            listeners,
            last_document,
            tasks,
        })
    }

    /// Closes the browser process.
    pub async fn shutdown(&self) -> Result<(), AdapterError> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn within<T, F>(
        &self,
        kind: AdapterErrorKind,
        limit_ms: u64,
        what: &str,
        fut: F,
    ) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, CdpError>> + Send,
    {
        match timeout(Duration::from_millis(limit_ms), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(cdp_error(err)),
            Err(_) => Err(AdapterError::new(kind).with_hint(format!("{} ({} ms)", what, limit_ms))),
        }
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T, AdapterError> {
        let page = &self.page;
        let result = self
            .within(
                AdapterErrorKind::ActionTimeout,
                self.config.action_timeout_ms,
                "evaluate",
                async move { page.evaluate_expression(EvaluateParams::new(expression)).await },
            )
            .await?;
        result.into_value::<T>().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("unexpected script result: {}", err))
        })
    }

    async fn element(&self, handle: &ElementHandle) -> Result<Element, AdapterError> {
        let selector = format!("[{}=\"{}\"]", ID_ATTRIBUTE, handle.id);
        let page = &self.page;
        self.within(
            AdapterErrorKind::ActionTimeout,
            self.config.action_timeout_ms,
            "find element",
            async move { page.find_element(selector).await },
        )
        .await
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<NavResponse, AdapterError> {
        *self.last_document.lock() = None;
        let page = &self.page;
        self.within(
            AdapterErrorKind::NavTimeout,
            self.config.navigation_timeout_ms,
            url,
            async move {
                page.goto(url).await?;
                if wait == WaitPolicy::Load {
                    page.wait_for_navigation().await?;
                }
                Ok(())
            },
        )
        .await?;

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let status = self.last_document.lock().as_ref().map(|doc| doc.status);
        debug!(url = %final_url, ?status, "navigation finished");
        Ok(NavResponse {
            url: final_url,
            status,
        })
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        let url = self.page.url().await.map_err(cdp_error)?;
        Ok(url.unwrap_or_default())
    }

    async fn go_back(&self) -> Result<(), AdapterError> {
        let page = &self.page;
        self.within(
            AdapterErrorKind::NavTimeout,
            self.config.navigation_timeout_ms,
            "history.back()",
            async move {
                page.evaluate_expression(EvaluateParams::new("history.back()"))
                    .await?;
                page.wait_for_navigation().await?;
                Ok(())
            },
        )
        .await
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementHandle>, AdapterError> {
        let expression = format!("({})({})", LOCATOR_JS, query_payload(query));
        self.eval(expression).await.map_err(|err| {
            let invalid = err
                .hint
                .as_deref()
                .is_some_and(|hint| hint.contains("not a valid selector"));
            if invalid {
                AdapterError::new(AdapterErrorKind::InvalidSelector).with_hint(query.to_string())
            } else {
                err
            }
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        let el = self.element(element).await?;
        self.within(
            AdapterErrorKind::ActionTimeout,
            self.config.action_timeout_ms,
            "click",
            async move {
                el.scroll_into_view().await?;
                el.click().await?;
                Ok(())
            },
        )
        .await
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), AdapterError> {
        let expression = format!("({})({}, {})", FILL_JS, element.id, json!(value));
        let filled: bool = self.eval(expression).await?;
        if filled {
            Ok(())
        } else {
            Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("<{}> #{}", element.tag, element.id)))
        }
    }

    async fn press(&self, element: &ElementHandle, key: &str) -> Result<(), AdapterError> {
        let el = self.element(element).await?;
        self.within(
            AdapterErrorKind::ActionTimeout,
            self.config.action_timeout_ms,
            "press key",
            async move {
                el.press_key(key).await?;
                Ok(())
            },
        )
        .await
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, AdapterError> {
        let el = self.element(element).await?;
        let text = el.inner_text().await.map_err(cdp_error)?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        let el = self.element(element).await?;
        el.attribute(name).await.map_err(cdp_error)
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String, AdapterError> {
        let expression = format!("({})({})", VALUE_JS, element.id);
        let value: Option<String> = self.eval(expression).await?;
        value.ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("<{}> #{}", element.tag, element.id))
        })
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("{}: {}", parent.display(), err))
            })?;
        }
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        let page = &self.page;
        self.within(
            AdapterErrorKind::ActionTimeout,
            self.config.action_timeout_ms,
            "screenshot",
            async move { page.save_screenshot(params, path).await },
        )
        .await?;
        Ok(())
    }

    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<u16, AdapterError> {
        let method = match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut request = self.http.request(method, url);
        let page_url = self.current_url().await.unwrap_or_default();
        if same_host(&page_url, url) {
            match self.page.get_cookies().await {
                Ok(cookies) => {
                    let pairs = cookies.iter().map(|c| (c.name.as_str(), c.value.as_str()));
                    if let Some(header) = cookie_header(pairs) {
                        request = request.header(reqwest::header::COOKIE, header);
                    }
                }
                Err(err) => debug!(error = %err, "page cookies unavailable for raw request"),
            }
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        match request.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(err) if err.is_timeout() => Err(AdapterError::new(AdapterErrorKind::ActionTimeout)
                .with_hint(format!("request {}", url))),
            Err(err) => {
                warn!(url, error = %err, "raw request failed");
                Err(AdapterError::new(AdapterErrorKind::Http).with_hint(err.to_string()))
            }
        }
    }

    async fn load_timing(&self) -> Result<LoadTiming, AdapterError> {
        self.eval(TIMING_JS.to_string()).await
    }

    async fn images(&self) -> Result<Vec<ImageState>, AdapterError> {
        self.eval(IMAGES_JS.to_string()).await
    }

    async fn viewport(&self) -> Result<Option<(u32, u32)>, AdapterError> {
        let size: ViewportSize = self.eval(VIEWPORT_JS.to_string()).await?;
        Ok(Some((size.width, size.height)))
    }

    fn browser_name(&self) -> String {
        "chromium".to_string()
    }

    fn subscribe(&self, listener: EventListener) {
        self.listeners.write().push(listener);
    }
}

fn broadcast(listeners: &Listeners, event: SessionEvent) {
    for listener in listeners.read().iter() {
        listener(&event);
    }
}

fn cdp_error(err: CdpError) -> AdapterError {
    match err {
        CdpError::NotFound => AdapterError::new(AdapterErrorKind::TargetNotFound),
        CdpError::Timeout => AdapterError::new(AdapterErrorKind::ActionTimeout),
        other => AdapterError::new(AdapterErrorKind::CdpIo).with_hint(other.to_string()),
    }
}

fn query_payload(query: &Query) -> serde_json::Value {
    match query {
        Query::Role { role, name } => {
            json!({ "kind": "role", "role": role.to_lowercase(), "needles": name.needles() })
        }
        Query::Label(text) => json!({ "kind": "label", "needles": text.needles() }),
        Query::Placeholder(text) => json!({ "kind": "placeholder", "needles": text.needles() }),
        Query::Text(text) => json!({ "kind": "text", "needles": text.needles() }),
        Query::Css { selector, has_text } => json!({
            "kind": "css",
            "selector": selector,
            "needles": has_text.as_ref().map(TextMatch::needles),
        }),
    }
}

fn console_level(kind: &ConsoleApiCalledType) -> ConsoleLevel {
    match kind {
        ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => ConsoleLevel::Error,
        ConsoleApiCalledType::Warning => ConsoleLevel::Warning,
        ConsoleApiCalledType::Info => ConsoleLevel::Info,
        ConsoleApiCalledType::Debug => ConsoleLevel::Debug,
        _ => ConsoleLevel::Log,
    }
}

fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .filter_map(|arg| match &arg.value {
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
            None => arg.description.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn resource_kind(kind: &ResourceType) -> ResourceKind {
    match kind {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Xhr | ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

/// Both URLs parse and name the same host.
fn same_host(page_url: &str, target: &str) -> bool {
    match (url::Url::parse(page_url), url::Url::parse(target)) {
        (Ok(page), Ok(target)) => page.host_str().is_some() && page.host_str() == target.host_str(),
        _ => false,
    }
}

fn cookie_header<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<String> {
    let joined = pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_lowercased_needles() {
        let payload = query_payload(&Query::role("Button", TextMatch::contains("Get OTP")));
        assert_eq!(payload["kind"], "role");
        assert_eq!(payload["role"], "button");
        assert_eq!(payload["needles"], json!(["get otp"]));
    }

    #[test]
    fn locator_filters_unrendered_elements_outside_css() {
        let branches = [
            "case 'role': found = shown(",
            "case 'label': found = shown(",
            "case 'placeholder': found = shown(",
            "found = shown('body *')",
        ];
        for branch in branches {
            assert!(LOCATOR_JS.contains(branch), "{branch}");
        }
        assert!(LOCATOR_JS.contains("getClientRects().length > 0"));
        assert!(LOCATOR_JS.contains("case 'css':\n      found = all(q.selector);"));
    }

    #[test]
    fn raw_requests_carry_cookies_only_to_the_page_host() {
        assert!(same_host("https://shop.test/cart", "https://shop.test/api/listings"));
        assert!(!same_host("https://shop.test/cart", "https://cdn.other.test/a.png"));
        assert!(!same_host("about:blank", "https://shop.test/"));
        assert_eq!(
            cookie_header([("session", "abc"), ("theme", "dark")]).as_deref(),
            Some("session=abc; theme=dark")
        );
        assert_eq!(cookie_header([]), None);
    }

    #[test]
    fn css_payload_without_text_filter_is_null() {
        let payload = query_payload(&Query::css("input[type=\"tel\"]"));
        assert_eq!(payload["selector"], "input[type=\"tel\"]");
        assert!(payload["needles"].is_null());
    }

    #[test]
    fn console_levels_map_errors_and_asserts() {
        assert_eq!(console_level(&ConsoleApiCalledType::Error), ConsoleLevel::Error);
        assert_eq!(console_level(&ConsoleApiCalledType::Assert), ConsoleLevel::Error);
        assert_eq!(console_level(&ConsoleApiCalledType::Log), ConsoleLevel::Log);
    }
}
