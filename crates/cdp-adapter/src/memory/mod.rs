//! Scripted in-memory page model.
//!
//! Routes map URLs to a status code and a flat list of elements (each with an optional
//! parent). Every interaction is appended to a journal so tests can assert on what a
//! step actually did. Navigation emits the document response, the page's configured
//! subresource responses and its console messages to subscribers synchronously.

mod selector;

use crate::error::{AdapterError, AdapterErrorKind};
use crate::events::{
    ConsoleLevel, ConsoleMessage, EventListener, NetworkResponse, ResourceKind, SessionEvent,
};
use crate::session::{
    BrowserSession, ElementHandle, HttpMethod, ImageState, LoadTiming, NavResponse, Query,
    TextMatch, WaitPolicy,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use selector::SelectorList;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const TEXT_EXCLUDED_TAGS: &[&str] = &["html", "head", "title", "script", "style", "meta", "link"];

/// One element of a [`MemoryPage`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryElement {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Own text, excluding children.
    pub text: String,
    pub parent: Option<usize>,
    /// Images only: failed to load.
    pub broken: bool,
}

impl MemoryElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Nests this element under the element at `parent`.
    pub fn within(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    /// Marks the element as not rendered, the way a `hidden` attribute would.
    pub fn hidden(self) -> Self {
        self.attr("hidden", "")
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Page content served for a route.
#[derive(Clone, Debug, Default)]
pub struct MemoryPage {
    elements: Vec<MemoryElement>,
    console: Vec<ConsoleMessage>,
    resources: Vec<NetworkResponse>,
    timing: LoadTiming,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: MemoryElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Appends an element and returns its index, for use with [`MemoryElement::within`].
    pub fn push(&mut self, element: MemoryElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn console(mut self, level: ConsoleLevel, text: impl Into<String>) -> Self {
        self.console.push(ConsoleMessage {
            level,
            text: text.into(),
        });
        self
    }

    pub fn console_error(self, text: impl Into<String>) -> Self {
        self.console(ConsoleLevel::Error, text)
    }

    pub fn resource(mut self, url: impl Into<String>, status: u16, resource: ResourceKind) -> Self {
        self.resources.push(NetworkResponse {
            url: url.into(),
            status,
            resource,
        });
        self
    }

    pub fn timing(mut self, load_ms: i64, dom_content_loaded_ms: i64) -> Self {
        self.timing = LoadTiming {
            load_ms,
            dom_content_loaded_ms,
        };
        self
    }

    pub fn elements(&self) -> &[MemoryElement] {
        &self.elements
    }

    fn children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, el)| el.parent == Some(idx))
            .map(|(child, _)| child)
    }

    fn text_content(&self, idx: usize) -> String {
        let mut parts = Vec::new();
        let own = self.elements[idx].text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for child in self.children(idx) {
            let text = self.text_content(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    fn role_of(&self, idx: usize) -> Option<String> {
        let el = &self.elements[idx];
        if let Some(role) = el.attribute("role") {
            return Some(role.to_lowercase());
        }
        let input_type = el.attribute("type").unwrap_or("text").to_lowercase();
        let role = match el.tag.as_str() {
            "button" => "button",
            "a" if el.attribute("href").is_some() => "link",
            "input" if matches!(input_type.as_str(), "button" | "submit" | "reset" | "image") => {
                "button"
            }
            "input" if matches!(input_type.as_str(), "checkbox") => "checkbox",
            "input" | "textarea" => "textbox",
            "select" => "combobox",
            "img" => "img",
            _ => return None,
        };
        Some(role.to_string())
    }

    fn accessible_name(&self, idx: usize) -> String {
        let el = &self.elements[idx];
        if let Some(label) = el.attribute("aria-label") {
            return label.to_string();
        }
        let text = self.text_content(idx);
        if !text.is_empty() {
            return text;
        }
        ["value", "title", "alt"]
            .iter()
            .find_map(|name| el.attribute(name))
            .unwrap_or_default()
            .to_string()
    }

    fn label_text(&self, idx: usize) -> String {
        let el = &self.elements[idx];
        let mut parts = Vec::new();
        if let Some(aria) = el.attribute("aria-label") {
            parts.push(aria.to_string());
        }
        if let Some(id) = el.attribute("id") {
            for (label, candidate) in self.elements.iter().enumerate() {
                if candidate.tag == "label" && candidate.attribute("for") == Some(id) {
                    parts.push(self.text_content(label));
                }
            }
        }
        let mut cursor = el.parent;
        while let Some(ancestor) = cursor {
            if self.elements[ancestor].tag == "label" {
                parts.push(self.text_content(ancestor));
            }
            cursor = self.elements[ancestor].parent;
        }
        parts.join(" ")
    }

    /// Not rendered: `hidden` on the element or an ancestor, or `aria-hidden="true"` on itself.
    fn is_visible(&self, idx: usize) -> bool {
        if self.elements[idx].attribute("aria-hidden") == Some("true") {
            return false;
        }
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            if self.elements[current].attribute("hidden").is_some() {
                return false;
            }
            cursor = self.elements[current].parent;
        }
        true
    }

    fn find(&self, query: &Query) -> Result<Vec<usize>, AdapterError> {
        let all = 0..self.elements.len();
        let shown = (0..self.elements.len()).filter(|idx| self.is_visible(*idx));
        let found = match query {
            Query::Role { role, name } => shown
                .filter(|idx| self.role_of(*idx).as_deref() == Some(role.as_str()))
                .filter(|idx| name.matches(&self.accessible_name(*idx)))
                .collect(),
            Query::Label(text) => shown
                .filter(|idx| {
                    matches!(self.elements[*idx].tag.as_str(), "input" | "textarea" | "select")
                })
                .filter(|idx| text.matches(&self.label_text(*idx)))
                .collect(),
            Query::Placeholder(text) => shown
                .filter(|idx| {
                    self.elements[*idx]
                        .attribute("placeholder")
                        .is_some_and(|placeholder| text.matches(placeholder))
                })
                .collect(),
            Query::Text(text) => shown
                .filter(|idx| !TEXT_EXCLUDED_TAGS.contains(&self.elements[*idx].tag.as_str()))
                .filter(|idx| text.matches(&self.text_content(*idx)))
                .filter(|idx| {
                    !self
                        .children(*idx)
                        .any(|child| text.matches(&self.text_content(child)))
                })
                .collect(),
            Query::Css { selector, has_text } => {
                let list = SelectorList::parse(selector)?;
                all.filter(|idx| list.matches(&self.elements, *idx))
                    .filter(|idx| {
                        has_text
                            .as_ref()
                            .map_or(true, |text: &TextMatch| text.matches(&self.text_content(*idx)))
                    })
                    .collect()
            }
        };
        Ok(found)
    }
}

/// Everything the in-memory session did, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    Navigate { url: String },
    GoBack,
    Click { element: u64 },
    Fill { element: u64, value: String },
    Press { element: u64, key: String },
    Screenshot { path: PathBuf, full_page: bool },
    Request { method: HttpMethod, url: String },
}

#[derive(Default)]
struct MemoryState {
    url: String,
    page: MemoryPage,
    history: Vec<String>,
    journal: Vec<Interaction>,
}

/// Browser double backed by [`MemoryPage`]s.
pub struct InMemorySession {
    routes: HashMap<String, (u16, MemoryPage)>,
    http: HashMap<String, u16>,
    fallback_status: u16,
    viewport: (u32, u32),
    state: Mutex<MemoryState>,
    listeners: RwLock<Vec<EventListener>>,
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySession {
    /// Unknown URLs answer 404 with an empty page.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            http: HashMap::new(),
            fallback_status: 404,
            viewport: (1280, 800),
            state: Mutex::new(MemoryState {
                url: "about:blank".to_string(),
                ..MemoryState::default()
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn route(mut self, url: &str, status: u16, page: MemoryPage) -> Self {
        self.routes.insert(normalize_url(url), (status, page));
        self
    }

    /// Status answered to raw requests for `url`, overriding any route.
    pub fn http_status(mut self, url: &str, status: u16) -> Self {
        self.http.insert(normalize_url(url), status);
        self
    }

    pub fn with_fallback_status(mut self, status: u16) -> Self {
        self.fallback_status = status;
        self
    }

    pub fn journal(&self) -> Vec<Interaction> {
        self.state.lock().journal.clone()
    }

    /// Current `value` of the element at `idx` on the loaded page.
    pub fn value_of(&self, idx: usize) -> Option<String> {
        let state = self.state.lock();
        state
            .page
            .elements
            .get(idx)
            .and_then(|el| el.attribute("value").map(str::to_string))
    }

    fn emit(&self, events: Vec<SessionEvent>) {
        let listeners = self.listeners.read();
        for event in &events {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }

    fn load(&self, url: &str, push_history: bool) -> NavResponse {
        let key = normalize_url(url);
        let (status, page) = self
            .routes
            .get(&key)
            .cloned()
            .unwrap_or_else(|| (self.fallback_status, MemoryPage::default()));

        let mut events = vec![SessionEvent::Response(NetworkResponse {
            url: key.clone(),
            status,
            resource: ResourceKind::Document,
        })];
        events.extend(page.resources.iter().cloned().map(SessionEvent::Response));
        events.extend(page.console.iter().cloned().map(SessionEvent::Console));

        {
            let mut state = self.state.lock();
            if push_history {
                let previous = std::mem::replace(&mut state.url, key.clone());
                state.history.push(previous);
            } else {
                state.url = key.clone();
            }
            state.page = page;
        }
        debug!(url = %key, status, "in-memory navigation");
        self.emit(events);

        NavResponse {
            url: key,
            status: Some(status),
        }
    }

    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&mut MemoryState, usize) -> T,
    ) -> Result<T, AdapterError> {
        let mut state = self.state.lock();
        let idx = usize::try_from(handle.id).unwrap_or(usize::MAX);
        let live = state
            .page
            .elements
            .get(idx)
            .is_some_and(|el| el.tag == handle.tag);
        if !live {
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("stale element <{}> #{}", handle.tag, handle.id)));
        }
        Ok(f(&mut *state, idx))
    }
}

fn normalize_url(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl BrowserSession for InMemorySession {
    async fn navigate(&self, url: &str, _wait: WaitPolicy) -> Result<NavResponse, AdapterError> {
        if Url::parse(url).is_err() {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("invalid url: {}", url)));
        }
        self.state.lock().journal.push(Interaction::Navigate {
            url: normalize_url(url),
        });
        Ok(self.load(url, true))
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.state.lock().url.clone())
    }

    async fn go_back(&self) -> Result<(), AdapterError> {
        let previous = {
            let mut state = self.state.lock();
            state.journal.push(Interaction::GoBack);
            state.history.pop()
        };
        if let Some(url) = previous {
            self.load(&url, false);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementHandle>, AdapterError> {
        let state = self.state.lock();
        let found = state.page.find(query)?;
        Ok(found
            .into_iter()
            .map(|idx| ElementHandle {
                id: idx as u64,
                tag: state.page.elements[idx].tag.clone(),
            })
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError> {
        let follow = self.with_element(element, |state, idx| {
            state.journal.push(Interaction::Click {
                element: element.id,
            });
            let el = &state.page.elements[idx];
            match (el.tag.as_str(), el.attribute("href")) {
                ("a", Some(href)) => Url::parse(&state.url)
                    .and_then(|base| base.join(href))
                    .ok()
                    .map(|target| target.to_string()),
                _ => None,
            }
        })?;
        if let Some(target) = follow {
            self.load(&target, true);
        }
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), AdapterError> {
        self.with_element(element, |state, idx| {
            state.page.elements[idx]
                .attrs
                .insert("value".to_string(), value.to_string());
            state.journal.push(Interaction::Fill {
                element: element.id,
                value: value.to_string(),
            });
        })
    }

    async fn press(&self, element: &ElementHandle, key: &str) -> Result<(), AdapterError> {
        self.with_element(element, |state, _| {
            state.journal.push(Interaction::Press {
                element: element.id,
                key: key.to_string(),
            });
        })
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, AdapterError> {
        self.with_element(element, |state, idx| state.page.text_content(idx))
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        self.with_element(element, |state, idx| {
            state.page.elements[idx].attribute(name).map(str::to_string)
        })
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String, AdapterError> {
        self.with_element(element, |state, idx| {
            state.page.elements[idx]
                .attribute("value")
                .unwrap_or_default()
                .to_string()
        })
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), AdapterError> {
        self.state.lock().journal.push(Interaction::Screenshot {
            path: path.to_path_buf(),
            full_page,
        });
        Ok(())
    }

    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        _body: Option<serde_json::Value>,
    ) -> Result<u16, AdapterError> {
        let key = normalize_url(url);
        self.state.lock().journal.push(Interaction::Request {
            method,
            url: key.clone(),
        });
        Ok(self
            .http
            .get(&key)
            .copied()
            .or_else(|| self.routes.get(&key).map(|(status, _)| *status))
            .unwrap_or(self.fallback_status))
    }

    async fn load_timing(&self) -> Result<LoadTiming, AdapterError> {
        Ok(self.state.lock().page.timing)
    }

    async fn images(&self) -> Result<Vec<ImageState>, AdapterError> {
        let state = self.state.lock();
        Ok(state
            .page
            .elements
            .iter()
            .filter(|el| el.tag == "img")
            .map(|el| ImageState {
                src: el.attribute("src").unwrap_or_default().to_string(),
                complete: !el.broken,
                natural_width: if el.broken { 0 } else { 100 },
            })
            .collect())
    }

    async fn viewport(&self) -> Result<Option<(u32, u32)>, AdapterError> {
        Ok(Some(self.viewport))
    }

    fn browser_name(&self) -> String {
        "in-memory".to_string()
    }

    fn subscribe(&self, listener: EventListener) {
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> MemoryPage {
        let mut page = MemoryPage::new();
        let form = page.push(MemoryElement::new("form"));
        page.push(
            MemoryElement::new("label")
                .attr("for", "phone")
                .text("Mobile number")
                .within(form),
        );
        page.push(
            MemoryElement::new("input")
                .attr("id", "phone")
                .attr("type", "tel")
                .within(form),
        );
        page.push(MemoryElement::new("button").text("Get OTP").within(form));
        page.push(MemoryElement::new("div").attr("class", "btn primary").text("Continue"));
        page
    }

    #[test]
    fn role_queries_use_accessible_name() {
        let page = login_page();
        let found = page
            .find(&Query::role("button", TextMatch::contains("get otp")))
            .unwrap();
        assert_eq!(found, vec![3]);
        assert!(page
            .find(&Query::role("button", TextMatch::contains("continue")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn label_association_via_for_attribute() {
        let page = login_page();
        let found = page.find(&Query::Label(TextMatch::contains("mobile"))).unwrap();
        assert_eq!(found, vec![2]);
    }

    #[test]
    fn text_query_returns_innermost_match() {
        let page = login_page();
        let found = page.find(&Query::Text(TextMatch::contains("get otp"))).unwrap();
        assert_eq!(found, vec![3]);
    }

    #[test]
    fn css_has_text_narrows_matches() {
        let page = login_page();
        let query = Query::css_with_text("[class*=\"btn\"], button", TextMatch::contains("continue"));
        assert_eq!(page.find(&query).unwrap(), vec![4]);
    }

    #[test]
    fn hidden_duplicates_are_skipped_except_for_css() {
        let mut page = MemoryPage::new();
        let drawer = page.push(MemoryElement::new("nav").hidden());
        page.push(MemoryElement::new("button").text("Sign in").within(drawer));
        page.push(
            MemoryElement::new("input")
                .attr("placeholder", "Search")
                .attr("aria-hidden", "true"),
        );
        page.push(MemoryElement::new("button").text("Sign in"));
        page.push(MemoryElement::new("input").attr("placeholder", "Search"));

        let role = Query::role("button", TextMatch::contains("sign in"));
        assert_eq!(page.find(&role).unwrap(), vec![3]);
        assert_eq!(page.find(&Query::Text(TextMatch::contains("sign in"))).unwrap(), vec![3]);
        let placeholder = Query::Placeholder(TextMatch::contains("search"));
        assert_eq!(page.find(&placeholder).unwrap(), vec![4]);
        assert_eq!(page.find(&Query::css("button")).unwrap(), vec![1, 3]);
    }
}
