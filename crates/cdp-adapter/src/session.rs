use crate::error::{AdapterError, AdapterErrorKind};
use crate::events::EventListener;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, time::Duration};
use tokio::time::{sleep, Instant};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Readiness signal a navigation waits for before returning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    #[default]
    DomContentLoaded,
    Load,
}

/// Result of a top-level navigation. `status` is absent when the browser never
/// reported a document response (e.g. `about:blank` or a cache hit).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavResponse {
    pub url: String,
    pub status: Option<u16>,
}

/// Case-insensitive, non-exact text matching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMatch {
    /// Haystack contains the needle.
    Contains(String),
    /// Haystack contains at least one of the needles.
    AnyOf(Vec<String>),
}

impl TextMatch {
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    pub fn any_of<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(needles.into_iter().map(Into::into).collect())
    }

    /// Lowercased needles, empty ones dropped.
    pub fn needles(&self) -> Vec<String> {
        let raw: Vec<&String> = match self {
            Self::Contains(needle) => vec![needle],
            Self::AnyOf(needles) => needles.iter().collect(),
        };
        raw.into_iter()
            .map(|needle| needle.trim().to_lowercase())
            .filter(|needle| !needle.is_empty())
            .collect()
    }

    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        self.needles()
            .iter()
            .any(|needle| haystack.contains(needle.as_str()))
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(needle) => write!(f, "~\"{}\"", needle),
            Self::AnyOf(needles) => write!(f, "~/{}/", needles.join("|")),
        }
    }
}

/// Ways a session can locate elements on the current page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Accessible role plus accessible name.
    Role { role: String, name: TextMatch },
    /// Form control whose associated label text matches.
    Label(TextMatch),
    /// Element whose placeholder attribute matches.
    Placeholder(TextMatch),
    /// Innermost elements whose text content matches.
    Text(TextMatch),
    /// CSS selector, optionally narrowed to elements whose text matches.
    Css {
        selector: String,
        has_text: Option<TextMatch>,
    },
}

impl Query {
    pub fn role(role: impl Into<String>, name: TextMatch) -> Self {
        Self::Role {
            role: role.into(),
            name,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            selector: selector.into(),
            has_text: None,
        }
    }

    pub fn css_with_text(selector: impl Into<String>, text: TextMatch) -> Self {
        Self::Css {
            selector: selector.into(),
            has_text: Some(text),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name } => write!(f, "role={} name={}", role, name),
            Self::Label(text) => write!(f, "label={}", text),
            Self::Placeholder(text) => write!(f, "placeholder={}", text),
            Self::Text(text) => write!(f, "text={}", text),
            Self::Css {
                selector,
                has_text: None,
            } => write!(f, "css={}", selector),
            Self::Css {
                selector,
                has_text: Some(text),
            } => write!(f, "css={} has-text={}", selector, text),
        }
    }
}

/// Opaque reference to an element located on the current page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: u64,
    pub tag: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Navigation timing of the current document, in milliseconds since navigation start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTiming {
    pub load_ms: i64,
    pub dom_content_loaded_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageState {
    pub src: String,
    pub complete: bool,
    pub natural_width: u32,
}

impl ImageState {
    pub fn is_broken(&self) -> bool {
        !self.complete || self.natural_width == 0
    }
}

/// The browser capability the interpreter drives.
///
/// Implementations own their per-action and per-navigation deadlines and surface an
/// elapsed deadline as [`AdapterErrorKind::ActionTimeout`] or
/// [`AdapterErrorKind::NavTimeout`].
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<NavResponse, AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn go_back(&self) -> Result<(), AdapterError>;

    /// All matches in document order. Zero matches is not an error.
    async fn query(&self, query: &Query) -> Result<Vec<ElementHandle>, AdapterError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), AdapterError>;

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), AdapterError>;

    async fn press(&self, element: &ElementHandle, key: &str) -> Result<(), AdapterError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, AdapterError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, AdapterError>;

    async fn input_value(&self, element: &ElementHandle) -> Result<String, AdapterError>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), AdapterError>;

    /// Raw HTTP request outside the page; returns the response status.
    ///
    /// Requests to the current page's host carry the page's cookies. Other hosts get none.
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<u16, AdapterError>;

    async fn load_timing(&self) -> Result<LoadTiming, AdapterError>;

    async fn images(&self) -> Result<Vec<ImageState>, AdapterError>;

    async fn viewport(&self) -> Result<Option<(u32, u32)>, AdapterError>;

    fn browser_name(&self) -> String;

    /// Registers a callback that receives every console and network event until the
    /// session is dropped.
    fn subscribe(&self, listener: EventListener);

    /// Polls `query` until it yields an element or `timeout` elapses.
    async fn wait_for(
        &self,
        query: &Query,
        timeout: Duration,
    ) -> Result<ElementHandle, AdapterError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(first) = self.query(query).await?.into_iter().next() {
                return Ok(first);
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::ActionTimeout)
                    .with_hint(format!("waiting for {} ({} ms)", query, timeout.as_millis())));
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_match_is_case_insensitive_substring() {
        let m = TextMatch::contains("Get OTP");
        assert!(m.matches("please GET otp now"));
        assert!(!m.matches("get code"));
    }

    #[test]
    fn any_of_matches_any_needle() {
        let m = TextMatch::any_of(["add to cart", "cart", "add"]);
        assert!(m.matches("Cart"));
        assert!(m.matches("ADD item"));
        assert!(!m.matches("remove"));
    }

    #[test]
    fn empty_needles_never_match() {
        assert!(!TextMatch::contains("  ").matches("anything"));
    }

    #[test]
    fn broken_image_detection() {
        let ok = ImageState {
            src: "a.png".into(),
            complete: true,
            natural_width: 10,
        };
        assert!(!ok.is_broken());
        assert!(ImageState {
            natural_width: 0,
            ..ok.clone()
        }
        .is_broken());
        assert!(ImageState {
            complete: false,
            ..ok
        }
        .is_broken());
    }
}
