//! Fallback chain orchestration

use crate::{errors::LocatorError, strategies::*, types::*};
use cdp_adapter::{BrowserSession, Query, TextMatch};
use tracing::{debug, warn};

/// Ordered strategies tried until one yields at least one element.
///
/// The first element of the first non-empty stage wins; later stages are never
/// consulted. A stage that errors is logged and skipped.
pub struct FallbackChain {
    target: String,
    stages: Vec<Box<dyn Strategy>>,
}

impl FallbackChain {
    /// `target` names what is being looked for, for logs and errors.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, strategy: impl Strategy + 'static) -> Self {
        self.stages.push(Box::new(strategy));
        self
    }

    fn query(self, tier: Tier, query: Query) -> Self {
        self.stage(QueryStrategy::new(tier, query))
    }

    pub fn role(self, role: &str, name: TextMatch) -> Self {
        self.query(Tier::Role, Query::role(role, name))
    }

    pub fn label(self, text: TextMatch) -> Self {
        self.query(Tier::Label, Query::Label(text))
    }

    pub fn placeholder(self, text: TextMatch) -> Self {
        self.query(Tier::Placeholder, Query::Placeholder(text))
    }

    /// Tag, attribute or class-name heuristic.
    pub fn css(self, selector: &str) -> Self {
        self.query(Tier::Heuristic, Query::css(selector))
    }

    pub fn css_with_text(self, selector: &str, text: TextMatch) -> Self {
        self.query(Tier::Heuristic, Query::css_with_text(selector, text))
    }

    /// Broad last-resort selector.
    pub fn fallback(self, selector: &str) -> Self {
        self.query(Tier::Fallback, Query::css(selector))
    }

    /// Last-resort text match.
    pub fn text(self, text: TextMatch) -> Self {
        self.query(Tier::Fallback, Query::Text(text))
    }

    pub fn nth(self, selector: &str, index: usize, min_count: usize) -> Self {
        self.stage(NthStrategy::new(selector, index, min_count))
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the stages in order. `Ok(None)` when every stage came back empty.
    pub async fn resolve(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Option<Resolved>, LocatorError> {
        for strategy in &self.stages {
            match strategy.resolve(session).await {
                Ok(found) if !found.is_empty() => {
                    let matches = found.len();
                    let element = found.into_iter().next().ok_or_else(|| {
                        LocatorError::ElementNotFound(self.target.clone())
                    })?;
                    debug!(
                        lookup = %self.target,
                        tier = strategy.tier().name(),
                        strategy = %strategy.describe(),
                        matches,
                        "resolved element"
                    );
                    return Ok(Some(Resolved {
                        element,
                        tier: strategy.tier(),
                        strategy: strategy.describe(),
                        matches,
                    }));
                }
                Ok(_) => {
                    debug!(
                        lookup = %self.target,
                        tier = strategy.tier().name(),
                        strategy = %strategy.describe(),
                        "no match"
                    );
                }
                Err(err) => {
                    warn!(lookup = %self.target, strategy = %strategy.describe(), "strategy failed: {}", err);
                }
            }
        }
        debug!(lookup = %self.target, stages = self.stages.len(), "all strategies exhausted");
        Ok(None)
    }

    /// Like [`FallbackChain::resolve`] but an exhausted chain is an error.
    pub async fn require(&self, session: &dyn BrowserSession) -> Result<Resolved, LocatorError> {
        self.resolve(session).await?.ok_or_else(|| {
            LocatorError::ElementNotFound(format!(
                "{} ({} strategies exhausted)",
                self.target,
                self.stages.len()
            ))
        })
    }
}
