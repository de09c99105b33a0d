//! Element resolution strategies
//!
//! Each strategy asks the session for zero or more elements. A chain of them is
//! assembled per handler in [`crate::resolver::FallbackChain`].

use crate::{errors::LocatorError, types::Tier};
use async_trait::async_trait;
use cdp_adapter::{BrowserSession, ElementHandle, Query};
use tracing::debug;

/// Strategy trait for element resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Attempt to resolve elements using this strategy
    async fn resolve(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Vec<ElementHandle>, LocatorError>;

    fn tier(&self) -> Tier;

    /// Short description used in logs and reports
    fn describe(&self) -> String;
}

/// Runs a single session query.
pub struct QueryStrategy {
    tier: Tier,
    query: Query,
}

impl QueryStrategy {
    pub fn new(tier: Tier, query: Query) -> Self {
        Self { tier, query }
    }
}

#[async_trait]
impl Strategy for QueryStrategy {
    async fn resolve(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Vec<ElementHandle>, LocatorError> {
        debug!(tier = self.tier.name(), query = %self.query, "running query strategy");
        session
            .query(&self.query)
            .await
            .map_err(|err| LocatorError::from_adapter(self.tier.name(), err))
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    fn describe(&self) -> String {
        self.query.to_string()
    }
}

/// Picks the element at `index` of a selector, but only when the selector matches at
/// least `min_count` elements (e.g. "the second text input, if there are two").
pub struct NthStrategy {
    selector: String,
    index: usize,
    min_count: usize,
}

impl NthStrategy {
    pub fn new(selector: impl Into<String>, index: usize, min_count: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            min_count: min_count.max(index + 1),
        }
    }
}

#[async_trait]
impl Strategy for NthStrategy {
    async fn resolve(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Vec<ElementHandle>, LocatorError> {
        let all = session
            .query(&Query::css(self.selector.clone()))
            .await
            .map_err(|err| LocatorError::from_adapter("nth", err))?;
        if all.len() < self.min_count {
            debug!(
                selector = %self.selector,
                found = all.len(),
                required = self.min_count,
                "nth strategy below minimum count"
            );
            return Ok(Vec::new());
        }
        Ok(all.into_iter().skip(self.index).take(1).collect())
    }

    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn describe(&self) -> String {
        format!("css={} nth={}", self.selector, self.index)
    }
}
