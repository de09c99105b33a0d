//! Core types for locator system

use cdp_adapter::ElementHandle;
use serde::{Deserialize, Serialize};

/// Resolution tiers, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Accessible role plus visible name
    Role,
    /// Label association
    Label,
    /// Placeholder text
    Placeholder,
    /// Tag, attribute and class-name heuristics
    Heuristic,
    /// Broad tag selector or bare text match
    Fallback,
}

impl Tier {
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Role => "role",
            Tier::Label => "label",
            Tier::Placeholder => "placeholder",
            Tier::Heuristic => "heuristic",
            Tier::Fallback => "fallback",
        }
    }
}

/// The element a chain settled on and how it got there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub element: ElementHandle,
    pub tier: Tier,
    /// Human-readable description of the winning strategy.
    pub strategy: String,
    /// Number of elements the winning strategy matched.
    pub matches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_order_by_precedence() {
        assert!(Tier::Role < Tier::Label);
        assert!(Tier::Label < Tier::Placeholder);
        assert!(Tier::Placeholder < Tier::Heuristic);
        assert!(Tier::Heuristic < Tier::Fallback);
        assert_eq!(Tier::Heuristic.name(), "heuristic");
    }
}
