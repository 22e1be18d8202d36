//! Core types for locator resolution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved, actionable element reference
///
/// Carries the selector that currently matches the target; drivers act on
/// the first element it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub selector: String,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

/// Fallback strategy, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealStrategy {
    /// Stable attributes (`data-testid`, `aria-label`) built from selector tokens
    DataTestidFuzzy,
    /// Fuzzy match against rendered text of interactive elements
    TextSimilarity,
    /// ARIA role plus accessible name
    RoleName,
    /// Tag containing the hinted text
    CssContains,
}

impl HealStrategy {
    /// Most precise first. The first strategy that accepts a match wins,
    /// whatever the confidence of later tiers would have been.
    pub const ORDER: [HealStrategy; 4] = [
        HealStrategy::DataTestidFuzzy,
        HealStrategy::TextSimilarity,
        HealStrategy::RoleName,
        HealStrategy::CssContains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HealStrategy::DataTestidFuzzy => "data-testid-fuzzy",
            HealStrategy::TextSimilarity => "text-similarity",
            HealStrategy::RoleName => "role-name",
            HealStrategy::CssContains => "css-contains",
        }
    }
}

impl fmt::Display for HealStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record of one successful fallback resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealedSelector {
    pub original: String,
    pub healed: String,
    pub strategy: HealStrategy,
    /// In `[0, 1]`
    pub confidence: f64,
    /// Maintenance hint for the flow author
    pub suggestion: String,
    pub healed_at: DateTime<Utc>,
}

impl HealedSelector {
    pub fn new(original: &str, healed: &str, strategy: HealStrategy, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            original: original.to_string(),
            healed: healed.to_string(),
            strategy,
            confidence,
            suggestion: format!(
                "Replace selector '{}' with '{}' ({} match, {:.0}% confidence)",
                original,
                healed,
                strategy,
                confidence * 100.0
            ),
            healed_at: Utc::now(),
        }
    }
}

/// Outcome of resolving one selector
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub handle: ElementHandle,
    /// Present only when a fallback strategy produced the handle
    pub healed: Option<HealedSelector>,
}

impl Resolution {
    pub fn direct(selector: &str) -> Self {
        Self {
            handle: ElementHandle::new(selector),
            healed: None,
        }
    }

    pub fn is_healed(&self) -> bool {
        self.healed.is_some()
    }
}

/// Append-only log of healed selectors for a single run
#[derive(Debug, Clone, Default)]
pub struct HealingLog {
    entries: Vec<HealedSelector>,
}

impl HealingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: HealedSelector) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HealedSelector] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand the entries over and start a fresh log
    pub fn take(&mut self) -> Vec<HealedSelector> {
        std::mem::take(&mut self.entries)
    }
}
