//! Self-healing element location
//!
//! A selector is first tried as written. When it no longer matches and
//! self-healing is enabled, an ordered cascade of fallback strategies
//! probes the page for the element the selector was meant to hit:
//!
//! 1. `data-testid-fuzzy`: stable attributes built from selector tokens
//! 2. `text-similarity`: fuzzy match on visible interactive labels
//! 3. `role-name`: ARIA role plus accessible name
//! 4. `css-contains`: container tag holding the hinted text

pub mod hints;
pub mod resolver;
pub mod similarity;
pub mod strategies;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use resolver::LocatorResolver;
pub use types::{ElementHandle, HealStrategy, HealedSelector, HealingLog, Resolution};

/// Minimal page capability the cascade needs
#[async_trait]
pub trait ElementQuery: Send + Sync {
    /// Wait up to `timeout_ms` for `selector` to match a visible element
    async fn wait_for_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool>;

    /// Number of elements currently matching `selector`
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Rendered text of visible interactive elements, in document order
    async fn interactive_texts(&self) -> Result<Vec<String>>;
}
