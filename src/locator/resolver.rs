use super::hints::SelectorHints;
use super::strategies::HealAttempt;
use super::types::{HealStrategy, HealedSelector, HealingLog, Resolution};
use super::ElementQuery;
use crate::error::FlowError;
use crate::utils::config::RunConfig;
use log::{debug, info};

/// Visibility wait for the original selector before healing kicks in (ms)
pub const DIRECT_MATCH_TIMEOUT_MS: u64 = 3000;

/// Resolves selectors through the direct match and, when enabled, the
/// ordered healing cascade.
///
/// Owns the healing log for the run it serves; every successful fallback
/// appends one entry.
#[derive(Debug, Clone)]
pub struct LocatorResolver {
    self_heal: bool,
    threshold: f64,
    log: HealingLog,
}

impl LocatorResolver {
    pub fn new(self_heal: bool, threshold: f64) -> Self {
        Self {
            self_heal,
            threshold,
            log: HealingLog::new(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.self_heal, config.self_heal_threshold)
    }

    /// Resolve `selector` against the current page
    ///
    /// Returns the original selector untouched when it is visible in time.
    /// Otherwise strategies run in [`HealStrategy::ORDER`] and the first one
    /// that accepts wins.
    pub async fn resolve<Q: ElementQuery + ?Sized>(
        &mut self,
        query: &Q,
        selector: &str,
    ) -> Result<Resolution, FlowError> {
        match query
            .wait_for_visible(selector, DIRECT_MATCH_TIMEOUT_MS)
            .await
        {
            Ok(true) => return Ok(Resolution::direct(selector)),
            Ok(false) => debug!("Selector {} not visible", selector),
            Err(e) => debug!("Direct lookup of {} failed: {:#}", selector, e),
        }

        if !self.self_heal {
            return Err(FlowError::not_found(selector, false));
        }

        let hints = SelectorHints::from_selector(selector);
        let attempt = HealAttempt {
            original: selector,
            hints: &hints,
            threshold: self.threshold,
        };

        for strategy in HealStrategy::ORDER {
            if let Some(resolution) = strategy.attempt(query, &attempt).await {
                if let Some(record) = &resolution.healed {
                    info!(
                        "Healed selector {} -> {} via {} ({:.2})",
                        record.original, record.healed, record.strategy, record.confidence
                    );
                    self.log.record(record.clone());
                }
                return Ok(resolution);
            }
        }

        Err(FlowError::not_found(selector, true))
    }

    pub fn healing_log(&self) -> &[HealedSelector] {
        self.log.entries()
    }

    /// Hand over the run's healing log and start a fresh one
    pub fn take_log(&mut self) -> Vec<HealedSelector> {
        self.log.take()
    }
}
