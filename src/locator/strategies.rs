//! Fallback strategies of the healing cascade
//!
//! Each strategy is a standalone probe routine: given the failed selector's
//! hints it either returns a resolution or declines. Probe failures and
//! ambiguous counts are declines, never errors.

use super::hints::SelectorHints;
use super::similarity::best_match;
use super::types::{ElementHandle, HealStrategy, HealedSelector, Resolution};
use super::ElementQuery;
use log::debug;

/// Stable attributes probed per identifier, with their confidence
pub const STABLE_ATTRIBUTES: [(&str, f64); 2] = [("data-testid", 0.9), ("aria-label", 0.85)];

pub const ROLES: [&str; 7] = [
    "button", "link", "textbox", "checkbox", "radio", "combobox", "menuitem",
];

pub const CONTAINER_TAGS: [&str; 7] = ["button", "a", "input", "span", "div", "label", "p"];

pub const ROLE_EXACT_CONFIDENCE: f64 = 0.8;
pub const ROLE_PARTIAL_CONFIDENCE: f64 = 0.7;
pub const CSS_CONTAINS_CONFIDENCE: f64 = 0.65;

/// Accepted match-count range for the css-contains probe
pub const CSS_CONTAINS_MAX_MATCHES: usize = 3;

/// Candidate pool limits for text similarity
pub const MAX_TEXT_CANDIDATES: usize = 100;
pub const MAX_TEXT_LEN: usize = 99;

/// Inputs shared by every strategy for one failed selector
#[derive(Debug, Clone)]
pub struct HealAttempt<'a> {
    pub original: &'a str,
    pub hints: &'a SelectorHints,
    /// Minimum text-similarity score
    pub threshold: f64,
}

impl HealStrategy {
    /// Run this strategy against the current page state
    pub async fn attempt<Q: ElementQuery + ?Sized>(
        self,
        query: &Q,
        attempt: &HealAttempt<'_>,
    ) -> Option<Resolution> {
        match self {
            HealStrategy::DataTestidFuzzy => stable_attribute(query, attempt).await,
            HealStrategy::TextSimilarity => text_similarity(query, attempt).await,
            HealStrategy::RoleName => role_name(query, attempt).await,
            HealStrategy::CssContains => css_contains(query, attempt).await,
        }
    }
}

/// `[data-testid="id"]` then `[aria-label="id"]` per identifier; exactly one match
pub async fn stable_attribute<Q: ElementQuery + ?Sized>(
    query: &Q,
    attempt: &HealAttempt<'_>,
) -> Option<Resolution> {
    for identifier in &attempt.hints.identifiers {
        for (attribute, confidence) in STABLE_ATTRIBUTES {
            let candidate = format!("[{}={}]", attribute, quote(identifier));
            if probe(query, &candidate).await == 1 {
                return Some(healed(
                    attempt,
                    candidate,
                    HealStrategy::DataTestidFuzzy,
                    confidence,
                ));
            }
        }
    }
    None
}

/// Fuzzy-match text hints against visible interactive labels
pub async fn text_similarity<Q: ElementQuery + ?Sized>(
    query: &Q,
    attempt: &HealAttempt<'_>,
) -> Option<Resolution> {
    if attempt.hints.texts.is_empty() {
        return None;
    }

    let pool = match query.interactive_texts().await {
        Ok(texts) => candidate_pool(texts),
        Err(e) => {
            debug!("Collecting interactive texts failed: {:#}", e);
            return None;
        }
    };
    if pool.is_empty() {
        return None;
    }

    for hint in &attempt.hints.texts {
        let Some((text, score)) = best_match(hint, &pool) else {
            continue;
        };
        if score < attempt.threshold {
            debug!(
                "Best text match for '{}' is '{}' ({:.2}), below threshold",
                hint, text, score
            );
            continue;
        }
        let candidate = format!("text={}", quote(text));
        if probe(query, &candidate).await >= 1 {
            return Some(healed(
                attempt,
                candidate,
                HealStrategy::TextSimilarity,
                score,
            ));
        }
    }
    None
}

/// Accessible role plus name, exact then partial; exactly one match
pub async fn role_name<Q: ElementQuery + ?Sized>(
    query: &Q,
    attempt: &HealAttempt<'_>,
) -> Option<Resolution> {
    for hint in &attempt.hints.texts {
        for role in ROLES {
            let exact = format!("role={}[name={} s]", role, quote(hint));
            if probe(query, &exact).await == 1 {
                return Some(healed(
                    attempt,
                    exact,
                    HealStrategy::RoleName,
                    ROLE_EXACT_CONFIDENCE,
                ));
            }

            let partial = format!("role={}[name=/{}/i]", role, regex_literal(hint));
            if probe(query, &partial).await == 1 {
                return Some(healed(
                    attempt,
                    partial,
                    HealStrategy::RoleName,
                    ROLE_PARTIAL_CONFIDENCE,
                ));
            }
        }
    }
    None
}

/// Tag containing the hinted text; accepts a small number of matches
pub async fn css_contains<Q: ElementQuery + ?Sized>(
    query: &Q,
    attempt: &HealAttempt<'_>,
) -> Option<Resolution> {
    for hint in &attempt.hints.texts {
        for tag in CONTAINER_TAGS {
            let candidate = format!("{}:has-text({})", tag, quote(hint));
            let matches = probe(query, &candidate).await;
            if (1..=CSS_CONTAINS_MAX_MATCHES).contains(&matches) {
                let selector = if matches == 1 {
                    candidate
                } else {
                    format!("{} >> nth=0", candidate)
                };
                return Some(healed(
                    attempt,
                    selector,
                    HealStrategy::CssContains,
                    CSS_CONTAINS_CONFIDENCE,
                ));
            }
        }
    }
    None
}

/// Count matches, treating a failed probe as zero
async fn probe<Q: ElementQuery + ?Sized>(query: &Q, selector: &str) -> usize {
    match query.count(selector).await {
        Ok(count) => {
            debug!("Probe {} -> {} match(es)", selector, count);
            count
        }
        Err(e) => {
            debug!("Probe {} failed: {:#}", selector, e);
            0
        }
    }
}

fn candidate_pool(texts: Vec<String>) -> Vec<String> {
    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| (1..=MAX_TEXT_LEN).contains(&t.chars().count()))
        .take(MAX_TEXT_CANDIDATES)
        .collect()
}

fn healed(
    attempt: &HealAttempt<'_>,
    selector: String,
    strategy: HealStrategy,
    confidence: f64,
) -> Resolution {
    let record = HealedSelector::new(attempt.original, &selector, strategy, confidence);
    Resolution {
        handle: ElementHandle::new(selector),
        healed: Some(record),
    }
}

/// Double-quoted selector string literal
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Body of a `/.../` regex literal matching `value` verbatim
fn regex_literal(value: &str) -> String {
    regex::escape(value).replace('/', "\\/")
}
