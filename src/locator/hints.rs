//! Hint extraction from a failed selector
//!
//! Two kinds of hints drive the fallback strategies:
//! - **identifiers**: raw tokens likely to reappear as `data-testid` or
//!   `aria-label` values (`#id`, `.class`, `[attr="value"]`, `text="..."`)
//! - **text hints**: words likely to appear in the rendered label of the
//!   element the selector was meant to hit

use regex::Regex;
use std::sync::LazyLock;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z_][A-Za-z0-9_-]*)").unwrap());
static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Za-z_][A-Za-z0-9_-]*)").unwrap());
static ATTR_VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[[^\]=]+=\s*["']([^"']+)["']"#).unwrap());
static TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"text\s*=\s*["']([^"']+)["']"#).unwrap());
static HAS_TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#":has-text\(\s*["']([^"']+)["']\s*\)"#).unwrap());
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());

/// Class fragments that usually name the element's visible label
const INTERACTIVE_KEYWORDS: &[&str] = &[
    "login", "submit", "cancel", "save", "delete", "edit", "add", "search", "next", "prev",
    "close", "open",
];

/// Id words that describe the widget rather than its label
const GENERIC_WORDS: &[&str] = &["btn", "button", "link", "input", "field"];

/// Hints extracted once per failed selector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorHints {
    pub identifiers: Vec<String>,
    pub texts: Vec<String>,
}

impl SelectorHints {
    pub fn from_selector(selector: &str) -> Self {
        Self {
            identifiers: identifiers(selector),
            texts: text_hints(selector),
        }
    }
}

/// Candidate identifiers in extraction order, tokens of three chars or more
///
/// Each token is followed by its `-`/`_` separated fragments, so `#login-btn`
/// yields `login-btn`, `login`, `btn`.
pub fn identifiers(selector: &str) -> Vec<String> {
    let bare = unquoted(selector);
    let scans = [
        (&*ID_PATTERN, bare.as_str()),
        (&*CLASS_PATTERN, bare.as_str()),
        (&*ATTR_VALUE_PATTERN, selector),
        (&*TEXT_PATTERN, selector),
    ];
    let mut out = Vec::new();
    for (pattern, haystack) in scans {
        for caps in pattern.captures_iter(haystack) {
            let token = caps[1].trim();
            push_token(&mut out, token);
            if token.contains(['-', '_']) {
                for fragment in token.split(['-', '_']) {
                    push_token(&mut out, fragment);
                }
            }
        }
    }
    out
}

/// Text hints in priority order, deduplicated case-insensitively
pub fn text_hints(selector: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |hint: String| {
        let hint = hint.trim().to_string();
        if !hint.is_empty() && !out.iter().any(|h| h.eq_ignore_ascii_case(&hint)) {
            out.push(hint);
        }
    };

    for caps in TEXT_PATTERN.captures_iter(selector) {
        push(caps[1].to_string());
    }
    for caps in HAS_TEXT_PATTERN.captures_iter(selector) {
        push(caps[1].to_string());
    }

    let bare = unquoted(selector);
    for caps in CLASS_PATTERN.captures_iter(&bare) {
        let class = caps[1].to_lowercase();
        if let Some(rest) = class.strip_prefix("btn-") {
            push(rest.replace(['-', '_'], " "));
        }
        for fragment in class.split(['-', '_']) {
            if INTERACTIVE_KEYWORDS.contains(&fragment) {
                push(fragment.to_string());
            }
        }
    }

    for caps in ID_PATTERN.captures_iter(&bare) {
        let words: Vec<String> = caps[1]
            .split(['-', '_'])
            .map(str::to_lowercase)
            .filter(|w| !w.is_empty() && !GENERIC_WORDS.contains(&w.as_str()))
            .collect();
        push(words.join(" "));
    }

    out
}

/// `#` and `.` inside quoted values are text, not id or class markers
fn unquoted(selector: &str) -> String {
    QUOTED.replace_all(selector, " ").into_owned()
}

fn push_token(out: &mut Vec<String>, token: &str) {
    if token.chars().count() > 2 && !out.iter().any(|t| t == token) {
        out.push(token.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_from_id() {
        assert_eq!(identifiers("#login-btn"), vec!["login-btn", "login", "btn"]);
    }

    #[test]
    fn test_identifiers_skip_short_tokens() {
        assert_eq!(identifiers("#ok"), Vec::<String>::new());
        assert_eq!(identifiers("div.x-panel"), vec!["x-panel", "panel"]);
    }

    #[test]
    fn test_identifiers_from_attribute_and_text() {
        let ids = identifiers(r#"button[name="checkout"] >> text="Pay now""#);
        assert_eq!(ids, vec!["checkout", "Pay now"]);
    }

    #[test]
    fn test_quoted_values_hide_id_and_class_markers() {
        assert_eq!(identifiers(r#"text="Pay.now""#), vec!["Pay.now"]);
        assert_eq!(text_hints(r#"text="Pay.now""#), vec!["Pay.now"]);

        let ids = identifiers(r##"a[href="#top-nav"]"##);
        assert_eq!(ids, vec!["#top-nav", "#top", "nav"]);
        assert!(text_hints(r##"a[href="#top-nav"]"##).is_empty());
    }

    #[test]
    fn test_text_hints_explicit_text_first() {
        let hints = text_hints(r#"button:has-text("Continue") >> text="Sign In""#);
        assert_eq!(hints, vec!["Sign In", "Continue"]);
    }

    #[test]
    fn test_text_hints_keyword_classes() {
        assert_eq!(text_hints(".btn-submit"), vec!["submit"]);
        assert_eq!(text_hints("a.nav-search-link"), vec!["search"]);
        assert_eq!(text_hints(".btn-add-item"), vec!["add item", "add"]);
    }

    #[test]
    fn test_text_hints_from_id_drop_generic_words() {
        assert_eq!(text_hints("#login-btn"), vec!["login"]);
        assert_eq!(text_hints("#forgot_password_link"), vec!["forgot password"]);
        assert_eq!(text_hints("#submit-order-btn"), vec!["submit order"]);
        assert_eq!(text_hints("#btn"), Vec::<String>::new());
    }

    #[test]
    fn test_selector_hints_bundle() {
        let hints = SelectorHints::from_selector("#login-btn");
        assert_eq!(hints.identifiers.len(), 3);
        assert_eq!(hints.texts, vec!["login"]);
    }
}
