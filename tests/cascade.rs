mod common;

use common::FakePage;
use lumi_flow::locator::{HealStrategy, LocatorResolver};
use lumi_flow::FlowError;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_direct_match_runs_no_strategy() {
    let page = FakePage::new()
        .visible("#login-btn")
        .count(r#"[data-testid="login"]"#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let resolution = resolver.resolve(&page, "#login-btn").await.unwrap();

    assert_eq!(resolution.handle.selector, "#login-btn");
    assert!(resolution.healed.is_none());
    assert!(page.probes().is_empty());
}

#[tokio::test]
async fn test_disabled_healing_fails_without_probing() {
    let page = FakePage::new()
        .count(r#"[data-testid="login"]"#, 1)
        .texts(&["Login"]);
    let mut resolver = LocatorResolver::new(false, 0.6);

    let err = resolver.resolve(&page, "#login-btn").await.unwrap_err();

    assert_eq!(err, FlowError::not_found("#login-btn", false));
    assert_eq!(page.lookups(), vec!["#login-btn".to_string()]);
    assert!(page.probes().is_empty());
    assert!(resolver.healing_log().is_empty());
}

#[tokio::test]
async fn test_renamed_id_heals_to_test_id() {
    let page = FakePage::new().count(r#"[data-testid="login"]"#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let resolution = resolver.resolve(&page, "#login-btn").await.unwrap();
    let record = resolution.healed.unwrap();

    assert_eq!(resolution.handle.selector, r#"[data-testid="login"]"#);
    assert_eq!(record.original, "#login-btn");
    assert_eq!(record.strategy, HealStrategy::DataTestidFuzzy);
    assert_eq!(record.confidence, 0.9);
    assert_eq!(resolver.healing_log().len(), 1);
}

#[tokio::test]
async fn test_earlier_strategy_wins_over_higher_confidence() {
    // A perfect text match exists, but the stable attribute strategy runs first
    let page = FakePage::new()
        .count(r#"[data-testid="login"]"#, 1)
        .count(r#"text="Login""#, 1)
        .texts(&["Login"]);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let record = resolver
        .resolve(&page, "#login-btn")
        .await
        .unwrap()
        .healed
        .unwrap();

    assert_eq!(record.strategy, HealStrategy::DataTestidFuzzy);
    assert!(!page.probes().contains(&r#"text="Login""#.to_string()));
}

#[tokio::test]
async fn test_changed_label_heals_by_text_similarity() {
    let page = FakePage::new()
        .texts(&["Cancel", "Submit Orders"])
        .count(r#"text="Submit Orders""#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let resolution = resolver.resolve(&page, "#submit-order-btn").await.unwrap();
    let record = resolution.healed.unwrap();

    assert_eq!(resolution.handle.selector, r#"text="Submit Orders""#);
    assert_eq!(record.strategy, HealStrategy::TextSimilarity);
    assert!(record.confidence > 0.9 && record.confidence < 1.0);
}

#[tokio::test]
async fn test_similarity_below_threshold_falls_through() {
    let page = FakePage::new()
        .texts(&["Cancel"])
        .count(r#"text="Cancel""#, 1)
        .count(r#"button:has-text("submit order")"#, 2);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let resolution = resolver.resolve(&page, "#submit-order-btn").await.unwrap();
    let record = resolution.healed.unwrap();

    assert_eq!(record.strategy, HealStrategy::CssContains);
    assert_eq!(
        resolution.handle.selector,
        r#"button:has-text("submit order") >> nth=0"#
    );
    assert_eq!(record.confidence, 0.65);
}

#[tokio::test]
async fn test_role_and_name_from_class_hint() {
    let page = FakePage::new().count(r#"role=button[name="save draft" s]"#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let record = resolver
        .resolve(&page, ".btn-save-draft")
        .await
        .unwrap()
        .healed
        .unwrap();

    assert_eq!(record.strategy, HealStrategy::RoleName);
    assert_eq!(record.healed, r#"role=button[name="save draft" s]"#);
    assert_eq!(record.confidence, 0.8);
}

#[tokio::test]
async fn test_role_with_several_matches_is_skipped() {
    let page = FakePage::new()
        .count(r#"role=button[name="save draft" s]"#, 2)
        .count(r#"role=link[name="save draft" s]"#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let record = resolver
        .resolve(&page, ".btn-save-draft")
        .await
        .unwrap()
        .healed
        .unwrap();

    assert_eq!(record.strategy, HealStrategy::RoleName);
    assert_eq!(record.healed, r#"role=link[name="save draft" s]"#);
}

#[tokio::test]
async fn test_ambiguous_candidates_are_rejected() {
    let page = FakePage::new()
        .count(r#"[data-testid="login"]"#, 2)
        .count(r#"button:has-text("login")"#, 4);
    let mut resolver = LocatorResolver::new(true, 0.6);

    let err = resolver.resolve(&page, "#login-btn").await.unwrap_err();

    assert_eq!(err, FlowError::not_found("#login-btn", true));
    assert!(resolver.healing_log().is_empty());
    assert!(page
        .probes()
        .contains(&r#"button:has-text("login")"#.to_string()));
}

#[tokio::test]
async fn test_healing_suggestion_names_both_selectors() {
    let page = FakePage::new().count(r#"[data-testid="login"]"#, 1);
    let mut resolver = LocatorResolver::new(true, 0.6);

    resolver.resolve(&page, "#login-btn").await.unwrap();
    let log = resolver.take_log();

    assert_eq!(log.len(), 1);
    assert!(log[0].suggestion.contains("#login-btn"));
    assert!(log[0].suggestion.contains(r#"[data-testid="login"]"#));
    assert!(resolver.healing_log().is_empty());
}
