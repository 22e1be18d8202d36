mod common;

use common::{FakeFactory, FakePage};
use lumi_flow::locator::HealStrategy;
use lumi_flow::parser::{Flow, Phase, RunnerKind, Step, StepAction};
use lumi_flow::runner::{FlowOrchestrator, FlowStatus, StepStatus, TestEvent};
use lumi_flow::utils::config::RunConfig;
use lumi_flow::FlowError;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn goto(url: &str) -> Step {
    Step::new(StepAction::Goto {
        url: url.to_string(),
    })
}

fn click(selector: &str) -> Step {
    Step::new(StepAction::Click {
        selector: selector.to_string(),
    })
}

fn web_flow(name: &str, setup: Vec<Step>, steps: Vec<Step>, teardown: Vec<Step>) -> Flow {
    Flow {
        name: name.to_string(),
        runner: RunnerKind::Web,
        tags: Vec::new(),
        base_url: Some("https://shop.test".to_string()),
        setup: (!setup.is_empty()).then_some(setup),
        steps,
        teardown: (!teardown.is_empty()).then_some(teardown),
    }
}

fn orchestrator(factory: FakeFactory, config: RunConfig) -> FlowOrchestrator<FakeFactory> {
    let config = RunConfig {
        screenshot_on_failure: false,
        ..config
    };
    FlowOrchestrator::with_factory(Arc::new(config), factory)
}

#[tokio::test]
async fn test_login_flow_heals_renamed_button() {
    let page = FakePage::new()
        .visible("#email")
        .count(r#"[data-testid="login"]"#, 1)
        .title("Dashboard");
    let flow = web_flow(
        "login",
        vec![],
        vec![
            goto("/login"),
            Step::new(StepAction::Fill {
                selector: "#email".to_string(),
                value: "ada@shop.test".to_string(),
            }),
            click("#login-btn"),
            Step::new(StepAction::ExpectTitle {
                title: "Dash".to_string(),
                exact: false,
            }),
        ],
        vec![],
    );

    let run = orchestrator(FakeFactory::new(page.clone()), RunConfig::default())
        .run_flow(&flow)
        .await;

    assert_eq!(run.result.status, FlowStatus::Passed);
    assert!(run.result.error.is_none());
    let healed = run.result.steps[2].healed_selector.as_ref().unwrap();
    assert_eq!(healed.strategy, HealStrategy::DataTestidFuzzy);
    assert_eq!(run.healed.len(), 1);
    assert_eq!(
        page.actions(),
        vec![
            "goto https://shop.test/login".to_string(),
            "fill #email ada@shop.test".to_string(),
            r#"click [data-testid="login"]"#.to_string(),
        ]
    );
    assert_eq!(page.closed(), 1);
}

#[tokio::test]
async fn test_failed_step_keeps_its_healed_selector() {
    let page = FakePage::new().count(r#"[data-testid="login"]"#, 1);
    let flow = web_flow(
        "login",
        vec![],
        vec![Step::new(StepAction::ExpectText {
            selector: "#login-btn".to_string(),
            text: "Sign In".to_string(),
            exact: true,
        })],
        vec![],
    );

    let run = orchestrator(FakeFactory::new(page), RunConfig::default())
        .run_flow(&flow)
        .await;
    let step = &run.result.steps[0];

    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().starts_with("Text mismatch"));
    let healed = step.healed_selector.as_ref().unwrap();
    assert_eq!(healed.healed, r#"[data-testid="login"]"#);
    assert_eq!(run.healed, vec![healed.clone()]);
}

#[tokio::test]
async fn test_expect_hidden_reports_element_still_visible() {
    let page = FakePage::new().visible("#banner");
    let flow = web_flow(
        "dismiss",
        vec![],
        vec![Step::new(StepAction::ExpectHidden {
            selector: "#banner".to_string(),
        })
        .with_timeout(2_000)],
        vec![],
    );

    let run = orchestrator(FakeFactory::new(page), RunConfig::default())
        .run_flow(&flow)
        .await;

    assert_eq!(
        run.result.steps[0].error.as_deref(),
        Some("Element is still visible after 1800ms: #banner")
    );
}

#[tokio::test]
async fn test_setup_failure_skips_main_but_runs_teardown() {
    let page = FakePage::new().visible("#cart");
    let flow = web_flow(
        "checkout",
        vec![click("#missing")],
        vec![click("#cart"), click("#cart")],
        vec![goto("/logout"), goto("/")],
    );

    let run = orchestrator(FakeFactory::new(page.clone()), RunConfig::default())
        .run_flow(&flow)
        .await;
    let steps = &run.result.steps;

    assert_eq!(run.result.status, FlowStatus::Failed);
    assert_eq!(
        steps.iter().map(|s| (s.phase, s.index)).collect::<Vec<_>>(),
        vec![(Phase::Setup, 1), (Phase::Teardown, 4), (Phase::Teardown, 5)]
    );
    assert_eq!(
        steps[0].error.as_deref(),
        Some("Element not found: #missing (self-healing failed)")
    );
    assert!(steps[1..].iter().all(|s| s.status == StepStatus::Passed));
    assert_eq!(page.closed(), 1);
}

#[tokio::test]
async fn test_main_failure_without_continue_stops_main() {
    let page = FakePage::new().visible("#ok");
    let flow = web_flow(
        "profile",
        vec![],
        vec![
            click("#gone").continue_on_error(),
            click("#ok"),
            click("#gone"),
            click("#ok"),
        ],
        vec![goto("/logout")],
    );
    let config = RunConfig {
        self_heal: false,
        ..RunConfig::default()
    };

    let run = orchestrator(FakeFactory::new(page), config)
        .run_flow(&flow)
        .await;

    assert_eq!(
        run.result
            .steps
            .iter()
            .map(|s| (s.index, s.status))
            .collect::<Vec<_>>(),
        vec![
            (1, StepStatus::Failed),
            (2, StepStatus::Passed),
            (3, StepStatus::Failed),
            (5, StepStatus::Passed),
        ]
    );
    assert_eq!(
        run.result.steps[0].error.as_deref(),
        Some("Element not found: #gone")
    );
}

#[tokio::test]
async fn test_runner_init_failure_has_no_steps() {
    let factory = FakeFactory::failing(FlowError::init("web", "browser not installed"));
    let flow = web_flow("home", vec![], vec![goto("/")], vec![goto("/")]);

    let run = orchestrator(factory, RunConfig::default())
        .run_flow(&flow)
        .await;

    assert_eq!(run.result.status, FlowStatus::Failed);
    assert!(run.result.steps.is_empty());
    assert_eq!(
        run.result.error.as_deref(),
        Some("Failed to initialize web runner: browser not installed")
    );
}

#[tokio::test]
async fn test_release_failure_fails_flow() {
    let page = FakePage::new().failing_close();
    let flow = web_flow("home", vec![], vec![goto("/")], vec![]);

    let run = orchestrator(FakeFactory::new(page.clone()), RunConfig::default())
        .run_flow(&flow)
        .await;

    assert!(run.result.steps.iter().all(|s| s.passed()));
    assert_eq!(run.result.status, FlowStatus::Failed);
    assert!(run
        .result
        .error
        .unwrap()
        .starts_with("Failed to release web session"));
    assert_eq!(page.closed(), 1);
}

#[tokio::test]
async fn test_suite_summary_counts_skipped_flows() {
    let page = FakePage::new().visible("#ok");
    let mut smoke_pass = web_flow("smoke-pass", vec![], vec![click("#ok")], vec![]);
    smoke_pass.tags = vec!["smoke".to_string()];
    let untagged = web_flow("nightly", vec![], vec![click("#ok")], vec![]);
    let mut smoke_fail = web_flow("smoke-fail", vec![], vec![click("#nope")], vec![]);
    smoke_fail.tags = vec!["smoke".to_string(), "cart".to_string()];

    let config = RunConfig {
        tags: vec!["smoke".to_string()],
        self_heal: false,
        ..RunConfig::default()
    };
    let orchestrator = orchestrator(FakeFactory::new(page.clone()), config);
    let mut events = orchestrator.subscribe();

    let run = orchestrator
        .run_suite(&[smoke_pass, untagged, smoke_fail])
        .await;
    let summary = &run.result.summary;

    assert_eq!(
        run.result
            .flows
            .iter()
            .map(|f| (f.name.as_str(), f.status))
            .collect::<Vec<_>>(),
        vec![
            ("smoke-pass", FlowStatus::Passed),
            ("nightly", FlowStatus::Skipped),
            ("smoke-fail", FlowStatus::Failed),
        ]
    );
    assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 1, 1));
    assert_eq!(summary.total, summary.passed + summary.failed + summary.skipped);
    assert!(!run.result.passed());
    // Skipped flows never open a session
    assert_eq!(page.closed(), 2);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(matches!(received.first(), Some(TestEvent::SuiteStarted { flow_count: 3, .. })));
    assert!(matches!(received.last(), Some(TestEvent::SuiteFinished { .. })));
    assert!(received
        .iter()
        .any(|e| matches!(e, TestEvent::FlowSkipped { flow_name, .. } if flow_name == "nightly")));
}
