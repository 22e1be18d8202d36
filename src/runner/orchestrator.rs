//! Flow lifecycle: setup → main → teardown, and sequential suite runs

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{EventEmitter, TestEvent};
use super::executor::{StepExecutor, StepRunner};
use super::session::{DefaultRunnerFactory, RunnerFactory, SessionGuard};
use super::state::{FlowResult, StepResult, SuiteResult};
use crate::locator::HealedSelector;
use crate::parser::{Flow, Phase, Step};
use crate::utils::config::RunConfig;

/// One finished flow plus the selectors healed while running it
#[derive(Debug, Clone)]
pub struct FlowRun {
    pub result: FlowResult,
    pub healed: Vec<HealedSelector>,
}

#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub result: SuiteResult,
    pub healed: Vec<HealedSelector>,
}

/// Drives flows through their phases against freshly created runners
pub struct FlowOrchestrator<F: RunnerFactory = DefaultRunnerFactory> {
    config: Arc<RunConfig>,
    emitter: EventEmitter,
    factory: F,
}

impl FlowOrchestrator<DefaultRunnerFactory> {
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self::with_factory(config, DefaultRunnerFactory)
    }
}

impl<F: RunnerFactory> FlowOrchestrator<F> {
    pub fn with_factory(config: Arc<RunConfig>, factory: F) -> Self {
        Self {
            config,
            emitter: EventEmitter::default(),
            factory,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.emitter.subscribe()
    }

    /// Run every flow in order; flows missing a required tag are skipped
    pub async fn run_suite(&self, flows: &[Flow]) -> SuiteRun {
        let session_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        self.emitter.emit(TestEvent::SuiteStarted {
            session_id: session_id.clone(),
            flow_count: flows.len(),
        });

        let mut results = Vec::with_capacity(flows.len());
        let mut healed = Vec::new();

        for flow in flows {
            if !flow.matches_tags(&self.config.tags) {
                self.emitter.emit(TestEvent::FlowSkipped {
                    flow_name: flow.name.clone(),
                    reason: format!("missing required tags {:?}", self.config.tags),
                });
                results.push(FlowResult::skipped(&flow.name));
                continue;
            }

            let run = self.run_flow(flow).await;
            healed.extend(run.healed);
            results.push(run.result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = SuiteResult::from_flows(&session_id, results, duration_ms);
        info!(
            "Suite {} finished: {} passed, {} failed, {} skipped",
            session_id, result.summary.passed, result.summary.failed, result.summary.skipped
        );
        self.emitter.emit(TestEvent::SuiteFinished {
            summary: result.summary.clone(),
            duration_ms,
        });

        SuiteRun { result, healed }
    }

    /// Run one flow. Never fails: every problem ends up in the FlowResult.
    pub async fn run_flow(&self, flow: &Flow) -> FlowRun {
        let start_time = Utc::now();
        self.emitter.emit(TestEvent::FlowStarted {
            flow_name: flow.name.clone(),
            runner: flow.runner.to_string(),
            step_count: flow.total_steps(),
        });

        let executor = match self.factory.create(flow, &self.config).await {
            Ok(executor) => executor,
            Err(e) => {
                warn!("Flow '{}' could not start: {}", flow.name, e);
                let result =
                    FlowResult::new(&flow.name, start_time, Utc::now(), Vec::new(), Some(e.to_string()));
                self.finish(&result);
                return FlowRun {
                    result,
                    healed: Vec::new(),
                };
            }
        };

        let mut session = SessionGuard::new(executor);
        let steps = match session.executor() {
            Some(executor) => self.run_phases(executor, flow).await,
            None => Vec::new(),
        };

        let (healed, released) = session.release().await;
        let error = released
            .err()
            .map(|e| format!("Failed to release {} session: {:#}", flow.runner, e));

        let result = FlowResult::new(&flow.name, start_time, Utc::now(), steps, error);
        self.finish(&result);
        FlowRun { result, healed }
    }

    async fn run_phases(&self, executor: &mut dyn StepExecutor, flow: &Flow) -> Vec<StepResult> {
        let runner = StepRunner::new(&self.config, &self.emitter, &flow.name);
        let total = flow.total_steps();
        let setup = flow.setup_steps();
        let mut results = Vec::with_capacity(total);

        let setup_aborted =
            run_phase(&runner, executor, setup, Phase::Setup, 0, total, true, &mut results).await;

        if setup_aborted {
            info!("Setup of '{}' failed, skipping main steps", flow.name);
        } else {
            run_phase(
                &runner,
                executor,
                &flow.steps,
                Phase::Main,
                setup.len(),
                total,
                true,
                &mut results,
            )
            .await;
        }

        run_phase(
            &runner,
            executor,
            flow.teardown_steps(),
            Phase::Teardown,
            setup.len() + flow.steps.len(),
            total,
            false,
            &mut results,
        )
        .await;

        results
    }

    fn finish(&self, result: &FlowResult) {
        self.emitter.emit(TestEvent::FlowFinished {
            flow_name: result.name.clone(),
            status: result.status,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
        });
    }
}

/// Run a phase's steps in order. Returns true when a failing step stopped it.
#[allow(clippy::too_many_arguments)]
async fn run_phase(
    runner: &StepRunner<'_>,
    executor: &mut dyn StepExecutor,
    steps: &[Step],
    phase: Phase,
    offset: usize,
    total: usize,
    stop_on_failure: bool,
    results: &mut Vec<StepResult>,
) -> bool {
    for (i, step) in steps.iter().enumerate() {
        let result = runner
            .run_step(executor, step, phase, offset + i + 1, total)
            .await;
        let stop = stop_on_failure && result.failed() && !step.continue_on_error;
        results.push(result);
        if stop {
            return true;
        }
    }
    false
}
