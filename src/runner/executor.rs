use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::events::{EventEmitter, TestEvent};
use super::state::{StepResult, StepStatus};
use crate::error::FlowError;
use crate::locator::HealedSelector;
use crate::parser::{Phase, RunnerKind, Step};
use crate::utils::config::RunConfig;

/// Upper bound for a best-effort failure screenshot
const SCREENSHOT_TIMEOUT_MS: u64 = 10_000;

/// Executes steps against one live target (page, HTTP endpoint, app, ...)
///
/// One executor serves exactly one flow run and owns its target exclusively.
#[async_trait]
pub trait StepExecutor: Send {
    fn kind(&self) -> RunnerKind;

    /// Perform the step's action or assertion
    async fn execute(&mut self, step: &Step) -> Result<()>;

    /// Selector healed while executing the last step, whether it passed or not
    fn take_step_heal(&mut self) -> Option<HealedSelector> {
        None
    }

    /// Capture the target's current state to `path`.
    /// Returns `false` when the target has nothing to capture.
    async fn capture_screenshot(&mut self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    /// Hand over the healed-selector log accumulated during the run
    fn take_healing_log(&mut self) -> Vec<HealedSelector> {
        Vec::new()
    }

    /// Release the live target
    async fn shutdown(&mut self) -> Result<()>;
}

/// Runs single steps and turns every outcome into a [`StepResult`]
pub struct StepRunner<'a> {
    config: &'a RunConfig,
    emitter: &'a EventEmitter,
    flow_name: &'a str,
}

impl<'a> StepRunner<'a> {
    pub fn new(config: &'a RunConfig, emitter: &'a EventEmitter, flow_name: &'a str) -> Self {
        Self {
            config,
            emitter,
            flow_name,
        }
    }

    /// Execute one step. Never fails: errors become a failed result.
    pub async fn run_step(
        &self,
        executor: &mut dyn StepExecutor,
        step: &Step,
        phase: Phase,
        index: usize,
        total: usize,
    ) -> StepResult {
        self.emitter.emit(TestEvent::StepStarted {
            flow_name: self.flow_name.to_string(),
            phase,
            index,
            total,
            step: step.display_name(),
        });

        let start = Instant::now();
        let outcome = self.dispatch(executor, step).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let healed_selector = executor.take_step_heal();
        if let Some(ref record) = healed_selector {
            self.emitter.emit(TestEvent::SelectorHealed {
                flow_name: self.flow_name.to_string(),
                record: record.clone(),
            });
        }

        match outcome {
            Ok(()) => {
                self.emitter.emit(TestEvent::StepPassed {
                    flow_name: self.flow_name.to_string(),
                    index,
                    duration_ms,
                });

                StepResult {
                    step: step.clone(),
                    phase,
                    index,
                    status: StepStatus::Passed,
                    duration_ms,
                    error: None,
                    screenshot: None,
                    healed_selector,
                }
            }
            Err(e) => {
                let error = format!("{:#}", e);
                debug!("Step {} failed: {}", index, error);

                let screenshot = if self.config.screenshot_on_failure && step.is_ui_bound() {
                    self.capture_failure(executor, index).await
                } else {
                    None
                };

                self.emitter.emit(TestEvent::StepFailed {
                    flow_name: self.flow_name.to_string(),
                    index,
                    error: error.clone(),
                    duration_ms,
                });

                StepResult {
                    step: step.clone(),
                    phase,
                    index,
                    status: StepStatus::Failed,
                    duration_ms,
                    error: Some(error),
                    screenshot,
                    healed_selector,
                }
            }
        }
    }

    /// Vocabulary check, then the action under the step's timeout
    async fn dispatch(&self, executor: &mut dyn StepExecutor, step: &Step) -> Result<()> {
        let kind = executor.kind();
        if !kind.supports(&step.action) {
            return Err(FlowError::unsupported_action(step.action.name(), kind.as_str()).into());
        }

        let timeout_ms = self.config.step_timeout(step.timeout);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), executor.execute(step)).await
        {
            Ok(result) => result,
            Err(_) => Err(FlowError::timeout(step.display_name(), timeout_ms).into()),
        }
    }

    /// Best-effort screenshot; any failure is logged and swallowed
    async fn capture_failure(&self, executor: &mut dyn StepExecutor, index: usize) -> Option<String> {
        let path = self.failure_screenshot_path(index);
        let capture = executor.capture_screenshot(&path);

        match tokio::time::timeout(Duration::from_millis(SCREENSHOT_TIMEOUT_MS), capture).await {
            Ok(Ok(true)) => Some(path.to_string_lossy().to_string()),
            Ok(Ok(false)) => None,
            Ok(Err(e)) => {
                warn!("Failed to capture failure screenshot: {:#}", e);
                self.log(format!("Screenshot skipped: {:#}", e));
                None
            }
            Err(_) => {
                warn!("Failure screenshot timed out");
                self.log(format!("Screenshot skipped: timed out after {}ms", SCREENSHOT_TIMEOUT_MS));
                None
            }
        }
    }

    fn log(&self, message: String) {
        self.emitter.emit(TestEvent::Log { message });
    }

    fn failure_screenshot_path(&self, index: usize) -> PathBuf {
        let safe_flow_name: String = self
            .flow_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let uuid = Uuid::new_v4().to_string();

        self.config.output_dir.join("screenshots").join(format!(
            "fail_{}_step{}_{}.png",
            safe_flow_name,
            index,
            &uuid[..8]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StepAction;

    /// Web executor with a fixed delay whose screenshots always fail
    struct SlowExecutor {
        delay_ms: u64,
        screenshots: usize,
    }

    #[async_trait]
    impl StepExecutor for SlowExecutor {
        fn kind(&self) -> RunnerKind {
            RunnerKind::Web
        }

        async fn execute(&mut self, _step: &Step) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(())
        }

        async fn capture_screenshot(&mut self, _path: &Path) -> Result<bool> {
            self.screenshots += 1;
            anyhow::bail!("page crashed")
        }

        async fn shutdown(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn click() -> Step {
        Step::new(StepAction::Click {
            selector: "#go".to_string(),
        })
    }

    #[tokio::test]
    async fn test_passed_step() {
        let config = RunConfig::default();
        let emitter = EventEmitter::default();
        let runner = StepRunner::new(&config, &emitter, "flow");
        let mut executor = SlowExecutor {
            delay_ms: 0,
            screenshots: 0,
        };

        let result = runner
            .run_step(&mut executor, &click(), Phase::Main, 2, 5)
            .await;
        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(result.index, 2);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_result() {
        let config = RunConfig::default();
        let emitter = EventEmitter::default();
        let mut events = emitter.subscribe();
        let runner = StepRunner::new(&config, &emitter, "flow");
        let mut executor = SlowExecutor {
            delay_ms: 1_000,
            screenshots: 0,
        };

        let result = runner
            .run_step(&mut executor, &click().with_timeout(20), Phase::Main, 1, 1)
            .await;
        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.error.unwrap().contains("Timed out after 20ms"));
        // Capture failure is swallowed
        assert_eq!(executor.screenshots, 1);
        assert!(result.screenshot.is_none());

        let mut logged = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let TestEvent::Log { message } = event {
                logged.push(message);
            }
        }
        assert_eq!(logged, vec!["Screenshot skipped: page crashed".to_string()]);
    }

    #[tokio::test]
    async fn test_unsupported_action_fails_at_dispatch() {
        let config = RunConfig::default();
        let emitter = EventEmitter::default();
        let runner = StepRunner::new(&config, &emitter, "flow");
        let mut executor = SlowExecutor {
            delay_ms: 0,
            screenshots: 0,
        };
        let step = Step::new(StepAction::ExpectStatus { status: 200 });

        let result = runner
            .run_step(&mut executor, &step, Phase::Main, 1, 1)
            .await;
        assert_eq!(result.status, StepStatus::Failed);
        assert!(result
            .error
            .unwrap()
            .contains("Unsupported action 'expectStatus' for web runner"));
        // Not UI-bound, no screenshot attempt
        assert_eq!(executor.screenshots, 0);
    }
}
