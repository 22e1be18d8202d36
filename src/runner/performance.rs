//! Load-test step execution

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::time::Duration;

use super::executor::StepExecutor;
use crate::driver::join_url;
use crate::driver::load::{LoadGenerator, LoadPlan, LoadReport};
use crate::error::FlowError;
use crate::parser::{RunnerKind, Step, StepAction};
use crate::utils::config::RunConfig;

pub struct PerformanceRunner {
    generator: Box<dyn LoadGenerator>,
    base_url: Option<String>,
    config: RunConfig,
    last: Option<LoadReport>,
}

impl PerformanceRunner {
    pub fn new(
        generator: Box<dyn LoadGenerator>,
        config: &RunConfig,
        base_url: Option<String>,
    ) -> Self {
        Self {
            generator,
            base_url,
            config: config.clone(),
            last: None,
        }
    }
}

#[async_trait]
impl StepExecutor for PerformanceRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Performance
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        match &step.action {
            StepAction::LoadTest {
                url,
                method,
                requests,
                concurrency,
            } => {
                let plan = LoadPlan {
                    url: join_url(self.base_url.as_deref(), url),
                    method: method.clone(),
                    requests: *requests,
                    concurrency: *concurrency,
                    timeout_ms: self.config.default_timeout_ms,
                };
                let report = self.generator.run(&plan).await?;
                info!(
                    "Load test {} {}: {} requests, avg {:.1}ms, p95 {:.1}ms, errors {}",
                    plan.method,
                    plan.url,
                    report.total,
                    report.avg(),
                    report.p95(),
                    report.errors
                );
                self.last = Some(report);
            }
            StepAction::ExpectMetric { metric, max } => {
                let report = self.last.as_ref().ok_or_else(|| {
                    FlowError::step("No load test results; run loadTest first")
                })?;
                let actual = report.metric(*metric);
                if actual > *max {
                    return Err(FlowError::step(format!(
                        "Metric {:?} is {:.3}, above the allowed {}",
                        metric, actual, max
                    ))
                    .into());
                }
            }
            StepAction::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
            }
            other => {
                return Err(FlowError::unsupported_action(other.name(), self.kind().as_str()).into())
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.last = None;
        Ok(())
    }
}
