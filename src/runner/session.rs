//! Live-target acquisition and guaranteed release

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};

use super::api::ApiRunner;
use super::bridge::BridgeRunner;
use super::executor::StepExecutor;
use super::performance::PerformanceRunner;
use super::web::WebRunner;
use crate::driver::bridge::{BridgeClient, HttpBridgeClient};
use crate::driver::load::HttpLoadGenerator;
use crate::driver::web::{WebDriver, WebDriverConfig};
use crate::error::FlowError;
use crate::locator::HealedSelector;
use crate::parser::{Flow, RunnerKind};
use crate::utils::config::RunConfig;

/// Creates the executor (and its live target) for one flow run
#[async_trait]
pub trait RunnerFactory: Send + Sync {
    async fn create(
        &self,
        flow: &Flow,
        config: &RunConfig,
    ) -> Result<Box<dyn StepExecutor>, FlowError>;
}

/// Real targets: Playwright browser, HTTP client, bridges, load generator
pub struct DefaultRunnerFactory;

#[async_trait]
impl RunnerFactory for DefaultRunnerFactory {
    async fn create(
        &self,
        flow: &Flow,
        config: &RunConfig,
    ) -> Result<Box<dyn StepExecutor>, FlowError> {
        let kind = flow.runner;
        let init_err = |e: anyhow::Error| FlowError::init(kind.as_str(), format!("{:#}", e));
        let base_url = flow.base_url.clone().or_else(|| config.base_url.clone());

        let executor: Box<dyn StepExecutor> = match kind {
            RunnerKind::Web => {
                let driver = WebDriver::new(WebDriverConfig::from(config))
                    .await
                    .map_err(init_err)?;
                Box::new(WebRunner::new(Box::new(driver), config, base_url))
            }
            RunnerKind::Api => Box::new(ApiRunner::new(config, base_url).map_err(init_err)?),
            RunnerKind::Mobile | RunnerKind::Desktop => {
                let endpoint = if kind == RunnerKind::Mobile {
                    &config.mobile_bridge_url
                } else {
                    &config.desktop_bridge_url
                };
                let client = HttpBridgeClient::connect(endpoint)
                    .await
                    .map_err(init_err)?;
                debug!("Connected to {} bridge at {}", kind, client.endpoint());
                Box::new(BridgeRunner::new(kind, Box::new(client), config))
            }
            RunnerKind::Performance => {
                let generator = HttpLoadGenerator::new().map_err(init_err)?;
                Box::new(PerformanceRunner::new(Box::new(generator), config, base_url))
            }
        };

        debug!("Initialized {} runner for flow '{}'", kind, flow.name);
        Ok(executor)
    }
}

/// Scoped ownership of a flow's executor
///
/// [`SessionGuard::release`] is the normal exit. If the guard is dropped
/// without it (panic, early return), the target is shut down in the
/// background on the current runtime.
pub struct SessionGuard {
    executor: Option<Box<dyn StepExecutor>>,
}

impl SessionGuard {
    pub fn new(executor: Box<dyn StepExecutor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    pub fn executor(&mut self) -> Option<&mut (dyn StepExecutor + 'static)> {
        self.executor.as_deref_mut()
    }

    /// Take the healing log, then shut the target down
    pub async fn release(mut self) -> (Vec<HealedSelector>, Result<()>) {
        match self.executor.take() {
            Some(mut executor) => {
                let healed = executor.take_healing_log();
                let result = executor.shutdown().await;
                (healed, result)
            }
            None => (Vec::new(), Ok(())),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut executor) = self.executor.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = executor.shutdown().await {
                        warn!("Failed to release {} session: {:#}", executor.kind(), e);
                    }
                });
            }
            Err(_) => warn!(
                "{} session dropped outside a runtime; target not released",
                executor.kind()
            ),
        }
    }
}
