//! Mobile and desktop step execution through an automation bridge

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use super::executor::StepExecutor;
use crate::driver::bridge::{BridgeClient, BridgeCommand};
use crate::error::FlowError;
use crate::parser::{RunnerKind, Step, StepAction};
use crate::utils::config::RunConfig;

/// Forwards steps to a bridge that owns element lookup on the device/app
pub struct BridgeRunner {
    kind: RunnerKind,
    client: Box<dyn BridgeClient>,
    config: RunConfig,
}

impl BridgeRunner {
    pub fn new(kind: RunnerKind, client: Box<dyn BridgeClient>, config: &RunConfig) -> Self {
        Self {
            kind,
            client,
            config: config.clone(),
        }
    }

    async fn forward(&self, command: BridgeCommand) -> Result<Option<Value>> {
        let action = command.action.clone();
        debug!("Forwarding {} to bridge at {}", action, self.client.endpoint());
        let reply = self.client.send(&command).await?;
        if !reply.ok {
            let reason = reply
                .error
                .unwrap_or_else(|| "bridge reported failure".to_string());
            return Err(FlowError::step(format!("{} failed: {}", action, reason)).into());
        }
        Ok(reply.value)
    }
}

#[async_trait]
impl StepExecutor for BridgeRunner {
    fn kind(&self) -> RunnerKind {
        self.kind
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        let timeout_ms = self.config.step_timeout(step.timeout);

        match &step.action {
            StepAction::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
            }
            StepAction::Screenshot { path } => {
                let mut params = Map::new();
                if let Some(path) = path {
                    params.insert("path".to_string(), Value::from(path.as_str()));
                }
                self.forward(BridgeCommand::new("screenshot", params, timeout_ms))
                    .await?;
            }
            // The bridge reports the element's text; comparison stays here
            StepAction::ExpectText {
                selector,
                text,
                exact,
            } => {
                let mut params = Map::new();
                params.insert("selector".to_string(), Value::from(selector.as_str()));
                let value = self
                    .forward(BridgeCommand::new("getText", params, timeout_ms))
                    .await?;
                let actual = value
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                super::web::check_text("Text", &actual, text, *exact)?;
            }
            action if self.kind.supports(action) => {
                self.forward(BridgeCommand::new(action.name(), action.params(), timeout_ms))
                    .await?;
            }
            other => {
                return Err(FlowError::unsupported_action(other.name(), self.kind.as_str()).into())
            }
        }

        Ok(())
    }

    async fn capture_screenshot(&mut self, path: &Path) -> Result<bool> {
        let mut params = Map::new();
        params.insert(
            "path".to_string(),
            Value::from(path.to_string_lossy().to_string()),
        );
        self.forward(BridgeCommand::new("screenshot", params, 10_000))
            .await?;
        Ok(true)
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.client.close().await
    }
}
