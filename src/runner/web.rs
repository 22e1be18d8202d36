//! Browser step execution over a [`PlatformDriver`]

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::executor::StepExecutor;
use crate::driver::join_url;
use crate::driver::traits::PlatformDriver;
use crate::error::FlowError;
use crate::locator::{HealedSelector, LocatorResolver, Resolution};
use crate::parser::{RunnerKind, Step, StepAction};
use crate::utils::config::RunConfig;

/// Executes web steps; every selector goes through the locator cascade
pub struct WebRunner {
    driver: Box<dyn PlatformDriver>,
    resolver: LocatorResolver,
    base_url: Option<String>,
    config: RunConfig,
    /// Heal produced by the step in flight
    step_heal: Option<HealedSelector>,
}

impl WebRunner {
    pub fn new(driver: Box<dyn PlatformDriver>, config: &RunConfig, base_url: Option<String>) -> Self {
        Self {
            driver,
            resolver: LocatorResolver::from_config(config),
            base_url,
            config: config.clone(),
            step_heal: None,
        }
    }

    async fn locate(&mut self, selector: &str) -> Result<Resolution, FlowError> {
        let found = self.resolver.resolve(self.driver.as_ref(), selector).await?;
        if found.healed.is_some() {
            self.step_heal = found.healed.clone();
        }
        Ok(found)
    }

    fn url(&self, url: &str) -> String {
        join_url(self.base_url.as_deref(), url)
    }
}

#[async_trait]
impl StepExecutor for WebRunner {
    fn kind(&self) -> RunnerKind {
        RunnerKind::Web
    }

    async fn execute(&mut self, step: &Step) -> Result<()> {
        let timeout_ms = self.config.step_timeout(step.timeout);
        self.step_heal = None;

        match &step.action {
            StepAction::Goto { url } => {
                let url = self.url(url);
                self.driver.navigate(&url).await?;
            }
            StepAction::Click { selector } => {
                let found = self.locate(selector).await?;
                self.driver.click(&found.handle).await?;
            }
            StepAction::DoubleClick { selector } => {
                let found = self.locate(selector).await?;
                self.driver.double_click(&found.handle).await?;
            }
            StepAction::Fill { selector, value } => {
                let found = self.locate(selector).await?;
                self.driver.fill(&found.handle, value).await?;
            }
            StepAction::Type { selector, text } => {
                let found = self.locate(selector).await?;
                self.driver.type_text(&found.handle, text).await?;
            }
            StepAction::Press { selector, key } => match selector {
                Some(selector) => {
                    let found = self.locate(selector).await?;
                    self.driver.press_key(Some(&found.handle), key).await?;
                }
                None => {
                    self.driver.press_key(None, key).await?;
                }
            },
            StepAction::Hover { selector } => {
                let found = self.locate(selector).await?;
                self.driver.hover(&found.handle).await?;
            }
            StepAction::Check { selector } | StepAction::Uncheck { selector } => {
                let checked = matches!(step.action, StepAction::Check { .. });
                let found = self.locate(selector).await?;
                self.driver.set_checked(&found.handle, checked).await?;
            }
            StepAction::SelectOption { selector, value } => {
                let found = self.locate(selector).await?;
                self.driver.select_option(&found.handle, value).await?;
            }
            StepAction::WaitForSelector { selector } => {
                self.locate(selector).await?;
            }
            StepAction::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
            }
            StepAction::ExpectVisible { selector } => {
                let found = self.locate(selector).await?;
                if !self.driver.is_visible(&found.handle.selector).await? {
                    return Err(
                        FlowError::step(format!("Element is not visible: {}", selector)).into(),
                    );
                }
            }
            // Healing would only find a different element to assert on
            StepAction::ExpectHidden { selector } => {
                let budget_ms = hidden_wait_budget(timeout_ms);
                if !self.driver.wait_for_hidden(selector, budget_ms).await? {
                    return Err(FlowError::step(format!(
                        "Element is still visible after {}ms: {}",
                        budget_ms, selector
                    ))
                    .into());
                }
            }
            StepAction::ExpectText {
                selector,
                text,
                exact,
            } => {
                let found = self.locate(selector).await?;
                let actual = self.driver.element_text(&found.handle).await?;
                check_text("Text", &actual, text, *exact)?;
            }
            StepAction::ExpectUrl { url, exact } => {
                let actual = self.driver.current_url().await?;
                let expected = if *exact { self.url(url) } else { url.clone() };
                check_text("URL", &actual, &expected, *exact)?;
            }
            StepAction::ExpectTitle { title, exact } => {
                let actual = self.driver.title().await?;
                check_text("Title", &actual, title, *exact)?;
            }
            StepAction::Screenshot { path } => {
                let path = match path {
                    Some(p) => PathBuf::from(p),
                    None => self
                        .config
                        .output_dir
                        .join("screenshots")
                        .join(format!("{}.png", Uuid::new_v4())),
                };
                self.driver.take_screenshot(&path).await?;
            }
            other => {
                return Err(FlowError::unsupported_action(other.name(), self.kind().as_str()).into())
            }
        }

        Ok(())
    }

    async fn capture_screenshot(&mut self, path: &Path) -> Result<bool> {
        self.driver.take_screenshot(path).await?;
        Ok(true)
    }

    fn take_step_heal(&mut self) -> Option<HealedSelector> {
        self.step_heal.take()
    }

    fn take_healing_log(&mut self) -> Vec<HealedSelector> {
        self.resolver.take_log()
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.driver.close().await
    }
}

/// Budget for the `expectHidden` wait, kept under the step timeout
/// (a tenth held back, at most one second)
fn hidden_wait_budget(timeout_ms: u64) -> u64 {
    timeout_ms.saturating_sub((timeout_ms / 10).min(1_000))
}

/// Compare observed text with the expectation, exact or substring
pub(crate) fn check_text(what: &str, actual: &str, expected: &str, exact: bool) -> Result<(), FlowError> {
    let matched = if exact {
        actual.trim() == expected.trim()
    } else {
        actual.contains(expected)
    };

    if matched {
        Ok(())
    } else {
        Err(FlowError::step(format!(
            "{} mismatch: expected {}'{}', got '{}'",
            what,
            if exact { "" } else { "to contain " },
            expected,
            actual
        )))
    }
}
