#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use lumi_flow::driver::traits::PlatformDriver;
use lumi_flow::locator::{ElementHandle, ElementQuery};
use lumi_flow::parser::Flow;
use lumi_flow::runner::web::WebRunner;
use lumi_flow::runner::{RunnerFactory, StepExecutor};
use lumi_flow::utils::config::RunConfig;
use lumi_flow::FlowError;

/// Scripted page contents plus a record of what was asked of it
#[derive(Debug, Default)]
pub struct PageState {
    /// Selectors that resolve directly
    pub visible: Vec<String>,
    /// Match counts for probe selectors; missing means zero
    pub counts: HashMap<String, usize>,
    /// Labels returned to the text-similarity strategy
    pub texts: Vec<String>,
    pub title: String,
    pub url: String,
    pub fail_close: bool,

    pub lookups: Vec<String>,
    pub probes: Vec<String>,
    pub actions: Vec<String>,
    pub closed: usize,
}

/// In-memory browser page; clones share state
#[derive(Clone, Default)]
pub struct FakePage {
    pub state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(self, selector: &str) -> Self {
        self.state.lock().unwrap().visible.push(selector.to_string());
        self
    }

    pub fn count(self, selector: &str, n: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .counts
            .insert(selector.to_string(), n);
        self
    }

    pub fn texts(self, texts: &[&str]) -> Self {
        self.state.lock().unwrap().texts = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn title(self, title: &str) -> Self {
        self.state.lock().unwrap().title = title.to_string();
        self
    }

    pub fn failing_close(self) -> Self {
        self.state.lock().unwrap().fail_close = true;
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.state.lock().unwrap().probes.clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    fn act(&self, action: String) {
        self.state.lock().unwrap().actions.push(action);
    }
}

#[async_trait]
impl ElementQuery for FakePage {
    async fn wait_for_visible(&self, selector: &str, _timeout_ms: u64) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(selector.to_string());
        Ok(state.visible.iter().any(|s| s == selector))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.probes.push(selector.to_string());
        Ok(state.counts.get(selector).copied().unwrap_or(0))
    }

    async fn interactive_texts(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().texts.clone())
    }
}

#[async_trait]
impl PlatformDriver for FakePage {
    fn platform_name(&self) -> &str {
        "fake"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().url = url.to_string();
        self.act(format!("goto {}", url));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.act(format!("click {}", element.selector));
        Ok(())
    }

    async fn double_click(&self, element: &ElementHandle) -> Result<()> {
        self.act(format!("dblclick {}", element.selector));
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        self.act(format!("fill {} {}", element.selector, value));
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.act(format!("type {} {}", element.selector, text));
        Ok(())
    }

    async fn press_key(&self, _element: Option<&ElementHandle>, key: &str) -> Result<()> {
        self.act(format!("press {}", key));
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<()> {
        self.act(format!("hover {}", element.selector));
        Ok(())
    }

    async fn set_checked(&self, element: &ElementHandle, checked: bool) -> Result<()> {
        self.act(format!("check {} {}", element.selector, checked));
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<()> {
        self.act(format!("select {} {}", element.selector, value));
        Ok(())
    }

    async fn element_text(&self, _element: &ElementHandle) -> Result<String> {
        Ok(String::new())
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool> {
        Ok(true)
    }

    async fn wait_for_hidden(&self, selector: &str, _timeout_ms: u64) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(!state.visible.iter().any(|s| s == selector))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn take_screenshot(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        if state.fail_close {
            anyhow::bail!("browser already gone");
        }
        Ok(())
    }
}

/// Hands every flow a web runner over the shared fake page
pub struct FakeFactory {
    pub page: FakePage,
    pub init_error: Option<FlowError>,
}

impl FakeFactory {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            init_error: None,
        }
    }

    pub fn failing(error: FlowError) -> Self {
        Self {
            page: FakePage::new(),
            init_error: Some(error),
        }
    }
}

#[async_trait]
impl RunnerFactory for FakeFactory {
    async fn create(
        &self,
        flow: &Flow,
        config: &RunConfig,
    ) -> Result<Box<dyn StepExecutor>, FlowError> {
        if let Some(e) = &self.init_error {
            return Err(e.clone());
        }
        Ok(Box::new(WebRunner::new(
            Box::new(self.page.clone()),
            config,
            flow.base_url.clone(),
        )))
    }
}
