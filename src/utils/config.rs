use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chromium" | "chrome" => Some(BrowserType::Chromium),
            "firefox" => Some(BrowserType::Firefox),
            "webkit" | "safari" => Some(BrowserType::Webkit),
            _ => None,
        }
    }
}

/// Immutable configuration snapshot for a run
///
/// Built once through [`RunConfig::resolve`] and then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Default step timeout (ms)
    pub default_timeout_ms: u64,

    /// Enable the self-healing locator cascade
    pub self_heal: bool,

    /// Minimum similarity for the text-similarity strategy
    pub self_heal_threshold: f64,

    pub headless: bool,

    pub browser: BrowserType,

    pub viewport_width: u32,

    pub viewport_height: u32,

    /// Base URL for relative navigation and requests
    pub base_url: Option<String>,

    /// Configured retry count. Not applied by the engine.
    pub retries: u32,

    /// Capture a screenshot when a UI-bound step fails
    pub screenshot_on_failure: bool,

    /// Output directory for screenshots and reports
    pub output_dir: PathBuf,

    /// Endpoint of the mobile automation bridge
    pub mobile_bridge_url: String,

    /// Endpoint of the desktop automation bridge
    pub desktop_bridge_url: String,

    /// Only run flows carrying all of these tags
    pub tags: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            self_heal: true,
            self_heal_threshold: 0.6,
            headless: true,
            browser: BrowserType::Chromium,
            viewport_width: 1280,
            viewport_height: 720,
            base_url: None,
            retries: 0,
            screenshot_on_failure: true,
            output_dir: PathBuf::from("./output"),
            mobile_bridge_url: "http://127.0.0.1:4723".to_string(),
            desktop_bridge_url: "http://127.0.0.1:4724".to_string(),
            tags: Vec::new(),
        }
    }
}

/// Caller overrides; every field left `None` keeps the lower layer's value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfigOverrides {
    #[serde(default, alias = "defaultTimeout")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default)]
    pub self_heal: Option<bool>,
    #[serde(default)]
    pub self_heal_threshold: Option<f64>,
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default)]
    pub browser: Option<BrowserType>,
    #[serde(default)]
    pub viewport_width: Option<u32>,
    #[serde(default)]
    pub viewport_height: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub screenshot_on_failure: Option<bool>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub mobile_bridge_url: Option<String>,
    #[serde(default)]
    pub desktop_bridge_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RunConfigOverrides {
    /// Load overrides from a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Read `LUMI_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).map(|v| v == "true" || v == "1");
        Self {
            headless: flag("LUMI_HEADLESS"),
            self_heal: flag("LUMI_SELF_HEAL"),
            browser: lookup("LUMI_BROWSER").and_then(|b| BrowserType::parse(&b)),
            base_url: lookup("LUMI_BASE_URL"),
            ..Self::default()
        }
    }

    /// Layer `other` on top of `self`; `other` wins where it is set
    pub fn merge(self, other: RunConfigOverrides) -> Self {
        Self {
            default_timeout_ms: other.default_timeout_ms.or(self.default_timeout_ms),
            self_heal: other.self_heal.or(self.self_heal),
            self_heal_threshold: other.self_heal_threshold.or(self.self_heal_threshold),
            headless: other.headless.or(self.headless),
            browser: other.browser.or(self.browser),
            viewport_width: other.viewport_width.or(self.viewport_width),
            viewport_height: other.viewport_height.or(self.viewport_height),
            base_url: other.base_url.or(self.base_url),
            retries: other.retries.or(self.retries),
            screenshot_on_failure: other.screenshot_on_failure.or(self.screenshot_on_failure),
            output_dir: other.output_dir.or(self.output_dir),
            mobile_bridge_url: other.mobile_bridge_url.or(self.mobile_bridge_url),
            desktop_bridge_url: other.desktop_bridge_url.or(self.desktop_bridge_url),
            tags: other.tags.or(self.tags),
        }
    }
}

impl RunConfig {
    /// Merge defaults with overrides and validate the result
    pub fn resolve(overrides: RunConfigOverrides) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            default_timeout_ms: overrides.default_timeout_ms.unwrap_or(d.default_timeout_ms),
            self_heal: overrides.self_heal.unwrap_or(d.self_heal),
            self_heal_threshold: overrides.self_heal_threshold.unwrap_or(d.self_heal_threshold),
            headless: overrides.headless.unwrap_or(d.headless),
            browser: overrides.browser.unwrap_or(d.browser),
            viewport_width: overrides.viewport_width.unwrap_or(d.viewport_width),
            viewport_height: overrides.viewport_height.unwrap_or(d.viewport_height),
            base_url: overrides.base_url.or(d.base_url),
            retries: overrides.retries.unwrap_or(d.retries),
            screenshot_on_failure: overrides
                .screenshot_on_failure
                .unwrap_or(d.screenshot_on_failure),
            output_dir: overrides.output_dir.unwrap_or(d.output_dir),
            mobile_bridge_url: overrides.mobile_bridge_url.unwrap_or(d.mobile_bridge_url),
            desktop_bridge_url: overrides.desktop_bridge_url.unwrap_or(d.desktop_bridge_url),
            tags: overrides.tags.unwrap_or(d.tags),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.self_heal_threshold) {
            anyhow::bail!(
                "selfHealThreshold must be within [0, 1], got {}",
                self.self_heal_threshold
            );
        }
        if self.default_timeout_ms == 0 {
            anyhow::bail!("defaultTimeout must be greater than 0");
        }
        Ok(())
    }

    /// Timeout for a step, falling back to the default
    pub fn step_timeout(&self, step_timeout: Option<u64>) -> u64 {
        step_timeout.unwrap_or(self.default_timeout_ms)
    }
}
