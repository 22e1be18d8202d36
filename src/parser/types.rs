use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed test flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Flow name; the loader falls back to the file stem
    #[serde(default)]
    pub name: String,

    /// Target type the flow runs against
    #[serde(default)]
    pub runner: RunnerKind,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Base URL for relative `goto`/`request` targets
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub setup: Option<Vec<Step>>,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub teardown: Option<Vec<Step>>,
}

impl Flow {
    /// Check structural invariants that serde can't express
    pub fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err(format!("Flow '{}' has no steps", self.name));
        }
        if matches!(self.setup, Some(ref s) if s.is_empty()) {
            return Err(format!("Flow '{}' declares an empty setup", self.name));
        }
        if matches!(self.teardown, Some(ref s) if s.is_empty()) {
            return Err(format!("Flow '{}' declares an empty teardown", self.name));
        }
        Ok(())
    }

    pub fn setup_steps(&self) -> &[Step] {
        self.setup.as_deref().unwrap_or(&[])
    }

    pub fn teardown_steps(&self) -> &[Step] {
        self.teardown.as_deref().unwrap_or(&[])
    }

    /// Number of declared steps across all phases
    pub fn total_steps(&self) -> usize {
        self.setup_steps().len() + self.steps.len() + self.teardown_steps().len()
    }

    /// True when the flow carries every required tag
    pub fn matches_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }

    /// Actions the flow's runner does not understand, with their phase
    pub fn unsupported_actions(&self) -> Vec<(Phase, String)> {
        [
            (Phase::Setup, self.setup_steps()),
            (Phase::Main, self.steps.as_slice()),
            (Phase::Teardown, self.teardown_steps()),
        ]
        .into_iter()
        .flat_map(|(phase, steps)| {
            steps
                .iter()
                .filter(|s| !self.runner.supports(&s.action))
                .map(move |s| (phase, s.action.name().to_string()))
        })
        .collect()
    }
}

/// Lifecycle phase a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Main,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Setup => "setup",
            Phase::Main => "main",
            Phase::Teardown => "teardown",
        };
        f.write_str(s)
    }
}

/// Target type for a flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Web,
    Api,
    Mobile,
    Desktop,
    Performance,
}

impl RunnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerKind::Web => "web",
            RunnerKind::Api => "api",
            RunnerKind::Mobile => "mobile",
            RunnerKind::Desktop => "desktop",
            RunnerKind::Performance => "performance",
        }
    }

    /// Whether this runner's vocabulary contains the action
    pub fn supports(&self, action: &StepAction) -> bool {
        use StepAction::*;
        match self {
            RunnerKind::Web => matches!(
                action,
                Goto { .. }
                    | Click { .. }
                    | DoubleClick { .. }
                    | Fill { .. }
                    | Type { .. }
                    | Press { .. }
                    | Hover { .. }
                    | Check { .. }
                    | Uncheck { .. }
                    | SelectOption { .. }
                    | WaitForSelector { .. }
                    | Wait { .. }
                    | ExpectVisible { .. }
                    | ExpectHidden { .. }
                    | ExpectText { .. }
                    | ExpectUrl { .. }
                    | ExpectTitle { .. }
                    | Screenshot { .. }
            ),
            RunnerKind::Api => matches!(
                action,
                Request { .. }
                    | ExpectStatus { .. }
                    | ExpectBody { .. }
                    | ExpectJson { .. }
                    | ExpectHeader { .. }
                    | Wait { .. }
            ),
            RunnerKind::Mobile => matches!(
                action,
                LaunchApp { .. }
                    | Tap { .. }
                    | LongPress { .. }
                    | Swipe { .. }
                    | InputText { .. }
                    | Back
                    | ExpectVisible { .. }
                    | ExpectText { .. }
                    | Wait { .. }
                    | Screenshot { .. }
            ),
            RunnerKind::Desktop => matches!(
                action,
                LaunchApp { .. }
                    | Click { .. }
                    | DoubleClick { .. }
                    | Fill { .. }
                    | Type { .. }
                    | Press { .. }
                    | ExpectVisible { .. }
                    | ExpectText { .. }
                    | Wait { .. }
                    | Screenshot { .. }
            ),
            RunnerKind::Performance => {
                matches!(action, LoadTest { .. } | ExpectMetric { .. } | Wait { .. })
            }
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative step: an action plus the options every action shares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct Step {
    pub action: StepAction,
    pub description: Option<String>,
    /// Per-step timeout in milliseconds
    pub timeout: Option<u64>,
    pub continue_on_error: bool,
}

impl Step {
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            description: None,
            timeout: None,
            continue_on_error: false,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Human-readable label for console output and reports
    pub fn display_name(&self) -> String {
        if let Some(ref d) = self.description {
            return d.clone();
        }
        match self.action.target() {
            Some(target) => format!("{} {}", self.action.name(), target),
            None => self.action.name().to_string(),
        }
    }

    /// Whether a failure screenshot makes sense for this step
    pub fn is_ui_bound(&self) -> bool {
        use StepAction::*;
        !matches!(
            self.action,
            Wait { .. }
                | Request { .. }
                | ExpectStatus { .. }
                | ExpectBody { .. }
                | ExpectJson { .. }
                | ExpectHeader { .. }
                | LoadTest { .. }
                | ExpectMetric { .. }
                | Unknown { .. }
        )
    }
}

/// Wire shape of a step: the tag, the shared options, and whatever
/// action-specific fields remain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    continue_on_error: bool,
    #[serde(flatten)]
    params: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TryFrom<RawStep> for Step {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let action = if StepAction::KNOWN.contains(&raw.action.as_str()) {
            let mut tagged = raw.params;
            tagged.insert("action".to_string(), Value::String(raw.action.clone()));
            serde_json::from_value(Value::Object(tagged))
                .map_err(|e| format!("Invalid '{}' step: {}", raw.action, e))?
        } else {
            // Rejected by the step runner at dispatch, not here
            StepAction::Unknown {
                action: raw.action,
                params: raw.params,
            }
        };

        Ok(Step {
            action,
            description: raw.description,
            timeout: raw.timeout,
            continue_on_error: raw.continue_on_error,
        })
    }
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        let (action, params) = match step.action {
            StepAction::Unknown { action, params } => (action, params),
            known => (known.name().to_string(), known.params()),
        };
        RawStep {
            action,
            description: step.description,
            timeout: step.timeout,
            continue_on_error: step.continue_on_error,
            params,
        }
    }
}

/// Swipe direction for mobile steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Load-test metric checked by `expectMetric`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Avg,
    P95,
    Max,
    ErrorRate,
}

/// All supported step actions, keyed by the `action` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StepAction {
    // Web navigation & interaction
    Goto {
        url: String,
    },
    Click {
        selector: String,
    },
    #[serde(rename = "dblclick")]
    DoubleClick {
        selector: String,
    },
    Fill {
        selector: String,
        value: String,
    },
    Type {
        selector: String,
        text: String,
    },
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },
    Hover {
        selector: String,
    },
    Check {
        selector: String,
    },
    Uncheck {
        selector: String,
    },
    SelectOption {
        selector: String,
        value: String,
    },
    WaitForSelector {
        selector: String,
    },
    Wait {
        /// Milliseconds
        #[serde(alias = "ms")]
        duration: u64,
    },

    // Web assertions
    ExpectVisible {
        selector: String,
    },
    ExpectHidden {
        selector: String,
    },
    ExpectText {
        selector: String,
        text: String,
        #[serde(default)]
        exact: bool,
    },
    ExpectUrl {
        url: String,
        #[serde(default)]
        exact: bool,
    },
    ExpectTitle {
        title: String,
        #[serde(default)]
        exact: bool,
    },
    Screenshot {
        #[serde(default)]
        path: Option<String>,
    },

    // API
    Request {
        #[serde(default = "default_method")]
        method: String,
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Option<Value>,
        #[serde(default)]
        expect_status: Option<u16>,
    },
    ExpectStatus {
        status: u16,
    },
    ExpectBody {
        contains: String,
    },
    ExpectJson {
        /// Dotted path into the JSON body, e.g. `data.items.0.id`
        path: String,
        equals: Value,
    },
    ExpectHeader {
        name: String,
        #[serde(default)]
        equals: Option<String>,
    },

    // Mobile / desktop
    LaunchApp {
        #[serde(alias = "app")]
        app_id: String,
        #[serde(default)]
        clear_state: bool,
    },
    Tap {
        selector: String,
    },
    LongPress {
        selector: String,
        #[serde(default = "default_long_press_ms")]
        duration: u64,
    },
    Swipe {
        direction: SwipeDirection,
    },
    InputText {
        #[serde(default)]
        selector: Option<String>,
        text: String,
    },
    Back,

    // Performance
    LoadTest {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default = "default_requests")]
        requests: u32,
        #[serde(default = "default_concurrency")]
        concurrency: u32,
    },
    ExpectMetric {
        metric: Metric,
        max: f64,
    },

    /// An action tag outside the vocabulary; kept so dispatch can reject it
    #[serde(skip)]
    Unknown {
        action: String,
        params: Map<String, Value>,
    },
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_long_press_ms() -> u64 {
    1000
}

fn default_requests() -> u32 {
    10
}

fn default_concurrency() -> u32 {
    1
}

impl StepAction {
    /// Every tag the loader knows how to decode
    pub const KNOWN: &'static [&'static str] = &[
        "goto",
        "click",
        "dblclick",
        "fill",
        "type",
        "press",
        "hover",
        "check",
        "uncheck",
        "selectOption",
        "waitForSelector",
        "wait",
        "expectVisible",
        "expectHidden",
        "expectText",
        "expectUrl",
        "expectTitle",
        "screenshot",
        "request",
        "expectStatus",
        "expectBody",
        "expectJson",
        "expectHeader",
        "launchApp",
        "tap",
        "longPress",
        "swipe",
        "inputText",
        "back",
        "loadTest",
        "expectMetric",
    ];

    /// The `action` tag
    pub fn name(&self) -> &str {
        match self {
            StepAction::Goto { .. } => "goto",
            StepAction::Click { .. } => "click",
            StepAction::DoubleClick { .. } => "dblclick",
            StepAction::Fill { .. } => "fill",
            StepAction::Type { .. } => "type",
            StepAction::Press { .. } => "press",
            StepAction::Hover { .. } => "hover",
            StepAction::Check { .. } => "check",
            StepAction::Uncheck { .. } => "uncheck",
            StepAction::SelectOption { .. } => "selectOption",
            StepAction::WaitForSelector { .. } => "waitForSelector",
            StepAction::Wait { .. } => "wait",
            StepAction::ExpectVisible { .. } => "expectVisible",
            StepAction::ExpectHidden { .. } => "expectHidden",
            StepAction::ExpectText { .. } => "expectText",
            StepAction::ExpectUrl { .. } => "expectUrl",
            StepAction::ExpectTitle { .. } => "expectTitle",
            StepAction::Screenshot { .. } => "screenshot",
            StepAction::Request { .. } => "request",
            StepAction::ExpectStatus { .. } => "expectStatus",
            StepAction::ExpectBody { .. } => "expectBody",
            StepAction::ExpectJson { .. } => "expectJson",
            StepAction::ExpectHeader { .. } => "expectHeader",
            StepAction::LaunchApp { .. } => "launchApp",
            StepAction::Tap { .. } => "tap",
            StepAction::LongPress { .. } => "longPress",
            StepAction::Swipe { .. } => "swipe",
            StepAction::InputText { .. } => "inputText",
            StepAction::Back => "back",
            StepAction::LoadTest { .. } => "loadTest",
            StepAction::ExpectMetric { .. } => "expectMetric",
            StepAction::Unknown { action, .. } => action,
        }
    }

    /// The element selector this action targets, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            StepAction::Click { selector }
            | StepAction::DoubleClick { selector }
            | StepAction::Fill { selector, .. }
            | StepAction::Type { selector, .. }
            | StepAction::Hover { selector }
            | StepAction::Check { selector }
            | StepAction::Uncheck { selector }
            | StepAction::SelectOption { selector, .. }
            | StepAction::WaitForSelector { selector }
            | StepAction::ExpectVisible { selector }
            | StepAction::ExpectHidden { selector }
            | StepAction::ExpectText { selector, .. }
            | StepAction::Tap { selector }
            | StepAction::LongPress { selector, .. } => Some(selector),
            StepAction::Press { selector, .. } | StepAction::InputText { selector, .. } => {
                selector.as_deref()
            }
            _ => None,
        }
    }

    /// Action-specific fields without the tag
    pub fn params(&self) -> Map<String, Value> {
        if let StepAction::Unknown { params, .. } = self {
            return params.clone();
        }
        let mut params = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        params.remove("action");
        params
    }

    /// Short description of what the action points at
    fn target(&self) -> Option<String> {
        if let Some(sel) = self.selector() {
            return Some(sel.to_string());
        }
        match self {
            StepAction::Goto { url } | StepAction::ExpectUrl { url, .. } => Some(url.clone()),
            StepAction::Request { method, url, .. } | StepAction::LoadTest { method, url, .. } => {
                Some(format!("{} {}", method.to_uppercase(), url))
            }
            StepAction::Wait { duration } => Some(format!("{}ms", duration)),
            StepAction::ExpectStatus { status } => Some(status.to_string()),
            StepAction::ExpectJson { path, .. } => Some(path.clone()),
            StepAction::LaunchApp { app_id, .. } => Some(app_id.clone()),
            StepAction::ExpectMetric { metric, max } => Some(format!("{:?} <= {}", metric, max)),
            _ => None,
        }
    }
}
