use crate::locator::HealedSelector;
use crate::parser::{Phase, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step execution status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one executed step; created once, never mutated afterwards
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step: Step,
    pub phase: Phase,
    /// 1-based position across setup, main and teardown
    pub index: usize,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healed_selector: Option<HealedSelector>,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one flow run
///
/// `status` is derived from the steps and the flow-level error; it is never
/// set on its own.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowResult {
    pub name: String,
    pub status: FlowStatus,
    pub duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowResult {
    pub fn new(
        name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        steps: Vec<StepResult>,
        error: Option<String>,
    ) -> Self {
        let failed = error.is_some() || steps.iter().any(StepResult::failed);
        Self {
            name: name.to_string(),
            status: if failed {
                FlowStatus::Failed
            } else {
                FlowStatus::Passed
            },
            duration_ms: (end_time - start_time).num_milliseconds().max(0) as u64,
            start_time,
            end_time,
            steps,
            error,
        }
    }

    /// A flow filtered out of the run
    pub fn skipped(name: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            status: FlowStatus::Skipped,
            duration_ms: 0,
            start_time: now,
            end_time: now,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == FlowStatus::Passed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestSummary {
    pub fn from_flows(flows: &[FlowResult]) -> Self {
        flows.iter().fold(
            TestSummary {
                total: flows.len() as u32,
                ..Default::default()
            },
            |mut summary, flow| {
                match flow.status {
                    FlowStatus::Passed => summary.passed += 1,
                    FlowStatus::Failed => summary.failed += 1,
                    FlowStatus::Skipped => summary.skipped += 1,
                }
                summary
            },
        )
    }
}

/// Ordered flow results of one suite run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub session_id: String,
    pub flows: Vec<FlowResult>,
    pub summary: TestSummary,
    pub duration_ms: u64,
}

impl SuiteResult {
    pub fn from_flows(session_id: &str, flows: Vec<FlowResult>, duration_ms: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            summary: TestSummary::from_flows(&flows),
            flows,
            duration_ms,
        }
    }

    /// The suite passes when no flow failed; skipped flows don't count against it
    pub fn passed(&self) -> bool {
        self.summary.failed == 0
    }
}
