//! Error taxonomy for flow execution

use thiserror::Error;

/// Errors raised by the engine.
///
/// Anything raised while a single step executes is caught by the step runner
/// and turned into a failed [`StepResult`](crate::runner::state::StepResult).
/// `RunnerInitialization` is the only variant that escapes to the flow level.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Selector did not resolve, directly or through self-healing
    #[error("Element not found: {selector}{}", healing_suffix(.healing_attempted))]
    ElementNotFound {
        selector: String,
        healing_attempted: bool,
    },

    /// A bounded wait expired
    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Unknown action or failed assertion
    #[error("{0}")]
    StepExecution(String),

    /// The live target could not be created
    #[error("Failed to initialize {runner} runner: {reason}")]
    RunnerInitialization { runner: String, reason: String },
}

fn healing_suffix(attempted: &bool) -> &'static str {
    if *attempted {
        " (self-healing failed)"
    } else {
        ""
    }
}

impl FlowError {
    pub fn not_found(selector: &str, healing_attempted: bool) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            healing_attempted,
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn step(message: impl Into<String>) -> Self {
        Self::StepExecution(message.into())
    }

    pub fn unsupported_action(action: &str, runner: &str) -> Self {
        Self::StepExecution(format!(
            "Unsupported action '{}' for {} runner",
            action, runner
        ))
    }

    pub fn init(runner: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::RunnerInitialization {
            runner: runner.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::ElementNotFound { .. } => "ElementNotFound",
            FlowError::Timeout { .. } => "TimeoutError",
            FlowError::StepExecution(_) => "StepExecutionError",
            FlowError::RunnerInitialization { .. } => "RunnerInitializationError",
        }
    }
}
