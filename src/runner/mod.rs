pub mod api;
pub mod bridge;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod performance;
pub mod session;
pub mod state;
pub mod web;

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::parser::load_flows;
use crate::utils::config::RunConfig;

pub use events::*;
pub use executor::{StepExecutor, StepRunner};
pub use orchestrator::{FlowOrchestrator, FlowRun, SuiteRun};
pub use session::{DefaultRunnerFactory, RunnerFactory, SessionGuard};
pub use state::*;

/// Run every flow under `path` and optionally write reports to the output dir
pub async fn run_tests(path: &Path, config: Arc<RunConfig>, report: bool) -> Result<SuiteRun> {
    let flows = load_flows(path)?;
    if flows.is_empty() {
        println!("{} No test files found.", "ℹ".blue());
    }

    let orchestrator = FlowOrchestrator::new(config.clone());
    let listener = tokio::spawn(ConsoleEventListener::listen(orchestrator.subscribe()));

    let run = orchestrator.run_suite(&flows).await;

    // Closing the channel lets the listener drain and exit
    drop(orchestrator);
    if let Err(e) = listener.await {
        log::warn!("Console listener stopped abnormally: {}", e);
    }

    if report {
        for path in crate::report::write_reports(&run, &config.output_dir)? {
            println!("    Generated report: {}", path.display());
        }
    }

    Ok(run)
}
