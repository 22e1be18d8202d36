use super::state::{FlowStatus, TestSummary};
use crate::locator::HealedSelector;
use crate::parser::Phase;
use tokio::sync::broadcast;

/// Test execution events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Suite events
    SuiteStarted {
        session_id: String,
        flow_count: usize,
    },
    SuiteFinished {
        summary: TestSummary,
        duration_ms: u64,
    },

    // Flow events
    FlowStarted {
        flow_name: String,
        runner: String,
        step_count: usize,
    },
    FlowFinished {
        flow_name: String,
        status: FlowStatus,
        duration_ms: u64,
        error: Option<String>,
    },
    FlowSkipped {
        flow_name: String,
        reason: String,
    },

    // Step events
    StepStarted {
        flow_name: String,
        phase: Phase,
        index: usize,
        total: usize,
        step: String,
    },
    StepPassed {
        flow_name: String,
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        flow_name: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    SelectorHealed {
        flow_name: String,
        record: HealedSelector,
    },

    // Log event for coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting test events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    /// Fire-and-forget; events without subscribers are dropped
    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Print events until the channel closes
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden target when piped, to avoid terminal escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Console output skipped {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::SuiteStarted {
                    session_id,
                    flow_count,
                } => {
                    println!(
                        "\n{} Test session started: {} ({} flows)",
                        "▶".green().bold(),
                        session_id.cyan(),
                        flow_count
                    );
                }

                TestEvent::SuiteFinished {
                    summary,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Test session finished", "■".blue().bold());
                    println!("  Total flows: {}", summary.total);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    println!("  Duration: {}ms", duration_ms);
                }

                TestEvent::FlowStarted {
                    flow_name,
                    runner,
                    step_count,
                } => {
                    println!(
                        "\n  {} Flow: {} [{}] ({} steps)",
                        "→".blue(),
                        flow_name.white().bold(),
                        runner,
                        step_count
                    );
                }

                TestEvent::FlowFinished {
                    flow_name,
                    status,
                    duration_ms,
                    error,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let status_str = match status {
                        FlowStatus::Passed => "PASSED".green().bold(),
                        FlowStatus::Failed => "FAILED".red().bold(),
                        FlowStatus::Skipped => "SKIPPED".yellow().bold(),
                    };
                    println!("  {} Flow {} [{}]", "←".blue(), flow_name, status_str);
                    if let Some(error) = error {
                        println!("    {}", error.red());
                    }
                    println!("    Duration: {}ms", duration_ms);
                }

                TestEvent::FlowSkipped { flow_name, reason } => {
                    println!(
                        "\n  {} Flow {} skipped ({})",
                        "○".yellow(),
                        flow_name,
                        reason.dimmed()
                    );
                }

                TestEvent::StepStarted {
                    phase,
                    index,
                    total,
                    step,
                    ..
                } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }

                    let prefix = match phase {
                        Phase::Main => String::new(),
                        other => format!("{} ", other),
                    };
                    step_text = format!("[{}/{}] {}{}... ", index, total, prefix, step.dimmed());
                    pb.set_message(step_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    println!("      {}", error.red());
                }

                TestEvent::SelectorHealed { record, .. } => {
                    multi
                        .println(format!(
                            "      {} healed {} -> {} ({}, {:.0}%)",
                            "⚕".yellow(),
                            record.original,
                            record.healed.cyan(),
                            record.strategy,
                            record.confidence * 100.0
                        ))
                        .ok();
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
