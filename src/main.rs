use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use lumi_flow::parser::{collect_flow_files, parse_flow_file};
use lumi_flow::runner;
use lumi_flow::utils::config::{BrowserType, RunConfig, RunConfigOverrides};

#[derive(Parser)]
#[command(name = "lumi-flow")]
#[command(author = "NL Team")]
#[command(version)]
#[command(about = "Declarative test flows with a self-healing locator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run flow file(s) or a directory of flows
    Run {
        /// Path to flow file or directory
        path: PathBuf,

        /// Output directory for reports and screenshots
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML config file, layered over environment settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only run flows carrying all of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Browser for web flows (chromium, firefox, webkit)
        #[arg(short, long)]
        browser: Option<String>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Disable the self-healing locator
        #[arg(long, default_value = "false")]
        no_self_heal: bool,

        /// Minimum similarity for text-based healing (0.0 - 1.0)
        #[arg(long)]
        threshold: Option<f64>,

        /// Default step timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Base URL for relative navigation and requests
        #[arg(long)]
        base_url: Option<String>,

        /// Write results.json, junit.xml and healed-selectors.json
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// Load and validate flows without running them
    Validate {
        /// Path to flow file or directory
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            output,
            config,
            tags,
            browser,
            headed,
            no_self_heal,
            threshold,
            timeout,
            base_url,
            report,
        } => {
            let browser = match browser {
                Some(name) => Some(
                    BrowserType::parse(&name)
                        .ok_or_else(|| anyhow::anyhow!("Unknown browser: {}", name))?,
                ),
                None => None,
            };

            let file = match config {
                Some(ref file) => RunConfigOverrides::from_file(file)?,
                None => RunConfigOverrides::default(),
            };
            let cli_overrides = RunConfigOverrides {
                output_dir: output,
                tags,
                browser,
                headless: headed.then_some(false),
                self_heal: no_self_heal.then_some(false),
                self_heal_threshold: threshold,
                default_timeout_ms: timeout,
                base_url,
                ..Default::default()
            };
            let config = RunConfig::resolve(
                RunConfigOverrides::from_env()
                    .merge(file)
                    .merge(cli_overrides),
            )?;

            println!(
                "{} Running flows from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!(
                "  Self-heal: {}",
                if config.self_heal {
                    format!("on (threshold {})", config.self_heal_threshold).green()
                } else {
                    "off".to_string().yellow()
                }
            );
            if !config.tags.is_empty() {
                println!("  Tags: {}", config.tags.join(", ").yellow());
            }
            println!(
                "  Output: {}",
                config.output_dir.display().to_string().cyan()
            );

            let run = runner::run_tests(&path, Arc::new(config), report).await?;
            if !run.result.passed() {
                std::process::exit(1);
            }
        }

        Commands::Validate { path } => {
            let mut invalid = 0;
            for file in collect_flow_files(&path) {
                match parse_flow_file(&file) {
                    Ok(flow) => {
                        let unsupported = flow.unsupported_actions();
                        let mark = if unsupported.is_empty() {
                            "✓".green()
                        } else {
                            invalid += 1;
                            "✗".red()
                        };
                        println!(
                            "{} {} [{}] ({} steps)",
                            mark,
                            flow.name.white().bold(),
                            flow.runner,
                            flow.total_steps()
                        );
                        for (phase, action) in unsupported {
                            println!(
                                "    {} '{}' is not a {} action",
                                phase,
                                action.red(),
                                flow.runner
                            );
                        }
                    }
                    Err(e) => {
                        invalid += 1;
                        println!("{} {}: {:#}", "✗".red(), file.display(), e);
                    }
                }
            }
            if invalid > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
