use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::backend::build_backend;
use crate::config::{Config, OutputFormat};
use crate::event::{FailureEvent, FailureSource};
use crate::output::{write_artifact, PipelineProgress};
use crate::pipeline::Orchestrator;

const DEFAULT_CONFIG_FILE: &str = "storywriter.toml";

#[derive(Parser)]
#[command(name = "storywriter")]
#[command(
    author,
    version,
    about = "Turns test failures into bug reports and user stories",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./storywriter.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Overrides `output.format` from the configuration file
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent pipeline for one failure event
    Analyze(AnalyzeArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a configuration file with every default spelled out
    Init {
        path: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// JSON file holding a complete failure event
    #[arg(
        short,
        long,
        conflicts_with_all = ["source", "error_message", "test_name", "stack_trace_file", "context"]
    )]
    event: Option<PathBuf>,

    #[arg(short, long, value_enum, required_unless_present = "event")]
    source: Option<FailureSource>,

    #[arg(short = 'm', long, required_unless_present = "event")]
    error_message: Option<String>,

    #[arg(short, long)]
    test_name: Option<String>,

    #[arg(long)]
    stack_trace_file: Option<PathBuf>,

    #[arg(long)]
    context: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl AnalyzeArgs {
    fn build_event(&self) -> Result<FailureEvent> {
        let event = if let Some(path) = &self.event {
            read_event(path)?
        } else {
            let (Some(source), Some(message)) = (self.source, &self.error_message) else {
                bail!("--source and --error-message are required without --event");
            };

            let mut event = FailureEvent::new(source, message.clone());
            if let Some(test_name) = &self.test_name {
                event = event.with_test_name(test_name.clone());
            }
            if let Some(context) = &self.context {
                event = event.with_context(context.clone());
            }
            if let Some(path) = &self.stack_trace_file {
                let stack_trace = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read stack trace file: {}", path.display())
                })?;
                event = event.with_stack_trace(stack_trace);
            }
            event
        };

        event.validate()?;
        Ok(event)
    }
}

fn read_event(path: &Path) -> Result<FailureEvent> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse event file: {}", path.display()))
}

/// Resolves when the user presses Ctrl-C. Never resolves if the handler
/// cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl Cli {
    async fn execute_analyze(&self, args: &AnalyzeArgs) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let event = args.build_event()?;
        info!(
            "Analyzing {} failure: {}",
            event.source,
            crate::text::preview(&event.error_message, 120)
        );

        let token = args.token.as_deref().map(Token::from);
        let backend = build_backend(&config.backend, token)?;
        let orchestrator = Orchestrator::from_config(backend, &config.agents);

        let progress = PipelineProgress::start();
        let artifact = match orchestrator
            .run_until(event.clone(), shutdown_signal())
            .await
        {
            Ok(artifact) => {
                progress.finish(artifact.total_ms);
                artifact
            }
            Err(e) => {
                progress.fail();
                return Err(e.into());
            }
        };

        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path).with_context(|| {
                format!("Failed to create output file: {}", output_path.display())
            })?;
            write_artifact(&event, &artifact, format, pretty, &mut file)?;
            file.flush()?;
            info!("Artifact written to: {}", output_path.display());
        } else {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_artifact(&event, &artifact, format, pretty, &mut handle)?;
        }

        Ok(())
    }

    fn execute_config_init(path: Option<&Path>, force: bool) -> Result<()> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }

        Config::default().save(path)?;
        info!("Configuration written to: {}", path.display());
        eprintln!("Wrote {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze(args) => self.execute_analyze(args).await,
            Commands::Config {
                action: ConfigCommand::Init { path, force },
            } => Self::execute_config_init(path.as_deref(), *force),
        }
    }
}
