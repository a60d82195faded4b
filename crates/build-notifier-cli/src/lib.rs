//! # Build Notifier CLI
//!
//! Command-line entry points for the Cloud Build notifier.
//!
//! This module provides commands for:
//! - Handling one Pub/Sub build event on the git-host path
//! - Handling one Pub/Sub build event on the Slack failure path
//! - Announcing a completed cluster deployment in Slack
//! - Validating and showing the resolved configuration

use build_notifier_core::{
    BuildEventHandler, ConfigError, DecodeError, DeploymentAnnouncement, DispatchError,
    ExtractionError, HandleOutcome, NotifierConfig, NotifierError, PubSubMessage, SlackNotifier,
};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// Build Notifier CLI - relays Cloud Build events to GitHub, Bitbucket and Slack
#[derive(Parser, Debug)]
#[command(name = "build-notifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relays Cloud Build events to GitHub, Bitbucket and Slack")]
#[command(
    long_about = "Build Notifier decodes Cloud Build events delivered over Pub/Sub and reports them as commit statuses or Slack alerts"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BUILD_NOTIFIER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Update the commit status on GitHub or Bitbucket for a build event
    GitHost(EventInput),

    /// Post a Slack alert for a failed build event
    SlackFailure(EventInput),

    /// Announce a completed cluster deployment in Slack
    DeploySuccess {
        /// Namespace that was deployed (usually the branch name)
        #[arg(short, long)]
        namespace: String,

        /// Commit that was deployed
        #[arg(long)]
        commit: String,

        /// Root domain of the cluster (overrides deployment.domain)
        #[arg(long)]
        domain: Option<String>,

        /// Namespace served at the root domain (overrides deployment.production_namespace)
        #[arg(long)]
        production_namespace: Option<String>,
    },

    /// Validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,

        /// Output format for configuration
        #[arg(short = 'f', long, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Where the Pub/Sub message comes from
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct EventInput {
    /// File holding the Pub/Sub message JSON (`-` for stdin)
    #[arg(short, long)]
    pub message: Option<PathBuf>,

    /// Base64-encoded build event, as found in the message `data` field
    #[arg(short, long)]
    pub data: Option<String>,
}

/// Configuration format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Event decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Notification extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Notification dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Failed to render output: {message}")]
    Output { message: String },
}

impl From<NotifierError> for CliError {
    fn from(error: NotifierError) -> Self {
        match error {
            NotifierError::Decode(e) => Self::Decode(e),
            NotifierError::Extraction(e) => Self::Extraction(e),
            NotifierError::Dispatch(e) => Self::Dispatch(e),
            NotifierError::Configuration(e) => Self::Configuration(e),
        }
    }
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Decode(_) | Self::Extraction(_) => 2,
            Self::Dispatch(_) => 3,
            Self::Io(_) | Self::Output { .. } => 4,
            Self::InvalidArgument { .. } => 5,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    run(cli).await
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::GitHost(input) => {
            let config = load_configuration(cli.config.as_deref())?;
            let handler = BuildEventHandler::git_host(&config, config.build_http_client()?)?;
            execute_event_command(&handler, &input).await
        }
        Commands::SlackFailure(input) => {
            let config = load_configuration(cli.config.as_deref())?;
            let handler = BuildEventHandler::slack_failure(&config, config.build_http_client()?)?;
            execute_event_command(&handler, &input).await
        }
        Commands::DeploySuccess {
            namespace,
            commit,
            domain,
            production_namespace,
        } => {
            let mut config = load_configuration(cli.config.as_deref())?;
            if domain.is_some() {
                config.deployment.domain = domain;
            }
            if production_namespace.is_some() {
                config.deployment.production_namespace = production_namespace;
            }
            execute_deploy_success_command(&config, &namespace, &commit).await
        }
        Commands::Config { show, format } => {
            execute_config_command(cli.config.as_deref(), show, format)
        }
        Commands::Completions { shell } => execute_completions_command(shell),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Initialize logging based on CLI arguments
///
/// Logs go to stderr so command output on stdout stays machine readable.
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&cli.log_level).map_err(|e| CliError::InvalidArgument {
                arg: "--log-level".to_string(),
                message: e.to_string(),
            })?
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    // A subscriber installed earlier in the process wins
    let _ = if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    Ok(())
}

/// Load configuration from the optional file and the environment
pub fn load_configuration(config_path: Option<&Path>) -> Result<NotifierConfig, CliError> {
    let config = NotifierConfig::load(config_path)?;
    debug!(
        file = ?config_path,
        repo_filter = ?config.repo_filter(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Read the Pub/Sub message named by the command input
pub fn read_message(input: &EventInput) -> Result<PubSubMessage, CliError> {
    if let Some(data) = &input.data {
        return Ok(PubSubMessage::new(data.clone()));
    }

    let Some(path) = &input.message else {
        return Err(CliError::InvalidArgument {
            arg: "--message".to_string(),
            message: "either --message or --data is required".to_string(),
        });
    };

    let bytes = if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        buffer
    } else {
        std::fs::read(path)?
    };

    Ok(PubSubMessage::from_json(&bytes)?)
}

/// Execute the git-host or slack-failure command
async fn execute_event_command(
    handler: &BuildEventHandler,
    input: &EventInput,
) -> Result<(), CliError> {
    let message = read_message(input)?;
    info!(trigger = %handler.trigger(), "Handling build event");

    match handler.handle(&message).await? {
        HandleOutcome::Skipped => println!("skipped"),
        HandleOutcome::Delivered { destination } => println!("delivered: {}", destination),
    }

    Ok(())
}

/// Execute deploy-success command
async fn execute_deploy_success_command(
    config: &NotifierConfig,
    namespace: &str,
    commit: &str,
) -> Result<(), CliError> {
    info!(namespace = %namespace, commit = %commit, "Announcing deployment");

    let announcement = DeploymentAnnouncement::from_config(config)?;
    let slack = SlackNotifier::from_config(config, config.build_http_client()?);

    announcement.announce(&slack, namespace, commit).await?;
    println!("delivered: Slack");

    Ok(())
}

/// Execute config command
fn execute_config_command(
    file: Option<&Path>,
    show: bool,
    format: ConfigFormat,
) -> Result<(), CliError> {
    let config = load_configuration(file)?;

    if show {
        print!("{}", render_config(&config, format)?);
    } else {
        println!("Configuration is valid");
    }

    Ok(())
}

/// Render configuration with credentials redacted
pub fn render_config(config: &NotifierConfig, format: ConfigFormat) -> Result<String, CliError> {
    let output = |message: String| CliError::Output { message };

    match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| output(e.to_string())),
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|json| json + "\n")
            .map_err(|e| output(e.to_string())),
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| output(e.to_string())),
    }
}

/// Execute completions command
fn execute_completions_command(shell: clap_complete::Shell) -> Result<(), CliError> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
