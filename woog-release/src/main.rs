//! Woog Release
//!
//! Release pipeline for the scraper job.
//!
//! Architecture:
//! - Configuration: settings from flags and environment, built once here
//! - Services: image build and push, cluster apply, failure notification
//! - Commands: `run` sequences all three stages, the others run one stage
//!
//! A run builds and publishes the image tagged with the commit, renders the
//! CronJob descriptor for that tag and applies it, and alerts a Telegram chat
//! when either stage failed. Nothing is retried.

mod commands;
mod config;
mod error;
mod process;
mod service;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use config::{Config, TelegramSettings};

#[derive(Parser)]
#[command(name = "woog-release")]
#[command(about = "Build, deploy and alert for the woog scraper", long_about = None)]
struct Cli {
    /// Image repository, the commit is appended as tag
    #[arg(long, env = "WOOG_IMAGE", default_value = "ghcr.io/woog-life/scraper")]
    image: String,

    /// Container engine binary
    #[arg(long, env = "WOOG_CONTAINER_ENGINE", default_value = "docker")]
    engine: String,

    /// Build context directory
    #[arg(long, env = "WOOG_BUILD_CONTEXT", default_value = ".")]
    context: PathBuf,

    /// Dockerfile path, engine default when omitted
    #[arg(long, env = "WOOG_DOCKERFILE")]
    dockerfile: Option<PathBuf>,

    /// Descriptor template containing the {{TAG}} placeholder
    #[arg(long, env = "WOOG_DESCRIPTOR", default_value = "deploy/cronjob.yaml")]
    descriptor: PathBuf,

    /// kubectl binary
    #[arg(long, env = "KUBECTL", default_value = "kubectl")]
    kubectl: String,

    /// kubeconfig context, the current context when omitted
    #[arg(long, env = "KUBE_CONTEXT")]
    kube_context: Option<String>,

    /// Repository name shown in alerts
    #[arg(long, env = "GITHUB_REPOSITORY", default_value = "woog-life/scraper")]
    repository: String,

    /// Telegram bot token for failure alerts
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Telegram chat receiving failure alerts
    #[arg(long, env = "TELEGRAM_TO")]
    telegram_to: Option<String>,

    /// Telegram Bot API URL
    #[arg(long, env = "TELEGRAM_API_URL", default_value = woog_client::DEFAULT_TELEGRAM_URL)]
    telegram_api_url: String,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        let telegram = match (&self.telegram_token, &self.telegram_to) {
            (Some(token), Some(chat_id)) => Some(TelegramSettings {
                api_url: self.telegram_api_url.clone(),
                token: token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        };

        Config {
            image_repository: self.image.clone(),
            engine: self.engine.clone(),
            build_context: self.context.clone(),
            dockerfile: self.dockerfile.clone(),
            descriptor: self.descriptor.clone(),
            kubectl: self.kubectl.clone(),
            kube_context: self.kube_context.clone(),
            repository: self.repository.clone(),
            telegram,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "woog_release=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = cli.config();
    config.validate()?;
    info!(
        "Loaded configuration: image={}, engine={}, descriptor={}",
        config.image_repository,
        config.engine,
        config.descriptor.display()
    );

    handle_command(cli.command, &config).await
}
