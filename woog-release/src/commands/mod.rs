//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod alert;
mod pipeline;
mod render;

pub use alert::JobResultArg;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Commit the release is cut from
#[derive(Args, Debug, Clone)]
pub struct CommitArgs {
    /// Full commit identifier, used as the image tag
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: String,
}

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: build, deploy, alert on failure
    Run {
        #[command(flatten)]
        commit: CommitArgs,

        /// Validate the apply client-side without changing the cluster
        #[arg(long)]
        dry_run: bool,

        /// Write the run record as JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Build and push the image only
    Build {
        #[command(flatten)]
        commit: CommitArgs,
    },
    /// Render and apply the descriptor only
    Deploy {
        #[command(flatten)]
        commit: CommitArgs,

        /// Validate the apply client-side without changing the cluster
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the rendered descriptor without applying it
    Render {
        #[command(flatten)]
        commit: CommitArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate prior stage results and notify on failure
    Alert {
        #[command(flatten)]
        commit: CommitArgs,

        /// Result of the build_push_docker stage
        #[arg(long, value_enum)]
        build: JobResultArg,

        /// Result of the deploy stage
        #[arg(long, value_enum)]
        deploy: JobResultArg,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The release configuration
///
/// # Returns
/// Error when any executed stage failed
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run {
            commit,
            dry_run,
            summary,
        } => pipeline::run(config, &commit.sha, dry_run, summary).await,
        Commands::Build { commit } => pipeline::build(config, &commit.sha).await,
        Commands::Deploy { commit, dry_run } => {
            pipeline::deploy(config, &commit.sha, dry_run).await
        }
        Commands::Render { commit, output } => render::render(config, &commit.sha, output).await,
        Commands::Alert {
            commit,
            build,
            deploy,
        } => alert::alert(config, &commit.sha, build, deploy).await,
    }
}
