//! Pipeline command handlers
//!
//! Handles `run`, `build` and `deploy`.

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use woog_core::domain::run::{PipelineRun, StageOutcome};

use crate::config::Config;
use crate::service::ReleaseService;

/// Run the whole pipeline for a commit
pub async fn run(
    config: &Config,
    sha: &str,
    dry_run: bool,
    summary: Option<PathBuf>,
) -> Result<()> {
    if config.telegram.is_none() {
        println!(
            "{}",
            "! No Telegram bot configured, failures cannot be alerted".yellow()
        );
    }

    let service = config.release_service(dry_run);
    execute(&service, sha, summary.as_deref()).await
}

/// Runs every stage on `service`, failing when any stage failed
async fn execute(service: &ReleaseService, sha: &str, summary: Option<&Path>) -> Result<()> {
    let run = service.run(sha).await?;

    print_run(&run);

    if let Some(path) = summary {
        let json = serde_json::to_string_pretty(&run)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
    }

    if run.results.iter().any(|r| r.outcome.is_failure()) {
        anyhow::bail!("release run {} failed", run.id);
    }

    Ok(())
}

/// Build and push the image only
pub async fn build(config: &Config, sha: &str) -> Result<()> {
    let engine = config.image_builder();
    engine.check_available().await?;

    let service = config.release_service(false);
    let image = service.build(sha).await?;

    println!("{}", "✓ Image published successfully!".green().bold());
    println!("  Image:  {}", image.cyan());
    println!("  Engine: {}", engine.binary().dimmed());

    Ok(())
}

/// Render and apply the descriptor only
pub async fn deploy(config: &Config, sha: &str, dry_run: bool) -> Result<()> {
    let service = config.release_service(dry_run);
    let report = service.deploy(sha).await?;

    println!("{}", "✓ Descriptor applied successfully!".green().bold());
    println!("  Image:   {}", service.image_for(sha).cyan());
    println!("  Cluster: {}", report.dimmed());
    if dry_run {
        println!("  {}", "(dry run, cluster unchanged)".yellow());
    }

    Ok(())
}

/// Print the stage-by-stage outcome of a run
fn print_run(run: &PipelineRun) {
    println!("{}", "Release Run:".bold());
    println!("  ID:      {}", run.id.to_string().cyan());
    println!("  Commit:  {}", run.commit.bold());
    println!(
        "  Started: {}",
        run.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    println!("  State:   {}", format!("{:?}", run.state).yellow());
    println!();

    for result in &run.results {
        match &result.outcome {
            StageOutcome::Success => {
                println!("  {} {}", "✓".green(), result.stage.to_string().bold())
            }
            StageOutcome::Failure(reason) => println!(
                "  {} {}: {}",
                "✗".red(),
                result.stage.to_string().bold(),
                reason.red()
            ),
            StageOutcome::Skipped => println!(
                "  {} {} {}",
                "-".dimmed(),
                result.stage.to_string().dimmed(),
                "(skipped)".dimmed()
            ),
        }
    }
}
