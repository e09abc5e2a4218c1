//! Render command handler

use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use woog_core::descriptor::EnvSource;

use crate::config::Config;

/// Render the descriptor for a commit and print or save it
pub async fn render(config: &Config, sha: &str, output: Option<PathBuf>) -> Result<()> {
    let service = config.release_service(false);
    let rendered = service.render(sha).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered.text)
                .with_context(|| format!("Failed to write descriptor: {}", path.display()))?;

            let cron_job = &rendered.cron_job;
            eprintln!("{}", "✓ Descriptor rendered".green().bold());
            eprintln!("  File:     {}", path.display().to_string().cyan());
            eprintln!("  Schedule: {}", cron_job.spec.schedule);
            if let Some(next) = cron_job.schedule().ok().and_then(|s| s.next_run()) {
                eprintln!(
                    "  Next run: {}",
                    next.format("%Y-%m-%d %H:%M UTC").to_string().dimmed()
                );
            }
            for container in cron_job.containers() {
                eprintln!("  Image:    {}", container.image.dimmed());
                for source in container.env_sources() {
                    let line = match source {
                        EnvSource::Secret(name) => format!("secret {}", name),
                        EnvSource::ConfigMap(name) => format!("config map {}", name),
                    };
                    eprintln!("    env from {}", line.dimmed());
                }
            }
        }
        None => print!("{}", rendered.text),
    }

    Ok(())
}
