//! Alert command handler
//!
//! Lets a CI system that runs the stages as separate jobs evaluate the
//! alert stage on its own. The reported results are replayed through the
//! run state machine, so an impossible combination (a deploy result after a
//! failed build) is rejected instead of alerted on.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use woog_core::domain::run::{PipelineRun, RunEvent, StageName, StageOutcome};

use crate::config::Config;
use crate::service::ReleaseService;

/// Result of a CI job as the CI system reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobResultArg {
    Success,
    Failure,
    Cancelled,
    Skipped,
}

impl JobResultArg {
    fn outcome(self, stage: StageName) -> StageOutcome {
        match self {
            JobResultArg::Success => StageOutcome::Success,
            JobResultArg::Failure => StageOutcome::Failure(format!("{} job failed", stage)),
            JobResultArg::Cancelled => StageOutcome::Failure(format!("{} job was cancelled", stage)),
            JobResultArg::Skipped => StageOutcome::Skipped,
        }
    }
}

/// Rebuilds a run record from reported stage results
pub fn replay(sha: &str, build: JobResultArg, deploy: JobResultArg) -> Result<PipelineRun> {
    let mut run = PipelineRun::new(sha);

    let build_outcome = build.outcome(StageName::BuildPushDocker);
    match &build_outcome {
        StageOutcome::Success => {
            run.apply(RunEvent::StartBuild)?;
            run.apply(RunEvent::BuildSucceeded)?;
        }
        StageOutcome::Failure(_) => {
            run.apply(RunEvent::StartBuild)?;
            run.apply(RunEvent::BuildFailed)?;
        }
        StageOutcome::Skipped => {}
    }
    run.record(StageName::BuildPushDocker, build_outcome);

    let deploy_outcome = deploy.outcome(StageName::Deploy);
    let deploy_events: &[RunEvent] = match &deploy_outcome {
        StageOutcome::Success => &[RunEvent::StartDeploy, RunEvent::DeploySucceeded],
        StageOutcome::Failure(_) => &[RunEvent::StartDeploy, RunEvent::DeployFailed],
        StageOutcome::Skipped => &[],
    };
    for event in deploy_events {
        run.apply(*event)
            .context("deploy cannot have run without a successful build")?;
    }
    run.record(StageName::Deploy, deploy_outcome);

    Ok(run)
}

/// Evaluate the alert stage for externally reported results
pub async fn alert(
    config: &Config,
    sha: &str,
    build: JobResultArg,
    deploy: JobResultArg,
) -> Result<()> {
    let run = replay(sha, build, deploy)?;

    let service = config.release_service(false);
    notify(&service, &run).await
}

/// Runs the alert stage for `run`, failing when delivery failed
async fn notify(service: &ReleaseService, run: &PipelineRun) -> Result<()> {
    match service.alert(run).await {
        StageOutcome::Skipped => {
            println!("{}", "✓ No stage failed, no alert sent".green());
            Ok(())
        }
        StageOutcome::Success => {
            println!("{}", "✓ Failure alert sent".yellow().bold());
            for (stage, reason) in run.failures() {
                println!("  {} {}: {}", "✗".red(), stage.to_string().bold(), reason);
            }
            Ok(())
        }
        StageOutcome::Failure(reason) => {
            anyhow::bail!("failed to send alert: {}", reason)
        }
    }
}
