//! Release service
//!
//! Sequences one pipeline run:
//! - `build_push_docker`: build and publish `<repository>:<commit>`
//! - `deploy`: render the descriptor for the commit and apply it, only after
//!   a successful build
//! - `alert`: evaluated once both resolved, notifies only when one failed
//!
//! Every failure is terminal for the run. Nothing is retried.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use woog_core::descriptor::{RenderedDescriptor, render_descriptor, template};
use woog_core::domain::run::{AlertDecision, PipelineRun, RunEvent, StageName, StageOutcome};

use crate::error::StageError;
use crate::service::{ClusterApplier, ImageBuilder, Notifier};

/// Where the descriptor template comes from
#[derive(Debug, Clone)]
pub enum DescriptorSource {
    File(PathBuf),
    Inline(String),
}

impl DescriptorSource {
    pub async fn load(&self) -> Result<String, StageError> {
        match self {
            DescriptorSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                StageError::Render(format!("failed to read {}: {}", path.display(), e))
            }),
            DescriptorSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Orchestrates the three release stages
pub struct ReleaseService {
    /// Image repository without tag (e.g., "ghcr.io/woog-life/scraper")
    image_repository: String,
    descriptor: DescriptorSource,
    builder: Arc<dyn ImageBuilder>,
    applier: Arc<dyn ClusterApplier>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ReleaseService {
    pub fn new(
        image_repository: impl Into<String>,
        descriptor: DescriptorSource,
        builder: Arc<dyn ImageBuilder>,
        applier: Arc<dyn ClusterApplier>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            image_repository: image_repository.into(),
            descriptor,
            builder,
            applier,
            notifier,
        }
    }

    /// Image reference published for a commit
    pub fn image_for(&self, commit: &str) -> String {
        format!("{}:{}", self.image_repository, commit)
    }

    /// Executes a full pipeline run for `commit`
    ///
    /// Stage failures are recorded in the returned run, not returned as errors.
    pub async fn run(&self, commit: &str) -> Result<PipelineRun> {
        let mut run = PipelineRun::new(commit);
        info!("Starting release run {} for commit {}", run.id, commit);

        // Build
        run.apply(RunEvent::StartBuild)?;
        match self.build(commit).await {
            Ok(image) => {
                info!("Stage {} succeeded: {}", StageName::BuildPushDocker, image);
                run.apply(RunEvent::BuildSucceeded)?;
                run.record(StageName::BuildPushDocker, StageOutcome::Success);
            }
            Err(e) => {
                error!("Stage {} failed: {}", StageName::BuildPushDocker, e);
                run.apply(RunEvent::BuildFailed)?;
                run.record(StageName::BuildPushDocker, StageOutcome::Failure(e.to_string()));
            }
        }

        // Deploy, only on top of a published image
        if run.dependencies_succeeded(StageName::Deploy) {
            run.apply(RunEvent::StartDeploy)?;
            match self.deploy(commit).await {
                Ok(report) => {
                    info!("Stage {} succeeded: {}", StageName::Deploy, report);
                    run.apply(RunEvent::DeploySucceeded)?;
                    run.record(StageName::Deploy, StageOutcome::Success);
                }
                Err(e) => {
                    error!("Stage {} failed: {}", StageName::Deploy, e);
                    run.apply(RunEvent::DeployFailed)?;
                    run.record(StageName::Deploy, StageOutcome::Failure(e.to_string()));
                }
            }
        } else {
            info!("Skipping stage {}: build did not succeed", StageName::Deploy);
            run.record(StageName::Deploy, StageOutcome::Skipped);
        }

        // Alert, once everything before it resolved
        if !run.state.is_terminal() || !run.dependencies_resolved(StageName::Alert) {
            anyhow::bail!(
                "release run {} reached {} in state {:?}",
                run.id,
                StageName::Alert,
                run.state
            );
        }
        let outcome = self.alert(&run).await;
        run.record(StageName::Alert, outcome);

        info!("Release run {} finished in state {:?}", run.id, run.state);
        Ok(run)
    }

    /// `build_push_docker`: builds and publishes the image for `commit`
    pub async fn build(&self, commit: &str) -> Result<String, StageError> {
        template::validate_tag(commit).map_err(|e| StageError::Build(e.to_string()))?;

        let image = self.image_for(commit);
        self.builder.build(&image).await?;
        self.builder.push(&image).await?;
        Ok(image)
    }

    /// Loads and renders the descriptor for `commit` without applying it
    pub async fn render(&self, commit: &str) -> Result<RenderedDescriptor, StageError> {
        let template = self.descriptor.load().await?;
        let rendered =
            render_descriptor(&template, commit).map_err(|e| StageError::Render(e.to_string()))?;

        let image = self.image_for(commit);
        if !rendered.cron_job.containers().iter().any(|c| c.image == image) {
            warn!("Descriptor does not reference the published image {}", image);
        }

        Ok(rendered)
    }

    /// `deploy`: renders the descriptor for `commit` and applies it
    pub async fn deploy(&self, commit: &str) -> Result<String, StageError> {
        let rendered = self.render(commit).await?;
        self.applier.apply(&rendered.text).await
    }

    /// `alert`: notifies when a prior stage of `run` failed
    pub async fn alert(&self, run: &PipelineRun) -> StageOutcome {
        match run.alert_decision() {
            AlertDecision::NoAlert => {
                info!("No stage failed, skipping stage {}", StageName::Alert);
                StageOutcome::Skipped
            }
            AlertDecision::Alert => {
                let Some(notifier) = &self.notifier else {
                    warn!("A stage failed but no notifier is configured");
                    return StageOutcome::Failure("no notifier configured".to_string());
                };

                match notifier.notify(run).await {
                    Ok(()) => StageOutcome::Success,
                    Err(e) => {
                        error!("Stage {} failed: {}", StageName::Alert, e);
                        StageOutcome::Failure(e.to_string())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{
        FakeApplier, FakeBuilder, FakeNotifier, REPOSITORY, SCRAPER_TEMPLATE,
    };
    use woog_core::descriptor::CronJob;
    use woog_core::domain::run::RunState;

    struct Harness {
        builder: Arc<FakeBuilder>,
        applier: Arc<FakeApplier>,
        notifier: Arc<FakeNotifier>,
        service: ReleaseService,
    }

    fn harness(
        builder: FakeBuilder,
        applier: FakeApplier,
        notifier: FakeNotifier,
        template: &str,
    ) -> Harness {
        let builder = Arc::new(builder);
        let applier = Arc::new(applier);
        let notifier = Arc::new(notifier);
        let service = ReleaseService::new(
            REPOSITORY,
            DescriptorSource::Inline(template.to_string()),
            builder.clone(),
            applier.clone(),
            Some(notifier.clone()),
        );
        Harness {
            builder,
            applier,
            notifier,
            service,
        }
    }

    #[tokio::test]
    async fn test_successful_run_skips_alert() {
        let h = harness(
            FakeBuilder::default(),
            FakeApplier::default(),
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("deadbeef").await.unwrap();

        assert_eq!(
            *h.builder.calls.lock().unwrap(),
            vec![
                "build ghcr.io/woog-life/scraper:deadbeef",
                "push ghcr.io/woog-life/scraper:deadbeef"
            ]
        );

        let applied = h.applier.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert!(!applied[0].contains("{{TAG}}"));
        let cron_job = CronJob::from_yaml(&applied[0]).unwrap();
        assert_eq!(
            cron_job.containers()[0].image,
            "ghcr.io/woog-life/scraper:deadbeef"
        );

        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert_eq!(run.state, RunState::Deployed);
        assert_eq!(run.alert_decision(), AlertDecision::NoAlert);
        assert_eq!(run.outcome(StageName::Alert), Some(&StageOutcome::Skipped));
        assert!(run.succeeded());
    }

    #[tokio::test]
    async fn test_build_failure_skips_deploy_and_alerts() {
        let h = harness(
            FakeBuilder {
                fail_build: true,
                ..Default::default()
            },
            FakeApplier::default(),
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("deadbeef").await.unwrap();

        // Push never attempted after a failed build
        assert_eq!(h.builder.calls.lock().unwrap().len(), 1);
        assert!(h.applier.applied.lock().unwrap().is_empty());
        assert_eq!(run.state, RunState::BuildFailed);
        assert_eq!(run.outcome(StageName::Deploy), Some(&StageOutcome::Skipped));
        assert_eq!(*h.notifier.sent.lock().unwrap(), vec!["deadbeef"]);
        assert_eq!(run.outcome(StageName::Alert), Some(&StageOutcome::Success));
        assert!(!run.succeeded());
    }

    #[tokio::test]
    async fn test_push_failure_is_a_build_stage_failure() {
        let h = harness(
            FakeBuilder {
                fail_push: true,
                ..Default::default()
            },
            FakeApplier::default(),
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("deadbeef").await.unwrap();

        assert_eq!(run.state, RunState::BuildFailed);
        assert!(h.applier.applied.lock().unwrap().is_empty());
        let failures: Vec<_> = run.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("image push failed"));
    }

    #[tokio::test]
    async fn test_apply_rejection_alerts() {
        let h = harness(
            FakeBuilder::default(),
            FakeApplier {
                reject: true,
                ..Default::default()
            },
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("abc123").await.unwrap();

        assert_eq!(run.state, RunState::DeployFailed);
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
        assert!(matches!(
            run.outcome(StageName::Deploy),
            Some(StageOutcome::Failure(reason)) if reason.contains("forbidden")
        ));
    }

    #[tokio::test]
    async fn test_missing_placeholder_fails_deploy_before_apply() {
        let template = SCRAPER_TEMPLATE.replace("{{TAG}}", "latest");
        let h = harness(
            FakeBuilder::default(),
            FakeApplier::default(),
            FakeNotifier::default(),
            &template,
        );

        let run = h.service.run("abc123").await.unwrap();

        assert_eq!(run.state, RunState::DeployFailed);
        assert!(h.applier.applied.lock().unwrap().is_empty());
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_commit_fails_build() {
        let h = harness(
            FakeBuilder::default(),
            FakeApplier::default(),
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("not a sha").await.unwrap();

        assert!(h.builder.calls.lock().unwrap().is_empty());
        assert_eq!(run.state, RunState::BuildFailed);
    }

    #[tokio::test]
    async fn test_failed_notification_is_recorded() {
        let h = harness(
            FakeBuilder {
                fail_build: true,
                ..Default::default()
            },
            FakeApplier::default(),
            FakeNotifier {
                fail: true,
                ..Default::default()
            },
            SCRAPER_TEMPLATE,
        );

        let run = h.service.run("abc123").await.unwrap();

        assert!(matches!(
            run.outcome(StageName::Alert),
            Some(StageOutcome::Failure(_))
        ));
        // Still exactly one attempt
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_notifier_is_a_failure() {
        let service = ReleaseService::new(
            REPOSITORY,
            DescriptorSource::Inline(SCRAPER_TEMPLATE.to_string()),
            Arc::new(FakeBuilder {
                fail_build: true,
                ..Default::default()
            }),
            Arc::new(FakeApplier::default()),
            None,
        );

        let run = service.run("abc123").await.unwrap();
        assert!(matches!(
            run.outcome(StageName::Alert),
            Some(StageOutcome::Failure(reason)) if reason == "no notifier configured"
        ));
    }

    #[tokio::test]
    async fn test_render_does_not_apply() {
        let h = harness(
            FakeBuilder::default(),
            FakeApplier::default(),
            FakeNotifier::default(),
            SCRAPER_TEMPLATE,
        );

        let rendered = h.service.render("abc123").await.unwrap();
        assert!(rendered.text.contains("ghcr.io/woog-life/scraper:abc123"));
        assert!(h.applier.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_file() {
        let source = DescriptorSource::File(PathBuf::from("/nonexistent/cronjob.yaml"));
        assert!(matches!(source.load().await, Err(StageError::Render(_))));
    }
}
