//! In-memory stage implementations for tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use woog_core::domain::run::PipelineRun;

use crate::error::StageError;
use crate::service::{ClusterApplier, DescriptorSource, ImageBuilder, Notifier, ReleaseService};

pub const SCRAPER_TEMPLATE: &str = include_str!("../../../deploy/cronjob.yaml");
pub const REPOSITORY: &str = "ghcr.io/woog-life/scraper";

/// Records every call; fails the configured step
#[derive(Default)]
pub struct FakeBuilder {
    pub fail_build: bool,
    pub fail_push: bool,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageBuilder for FakeBuilder {
    async fn build(&self, image: &str) -> Result<(), StageError> {
        self.calls.lock().unwrap().push(format!("build {}", image));
        if self.fail_build {
            return Err(StageError::Build("exit_code=1".to_string()));
        }
        Ok(())
    }

    async fn push(&self, image: &str) -> Result<(), StageError> {
        self.calls.lock().unwrap().push(format!("push {}", image));
        if self.fail_push {
            return Err(StageError::Publish("denied".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeApplier {
    pub reject: bool,
    pub applied: Mutex<Vec<String>>,
}

#[async_trait]
impl ClusterApplier for FakeApplier {
    async fn apply(&self, descriptor: &str) -> Result<String, StageError> {
        self.applied.lock().unwrap().push(descriptor.to_string());
        if self.reject {
            return Err(StageError::Apply("forbidden".to_string()));
        }
        Ok("cronjob.batch/scraper configured".to_string())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, run: &PipelineRun) -> Result<(), StageError> {
        self.sent.lock().unwrap().push(run.commit.clone());
        if self.fail {
            return Err(StageError::Notify("unreachable".to_string()));
        }
        Ok(())
    }
}

/// Release service over the scraper template and the given fakes
pub fn release_service(
    builder: FakeBuilder,
    applier: FakeApplier,
    notifier: FakeNotifier,
) -> ReleaseService {
    ReleaseService::new(
        REPOSITORY,
        DescriptorSource::Inline(SCRAPER_TEMPLATE.to_string()),
        Arc::new(builder),
        Arc::new(applier),
        Some(Arc::new(notifier)),
    )
}
