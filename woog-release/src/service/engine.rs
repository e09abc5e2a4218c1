//! Container image build and publish
//!
//! Handles the `build_push_docker` stage's external work:
//! - Checking the container engine is installed
//! - Building the image from the source tree
//! - Pushing the tagged image to the registry
//!
//! Registry credentials are ambient: the engine is expected to be logged in.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{error, info};

use crate::error::StageError;
use crate::process::run_command;

/// Builds and publishes container images
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Builds the image and tags it as `image`
    async fn build(&self, image: &str) -> Result<(), StageError>;

    /// Pushes `image` to its registry
    async fn push(&self, image: &str) -> Result<(), StageError>;
}

/// `docker` or `podman` driven through its CLI
#[derive(Debug, Clone)]
pub struct ContainerEngine {
    /// Engine binary (e.g., "docker", "podman")
    binary: String,
    /// Build context directory
    context: PathBuf,
    /// Dockerfile, relative to the working directory; engine default when None
    dockerfile: Option<PathBuf>,
}

impl ContainerEngine {
    pub fn new(binary: impl Into<String>, context: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            context: context.into(),
            dockerfile: None,
        }
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<PathBuf>) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Checks that the engine is installed and answers `--version`
    pub async fn check_available(&self) -> Result<String, StageError> {
        let output = run_command(&self.binary, &["--version".to_string()], None)
            .await
            .map_err(|e| {
                StageError::Build(format!(
                    "failed to execute '{} --version'. Is it installed? {}",
                    self.binary, e
                ))
            })?;

        if !output.success() {
            return Err(StageError::Build(format!(
                "{} is not working correctly: {}",
                self.binary,
                output.failure_summary()
            )));
        }

        let version = output.stdout.trim().to_string();
        info!("Container engine is available: {}", version);
        Ok(version)
    }

    fn build_args(&self, image: &str) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), image.to_string()];

        if let Some(dockerfile) = &self.dockerfile {
            args.push("-f".to_string());
            args.push(dockerfile.to_string_lossy().to_string());
        }

        args.push(self.context.to_string_lossy().to_string());
        args
    }

    fn push_args(&self, image: &str) -> Vec<String> {
        vec!["push".to_string(), image.to_string()]
    }
}

#[async_trait]
impl ImageBuilder for ContainerEngine {
    async fn build(&self, image: &str) -> Result<(), StageError> {
        info!("Building image {} with {}", image, self.binary);

        let output = run_command(&self.binary, &self.build_args(image), None)
            .await
            .map_err(|e| StageError::Build(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.success() {
            let reason = output.failure_summary();
            error!("Build of {} failed: {}", image, reason);
            return Err(StageError::Build(reason));
        }

        info!("Image {} built", image);
        Ok(())
    }

    async fn push(&self, image: &str) -> Result<(), StageError> {
        info!("Pushing image {}", image);

        let output = run_command(&self.binary, &self.push_args(image), None)
            .await
            .map_err(|e| StageError::Publish(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.success() {
            let reason = output.failure_summary();
            error!("Push of {} failed: {}", image, reason);
            return Err(StageError::Publish(reason));
        }

        info!("Image {} published", image);
        Ok(())
    }
}
