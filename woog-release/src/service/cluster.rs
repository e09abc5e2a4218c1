//! Cluster apply
//!
//! Submits a rendered descriptor to the cluster control plane through
//! `kubectl apply -f -`. The apply is a full replace of the CronJob object,
//! so repeating it with the same descriptor is harmless.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::StageError;
use crate::process::run_command;

/// Submits descriptors to the cluster
#[async_trait]
pub trait ClusterApplier: Send + Sync {
    /// Applies the descriptor, returning the control plane's report
    async fn apply(&self, descriptor: &str) -> Result<String, StageError>;
}

/// `kubectl` driven through its CLI, credentials come from the ambient kubeconfig
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
    /// kubeconfig context to use instead of the current one
    context: Option<String>,
    /// Validate client-side only, change nothing
    dry_run: bool,
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            context: None,
            dry_run: false,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn apply_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }

        args.extend(["apply", "-f", "-"].map(String::from));

        if self.dry_run {
            args.push("--dry-run=client".to_string());
        }

        args
    }
}

#[async_trait]
impl ClusterApplier for Kubectl {
    async fn apply(&self, descriptor: &str) -> Result<String, StageError> {
        info!("Applying descriptor with {}", self.binary);

        let output = run_command(&self.binary, &self.apply_args(), Some(descriptor))
            .await
            .map_err(|e| StageError::Apply(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.success() {
            let reason = output.failure_summary();
            error!("Cluster rejected descriptor: {}", reason);
            return Err(StageError::Apply(reason));
        }

        let report = output.stdout.trim().to_string();
        info!("Cluster accepted descriptor: {}", report);
        Ok(report)
    }
}
