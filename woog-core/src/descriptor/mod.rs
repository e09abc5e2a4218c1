//! CronJob deployment descriptor
//!
//! Typed view of the manifest the deploy stage submits to the cluster.
//! The rendered text is what gets applied; the model only exists so that a
//! descriptor can be checked before it leaves the machine.

pub mod template;

use serde::{Deserialize, Serialize};

use crate::schedule::{Schedule, ScheduleError};
pub use template::{RenderError, TAG_PLACEHOLDER, render};

/// Kubernetes default for `successfulJobsHistoryLimit`
const DEFAULT_SUCCESSFUL_HISTORY: u32 = 3;
/// Kubernetes default for `failedJobsHistoryLimit`
const DEFAULT_FAILED_HISTORY: u32 = 1;
/// Kubernetes default for `backoffLimit`
const DEFAULT_BACKOFF_LIMIT: u32 = 6;

/// Most job records of each kind the scraper keeps around
pub const MAX_HISTORY: u32 = 1;

/// Errors produced while checking a descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("descriptor is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("expected kind CronJob, found {0}")]
    UnexpectedKind(String),

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("{kind}JobsHistoryLimit is {limit}, at most {max} allowed", max = MAX_HISTORY)]
    HistoryLimit { kind: &'static str, limit: u32 },

    #[error(
        "restartPolicy {restart_policy:?} with backoffLimit {backoff_limit} retries failed runs, \
         expected restartPolicy Never with backoffLimit 0"
    )]
    Retries {
        restart_policy: RestartPolicy,
        backoff_limit: u32,
    },

    #[error("job template declares no containers")]
    NoContainers,

    #[error("container '{container}' image '{image}' has no tag")]
    MissingImageTag { container: String, image: String },
}

/// Restart policy of the job's pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Never,
    OnFailure,
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CronJobSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobSpec {
    pub schedule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful_jobs_history_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_jobs_history_limit: Option<u32>,
    pub job_template: JobTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub spec: JobSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<u32>,
    pub template: PodTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodTemplate {
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub containers: Vec<Container>,
    pub restart_policy: RestartPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// One `envFrom` entry: a secret or a config map, referenced by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<NameRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<NameRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
}

/// Flattened view of an `envFrom` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource<'a> {
    Secret(&'a str),
    ConfigMap(&'a str),
}

impl Container {
    /// Environment sources in declaration order
    pub fn env_sources(&self) -> Vec<EnvSource<'_>> {
        self.env_from
            .iter()
            .flat_map(|source| {
                let secret = source
                    .secret_ref
                    .as_ref()
                    .map(|r| EnvSource::Secret(r.name.as_str()));
                let config = source
                    .config_map_ref
                    .as_ref()
                    .map(|r| EnvSource::ConfigMap(r.name.as_str()));
                secret.into_iter().chain(config)
            })
            .collect()
    }

    /// Tag part of the image reference
    pub fn image_tag(&self) -> Option<&str> {
        image_tag(&self.image)
    }
}

/// Extracts the tag from `registry/repo:tag`
///
/// A colon before the last slash belongs to a registry port, not a tag.
pub fn image_tag(image: &str) -> Option<&str> {
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &image[name_start..];
    let (_, tag) = name.split_once(':')?;
    if tag.is_empty() { None } else { Some(tag) }
}

impl CronJob {
    /// Parses a rendered descriptor
    pub fn from_yaml(text: &str) -> Result<Self, DescriptorError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn containers(&self) -> &[Container] {
        &self.spec.job_template.spec.template.spec.containers
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.spec.job_template.spec.template.spec.restart_policy
    }

    pub fn successful_history_limit(&self) -> u32 {
        self.spec
            .successful_jobs_history_limit
            .unwrap_or(DEFAULT_SUCCESSFUL_HISTORY)
    }

    pub fn failed_history_limit(&self) -> u32 {
        self.spec
            .failed_jobs_history_limit
            .unwrap_or(DEFAULT_FAILED_HISTORY)
    }

    pub fn backoff_limit(&self) -> u32 {
        self.spec
            .job_template
            .spec
            .backoff_limit
            .unwrap_or(DEFAULT_BACKOFF_LIMIT)
    }

    /// Pods a single firing can create before the job is marked failed
    ///
    /// With `Never`, every retry is a new pod, so the count is `backoffLimit + 1`.
    /// Other policies restart in place and are not bounded here.
    pub fn max_attempts_per_firing(&self) -> Option<u32> {
        match self.restart_policy() {
            RestartPolicy::Never => Some(self.backoff_limit() + 1),
            RestartPolicy::OnFailure | RestartPolicy::Always => None,
        }
    }

    pub fn schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::parse(&self.spec.schedule)
    }

    /// Checks the descriptor before it is applied
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.kind != "CronJob" {
            return Err(DescriptorError::UnexpectedKind(self.kind.clone()));
        }

        self.schedule()?;

        let successful = self.successful_history_limit();
        if successful > MAX_HISTORY {
            return Err(DescriptorError::HistoryLimit {
                kind: "successful",
                limit: successful,
            });
        }

        let failed = self.failed_history_limit();
        if failed > MAX_HISTORY {
            return Err(DescriptorError::HistoryLimit {
                kind: "failed",
                limit: failed,
            });
        }

        if self.max_attempts_per_firing() != Some(1) {
            return Err(DescriptorError::Retries {
                restart_policy: self.restart_policy(),
                backoff_limit: self.backoff_limit(),
            });
        }

        if self.containers().is_empty() {
            return Err(DescriptorError::NoContainers);
        }

        for container in self.containers() {
            if container.image_tag().is_none() {
                return Err(DescriptorError::MissingImageTag {
                    container: container.name.clone(),
                    image: container.image.clone(),
                });
            }
        }

        Ok(())
    }
}

/// A descriptor rendered for one commit and checked
#[derive(Debug, Clone)]
pub struct RenderedDescriptor {
    /// Text submitted to the cluster
    pub text: String,
    pub cron_job: CronJob,
}

/// Renders `template` for `tag`, parses the result and validates it
pub fn render_descriptor(template: &str, tag: &str) -> Result<RenderedDescriptor, DescriptorError> {
    let text = render(template, tag)?;
    let cron_job = CronJob::from_yaml(&text)?;
    cron_job.validate()?;

    Ok(RenderedDescriptor { text, cron_job })
}
