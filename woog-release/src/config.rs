//! Configuration module
//!
//! Release settings assembled once from the command line and environment,
//! then handed to the command handlers. Nothing below `main` reads the
//! environment directly.

use std::path::PathBuf;
use std::sync::Arc;

use woog_client::TelegramClient;

use crate::service::{
    ClusterApplier, ContainerEngine, DescriptorSource, ImageBuilder, Kubectl, Notifier,
    ReleaseService, TelegramNotifier,
};

/// Telegram bot settings for the alert stage
#[derive(Clone)]
pub struct TelegramSettings {
    pub api_url: String,
    pub token: String,
    /// Fixed recipient of failure alerts
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Release CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Image repository without tag (e.g., "ghcr.io/woog-life/scraper")
    pub image_repository: String,

    /// Container engine binary ("docker" or "podman")
    pub engine: String,

    /// Build context directory
    pub build_context: PathBuf,

    /// Dockerfile, engine default when None
    pub dockerfile: Option<PathBuf>,

    /// Descriptor template containing `{{TAG}}`
    pub descriptor: PathBuf,

    /// kubectl binary
    pub kubectl: String,

    /// kubeconfig context, current context when None
    pub kube_context: Option<String>,

    /// Source repository shown in alerts (e.g., "woog-life/scraper")
    pub repository: String,

    /// Alert delivery, alerts fail when None
    pub telegram: Option<TelegramSettings>,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.image_repository.is_empty() {
            anyhow::bail!("image repository cannot be empty");
        }

        if woog_core::descriptor::image_tag(&self.image_repository).is_some() {
            anyhow::bail!(
                "image repository '{}' must not carry a tag, the commit is used as tag",
                self.image_repository
            );
        }

        if self.engine.is_empty() {
            anyhow::bail!("container engine cannot be empty");
        }

        if self.kubectl.is_empty() {
            anyhow::bail!("kubectl binary cannot be empty");
        }

        if let Some(telegram) = &self.telegram {
            if telegram.token.is_empty() {
                anyhow::bail!("telegram token cannot be empty");
            }
            if telegram.chat_id.is_empty() {
                anyhow::bail!("telegram chat id cannot be empty");
            }
            if !telegram.api_url.starts_with("http://") && !telegram.api_url.starts_with("https://")
            {
                anyhow::bail!("telegram api url must start with http:// or https://");
            }
        }

        Ok(())
    }

    pub fn image_builder(&self) -> ContainerEngine {
        let engine = ContainerEngine::new(&self.engine, &self.build_context);
        match &self.dockerfile {
            Some(dockerfile) => engine.with_dockerfile(dockerfile),
            None => engine,
        }
    }

    pub fn notifier(&self) -> Option<TelegramNotifier> {
        self.telegram.as_ref().map(|t| {
            let client = TelegramClient::with_base_url(&t.api_url, &t.token);
            TelegramNotifier::new(client, &t.chat_id, &self.repository)
        })
    }

    /// Wires the release service from this configuration
    pub fn release_service(&self, dry_run: bool) -> ReleaseService {
        let builder: Arc<dyn ImageBuilder> = Arc::new(self.image_builder());
        let applier: Arc<dyn ClusterApplier> = Arc::new(
            Kubectl::new(&self.kubectl)
                .with_context(self.kube_context.clone())
                .with_dry_run(dry_run),
        );
        let notifier = self
            .notifier()
            .map(|n| Arc::new(n) as Arc<dyn Notifier>);

        ReleaseService::new(
            &self.image_repository,
            DescriptorSource::File(self.descriptor.clone()),
            builder,
            applier,
            notifier,
        )
    }
}
