//! Service layer
//!
//! Services contain the release logic. The orchestration in
//! [`ReleaseService`] talks to the outside world only through the
//! [`ImageBuilder`], [`ClusterApplier`] and [`Notifier`] traits, so each
//! stage can be swapped for a fake in tests.

mod cluster;
mod engine;
mod notifier;
mod release;

#[cfg(test)]
pub mod testing;

// Re-export traits
pub use cluster::ClusterApplier;
pub use engine::ImageBuilder;
pub use notifier::Notifier;

// Re-export implementations
pub use cluster::Kubectl;
pub use engine::ContainerEngine;
pub use notifier::TelegramNotifier;
pub use release::{DescriptorSource, ReleaseService};
