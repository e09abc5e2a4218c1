//! Stage error taxonomy
//!
//! Each variant carries an opaque detail string. The orchestrator only ever
//! turns these into a stage failure reason; it never branches on the detail.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The image could not be built
    #[error("image build failed: {0}")]
    Build(String),

    /// The registry rejected the push
    #[error("image push failed: {0}")]
    Publish(String),

    /// The descriptor could not be loaded, rendered or validated
    #[error("descriptor rendering failed: {0}")]
    Render(String),

    /// The cluster rejected the descriptor or could not be reached
    #[error("cluster apply failed: {0}")]
    Apply(String),

    /// The failure notification could not be delivered
    #[error("notification failed: {0}")]
    Notify(String),
}
