//! Result synthesis ports.
//!
//! The pipeline never computes results itself. It asks a synthesizer, which
//! in the default build fabricates plausible values (`MockSynthesizer`).

use async_trait::async_trait;

use crate::domain::{IntentInput, RoutePreview, TaskKind};

/// What a synthesizer hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis<T> {
    Ready(T),
    /// The backend rejected the input. The reason is shown to the user.
    Failed(String),
}

impl<T> Synthesis<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Synthesis::Ready(value) => Ok(value),
            Synthesis::Failed(reason) => Err(reason),
        }
    }
}

/// Produces the result attached to a record of kind `K`.
///
/// Called outside the pipeline lock, so implementations may take their time.
#[async_trait]
pub trait ResultSynthesizer<K: TaskKind>: Send + Sync {
    async fn synthesize(&self, input: &K::Input) -> Synthesis<K::Output>;
}

/// Produces the read-only route preview for an intent.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    async fn plan(&self, input: &IntentInput) -> RoutePreview;
}
