//! PipelineBuilder - パイプラインの構築とワイヤリング
//!
//! Every port has a default (system clock, ULID ids, mock synthesizers), so
//! `PipelineBuilder::new().build()` is a complete session. Tests swap in a
//! `ManualClock` and a `SequentialIdGenerator`.
//!
//! # Fail-fast 設計
//! - build() 時に設定を検証し、不正なら BuildError を返す

use std::sync::Arc;

use crate::config::{ConfigError, PipelineConfig};
use crate::domain::{Intent, Prediction, WalletTransaction};
use crate::impls::MockSynthesizer;
use crate::ports::{Clock, IdGenerator, ResultSynthesizer, RoutePlanner, SystemClock, UlidGenerator};

use super::pipeline::{Pipeline, Synthesizers};

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// BuildError はパイプライン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("event capacity must be positive")]
    ZeroEventCapacity,
}

pub struct PipelineBuilder {
    config: PipelineConfig,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    intent: Option<Arc<dyn ResultSynthesizer<Intent>>>,
    prediction: Option<Arc<dyn ResultSynthesizer<Prediction>>>,
    transaction: Option<Arc<dyn ResultSynthesizer<WalletTransaction>>>,
    route_planner: Option<Arc<dyn RoutePlanner>>,
    event_capacity: usize,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            clock: None,
            id_generator: None,
            intent: None,
            prediction: None,
            transaction: None,
            route_planner: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn id_generator(mut self, id_generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(id_generator));
        self
    }

    pub fn intent_synthesizer(mut self, synth: impl ResultSynthesizer<Intent> + 'static) -> Self {
        self.intent = Some(Arc::new(synth));
        self
    }

    pub fn prediction_synthesizer(
        mut self,
        synth: impl ResultSynthesizer<Prediction> + 'static,
    ) -> Self {
        self.prediction = Some(Arc::new(synth));
        self
    }

    pub fn transaction_synthesizer(
        mut self,
        synth: impl ResultSynthesizer<WalletTransaction> + 'static,
    ) -> Self {
        self.transaction = Some(Arc::new(synth));
        self
    }

    pub fn route_planner(mut self, planner: impl RoutePlanner + 'static) -> Self {
        self.route_planner = Some(Arc::new(planner));
        self
    }

    /// Buffer size of the event channel. Slow subscribers that fall further
    /// behind than this see `RecvError::Lagged`.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Pipeline, BuildError> {
        self.config.validate()?;
        if self.event_capacity == 0 {
            return Err(BuildError::ZeroEventCapacity);
        }

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let id_generator: Arc<dyn IdGenerator> = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let mock = Arc::new(MockSynthesizer::new());
        let synthesizers = Synthesizers {
            intent: self.intent.unwrap_or_else(|| mock.clone()),
            prediction: self.prediction.unwrap_or_else(|| mock.clone()),
            transaction: self.transaction.unwrap_or_else(|| mock.clone()),
            route_planner: self.route_planner.unwrap_or_else(|| mock.clone()),
        };

        Ok(Pipeline::new(
            self.config,
            clock,
            id_generator,
            synthesizers,
            self.event_capacity,
        ))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_defaults() {
        let pipeline = PipelineBuilder::new().build();
        assert!(pipeline.is_ok());
    }

    #[test]
    fn test_build_invalid_config() {
        let config = PipelineConfig {
            time_unit_ms: 0,
            ..PipelineConfig::default()
        };
        let pipeline = PipelineBuilder::new().config(config).build();
        assert!(matches!(pipeline, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_zero_event_capacity() {
        let pipeline = PipelineBuilder::new().event_capacity(0).build();
        assert!(matches!(pipeline, Err(BuildError::ZeroEventCapacity)));
    }

    #[tokio::test]
    async fn test_build_uses_given_config() {
        let config = PipelineConfig {
            time_unit_ms: 10,
            ..PipelineConfig::default()
        };
        let pipeline = PipelineBuilder::new().config(config.clone()).build().unwrap();
        assert_eq!(pipeline.config(), &config);
        assert!(pipeline.list::<Intent>().await.is_empty());
    }
}
