//! simex-core
//!
//! Simulated execution pipeline: intents, predictions and wallet transactions
//! submitted as tasks that move through short, timed lifecycles.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, kinds, lifecycle states, records, events, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, TaskStore, ResultSynthesizer）
//! - **impls**: 既定実装（InMemoryTaskStore, MockSynthesizer）
//! - **app**: StageScheduler, Pipeline, PipelineBuilder, SchedulerLoop
//! - **config**: PipelineConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{BuildError, Pipeline, PipelineBuilder, SchedulerLoop};
pub use self::config::{ConfigError, PipelineConfig};
pub use self::domain::{Kind, PipelineError, TaskEvent, TaskRecord, TaskRef};
