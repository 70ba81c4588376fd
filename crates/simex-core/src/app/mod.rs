//! App - アプリケーション層
//!
//! ports を組み合わせてパイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **StageScheduler**: 時間指定の状態遷移キュー
//! - **Pipeline**: セッションのコンテキストと全エントリポイント
//! - **PipelineBuilder**: 構築とワイヤリング
//! - **SchedulerLoop**: 実時間で遷移を適用するループ

pub mod builder;
pub mod pipeline;
pub mod scheduler;
pub mod scheduler_loop;

pub use self::builder::{BuildError, DEFAULT_EVENT_CAPACITY, PipelineBuilder};
pub use self::pipeline::{Pipeline, StoredKind, Synthesizers, TaskStores};
pub use self::scheduler::{ScheduledTransition, StageScheduler, Transition};
pub use self::scheduler_loop::SchedulerLoop;
