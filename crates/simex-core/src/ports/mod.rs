//! Ports - 抽象化レイヤー
//!
//! 各 trait は差し替え可能な境界（時刻、ID、記録の保存先、結果の生成）を
//! 定義します。既定の実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod synthesizer;
pub mod task_store;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialIdGenerator, UlidGenerator, next_id};
pub use self::synthesizer::{ResultSynthesizer, RoutePlanner, Synthesis};
pub use self::task_store::TaskStore;
