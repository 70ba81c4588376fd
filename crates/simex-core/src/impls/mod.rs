//! Impls - ports の既定実装（インメモリ・モック）

pub mod memory_store;
pub mod mock_synthesizer;

pub use self::memory_store::InMemoryTaskStore;
pub use self::mock_synthesizer::MockSynthesizer;
