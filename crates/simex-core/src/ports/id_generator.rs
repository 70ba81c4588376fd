//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）
//! - **SequentialIdGenerator**: 連番（テスト用、決定的）

use std::sync::atomic::{AtomicU64, Ordering};

use ulid::Ulid;

use crate::domain::ids::{Id, IdMarker};
use crate::ports::Clock;

/// IdGenerator は一意な ID を生成
///
/// Returns a raw ULID; `next_id` types it for the caller. Uniqueness per
/// generator instance is the only contract the stores rely on.
pub trait IdGenerator: Send + Sync {
    fn next_ulid(&self) -> Ulid;
}

/// Typed wrapper over `IdGenerator::next_ulid`.
pub fn next_id<T: IdMarker>(generator: &dyn IdGenerator) -> Id<T> {
    Id::from_ulid(generator.next_ulid())
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

/// Deterministic ids: timestamp 0, random part counting up from 1.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_ulid(&self) -> Ulid {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ulid::from_parts(0, u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IntentId, TransactionId};
    use crate::ports::{ManualClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.next_ulid();
        let id2 = id_gen.next_ulid();
        let id3 = id_gen.next_ulid();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_stamps_clock_time() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(ManualClock::new(fixed_time));

        let id1 = id_gen.next_ulid();
        let id2 = id_gen.next_ulid();

        // 時刻が同じでもランダム部分で区別される
        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), id2.timestamp_ms());
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn sequential_ids_count_up() {
        let id_gen = SequentialIdGenerator::new();
        let a: IntentId = next_id(&id_gen);
        let b: TransactionId = next_id(&id_gen);
        assert_eq!(a.as_ulid(), Ulid::from_parts(0, 1));
        assert_eq!(b.as_ulid(), Ulid::from_parts(0, 2));
        assert!(b.to_string().starts_with("tx-"));
    }
}
