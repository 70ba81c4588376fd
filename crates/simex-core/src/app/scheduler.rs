//! StageScheduler - 時間指定の状態遷移キュー
//!
//! Timed transitions are plain values `(fire_at, seq, transition)` kept in a
//! min-heap. Nothing here touches a store or a clock; the pipeline pops due
//! entries and applies them. `seq` breaks ties so entries with the same
//! `fire_at` come out in the order they were scheduled.

use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use crate::domain::{
    IntentId, IntentOutcome, PredictionId, TaskRef, TransactionId, TransactionReceipt,
};
use crate::ports::Synthesis;

/// One deferred step of a record's lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Executing -> Completed (or Failed, if synthesis was rejected).
    FinishIntent {
        id: IntentId,
        outcome: Synthesis<IntentOutcome>,
    },
    /// Unverified -> Verified.
    VerifyPrediction { id: PredictionId },
    /// Pending -> Completed (or Failed).
    SettleTransaction {
        id: TransactionId,
        outcome: Synthesis<TransactionReceipt>,
    },
    /// Deadline: fail the record if it is still in flight.
    Expire { task: TaskRef },
}

impl Transition {
    pub fn task(&self) -> TaskRef {
        match self {
            Transition::FinishIntent { id, .. } => TaskRef::Intent(*id),
            Transition::VerifyPrediction { id } => TaskRef::Prediction(*id),
            Transition::SettleTransaction { id, .. } => TaskRef::WalletTransaction(*id),
            Transition::Expire { task } => *task,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::FinishIntent { .. } => "finish_intent",
            Transition::VerifyPrediction { .. } => "verify_prediction",
            Transition::SettleTransaction { .. } => "settle_transaction",
            Transition::Expire { .. } => "expire",
        }
    }
}

/// Scheduled entry for the priority queue.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone)]
pub struct ScheduledTransition {
    pub fire_at: DateTime<Utc>,
    pub seq: u64,
    pub transition: Transition,
}

impl PartialEq for ScheduledTransition {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for ScheduledTransition {}

impl PartialOrd for ScheduledTransition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTransition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // earlier fire_at (then lower seq) = higher priority
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct StageScheduler {
    queue: BinaryHeap<ScheduledTransition>,
    next_seq: u64,
}

impl StageScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at: DateTime<Utc>, transition: Transition) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledTransition {
            fire_at,
            seq,
            transition,
        });
        seq
    }

    /// Pop the earliest entry if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledTransition> {
        if self.queue.peek()?.fire_at > now {
            return None;
        }
        self.queue.pop()
    }

    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.queue.peek().map(|entry| entry.fire_at)
    }

    /// Drop every pending entry for `task`. Returns how many were dropped.
    pub fn cancel(&mut self, task: TaskRef) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.transition.task() != task);
        before - self.queue.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_for(&self, task: TaskRef) -> usize {
        self.queue
            .iter()
            .filter(|entry| entry.transition.task() == task)
            .count()
    }
}
