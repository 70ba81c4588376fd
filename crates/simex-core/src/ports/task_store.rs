//! TaskStore port - 種類ごとのタスク記録の正本（source of truth）
//!
//! One store per task kind. The store itself is synchronous: the pipeline
//! keeps all stores behind a single lock, so each call is already atomic
//! with respect to the scheduler and the other entry points.

use crate::domain::{Id, StoreError, TaskKind, TaskRecord};

pub trait TaskStore<K: TaskKind>: Send + Sync {
    /// Add a new record. Ids are unique per store.
    fn insert(&mut self, record: TaskRecord<K>) -> Result<(), StoreError>;

    /// Apply `f` to the record with `id`.
    ///
    /// `f` runs against a copy; the stored record is replaced only when `f`
    /// returns `Ok`, so a rejected transition never leaves a half-applied
    /// record behind.
    fn update<F, T, E>(&mut self, id: Id<K>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut TaskRecord<K>) -> Result<T, E>,
        E: From<StoreError>;

    fn get(&self, id: Id<K>) -> Option<&TaskRecord<K>>;

    /// Newest first.
    fn list(&self) -> Vec<TaskRecord<K>>;

    /// Drop the record. Returns it if it existed.
    fn remove(&mut self, id: Id<K>) -> Option<TaskRecord<K>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
