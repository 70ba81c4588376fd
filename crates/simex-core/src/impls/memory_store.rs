//! In-memory task store.

use std::collections::{HashMap, VecDeque};

use crate::domain::{Id, StoreError, TaskKind, TaskRecord};
use crate::ports::TaskStore;

/// Records keyed by id, plus their insertion order.
///
/// `order` holds the newest id at the front, so `list` is a straight walk.
pub struct InMemoryTaskStore<K: TaskKind> {
    records: HashMap<Id<K>, TaskRecord<K>>,
    order: VecDeque<Id<K>>,
}

impl<K: TaskKind> InMemoryTaskStore<K> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn not_found(id: Id<K>) -> StoreError {
        StoreError::NotFound {
            kind: K::KIND,
            id: id.to_string(),
        }
    }
}

impl<K: TaskKind> Default for InMemoryTaskStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TaskKind> TaskStore<K> for InMemoryTaskStore<K> {
    fn insert(&mut self, record: TaskRecord<K>) -> Result<(), StoreError> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::DuplicateId {
                kind: K::KIND,
                id: record.id.to_string(),
            });
        }
        self.order.push_front(record.id);
        self.records.insert(record.id, record);
        Ok(())
    }

    fn update<F, T, E>(&mut self, id: Id<K>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut TaskRecord<K>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let slot = self.records.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        let mut draft = slot.clone();
        let value = f(&mut draft)?;
        *slot = draft;
        Ok(value)
    }

    fn get(&self, id: Id<K>) -> Option<&TaskRecord<K>> {
        self.records.get(&id)
    }

    fn list(&self) -> Vec<TaskRecord<K>> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect()
    }

    fn remove(&mut self, id: Id<K>) -> Option<TaskRecord<K>> {
        let record = self.records.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(record)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
