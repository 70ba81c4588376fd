//! Change notifications pushed to subscribers (the presentation layer).

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::kind::TaskRef;

/// One observable change to the task stores.
///
/// States are carried as their display strings so a single event type can
/// describe all three kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Created {
        task: TaskRef,
        state: String,
        at: DateTime<Utc>,
    },
    Transitioned {
        task: TaskRef,
        from: String,
        to: String,
        at: DateTime<Utc>,
    },
    Discarded {
        task: TaskRef,
        at: DateTime<Utc>,
    },
}

impl TaskEvent {
    pub fn created(task: impl Into<TaskRef>, state: impl ToString, at: DateTime<Utc>) -> Self {
        Self::Created {
            task: task.into(),
            state: state.to_string(),
            at,
        }
    }

    pub fn transitioned(
        task: impl Into<TaskRef>,
        from: impl ToString,
        to: impl ToString,
        at: DateTime<Utc>,
    ) -> Self {
        Self::Transitioned {
            task: task.into(),
            from: from.to_string(),
            to: to.to_string(),
            at,
        }
    }

    pub fn discarded(task: impl Into<TaskRef>, at: DateTime<Utc>) -> Self {
        Self::Discarded {
            task: task.into(),
            at,
        }
    }

    pub fn task(&self) -> TaskRef {
        match self {
            Self::Created { task, .. }
            | Self::Transitioned { task, .. }
            | Self::Discarded { task, .. } => *task,
        }
    }
}
