//! Task record: identity + lifecycle state for one submitted unit of work.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::TransitionError;
use super::ids::Id;
use super::kind::{Kind, Lifecycle, TaskKind};

/// One submitted unit of work (intent, prediction or wallet transaction).
///
/// Design:
/// - `id`, `kind`, `input` and `created_at` never change after creation.
/// - `state` only moves along the kind's lifecycle (see `Lifecycle`).
/// - `result` is set at most once and never cleared.
/// - `settled_at` is stamped once, when the record reaches terminal success.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "", rename_all = "camelCase")]
pub struct TaskRecord<K: TaskKind> {
    pub id: Id<K>,
    pub kind: Kind,
    pub input: K::Input,
    state: K::State,
    result: Option<K::Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    pub created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl<K: TaskKind> TaskRecord<K> {
    pub fn new(id: Id<K>, input: K::Input, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: K::KIND,
            input,
            state: K::State::initial(),
            result: None,
            failure: None,
            created_at: now,
            updated_at: now,
            settled_at: None,
        }
    }

    pub fn state(&self) -> K::State {
        self.state
    }

    pub fn result(&self) -> Option<&K::Output> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The verified-or-completed timestamp.
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`. Returns the previous state.
    pub fn advance(&mut self, next: K::State, now: DateTime<Utc>) -> Result<K::State, TransitionError> {
        self.state.validate_transition(&self.id.to_string(), next)?;
        let previous = self.state;
        self.state = next;
        self.updated_at = now;
        if next.is_success() {
            self.settled_at = Some(now);
        }
        Ok(previous)
    }

    pub fn attach_result(&mut self, result: K::Output) -> Result<(), TransitionError> {
        if self.result.is_some() {
            return Err(TransitionError::ResultAlreadySet {
                id: self.id.to_string(),
            });
        }
        self.result = Some(result);
        Ok(())
    }

    /// Move to the kind's failure state. Returns the previous state.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<K::State, TransitionError> {
        let previous = self.advance(K::State::failed(), now)?;
        self.failure = Some(reason.into());
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Intent, IntentId, IntentInput, IntentOutcome, IntentState, RiskLevel,
    };
    use chrono::TimeZone;
    use ulid::Ulid;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn intent_record() -> TaskRecord<Intent> {
        let input = IntentInput {
            description: "Get 5% yield on my ETH with low risk".to_string(),
            amount: "1.0".to_string(),
            risk_level: RiskLevel::Low,
        };
        TaskRecord::new(IntentId::from_ulid(Ulid::new()), input, at(0))
    }

    fn outcome() -> IntentOutcome {
        IntentOutcome {
            route: "a → b".to_string(),
            estimated_gain: "8.4%".to_string(),
            actual_gain: "8.2%".to_string(),
        }
    }

    #[test]
    fn new_record_starts_in_initial_state() {
        let record = intent_record();
        assert_eq!(record.state(), IntentState::Pending);
        assert_eq!(record.kind, Kind::Intent);
        assert!(record.result().is_none());
        assert!(record.settled_at().is_none());
        assert_eq!(record.created_at, record.updated_at());
    }

    #[test]
    fn advance_walks_the_path_and_stamps_settlement() {
        let mut record = intent_record();
        assert_eq!(
            record.advance(IntentState::Executing, at(1)).unwrap(),
            IntentState::Pending
        );
        assert!(record.settled_at().is_none());

        record.advance(IntentState::Completed, at(6)).unwrap();
        assert_eq!(record.settled_at(), Some(at(6)));
        assert_eq!(record.updated_at(), at(6));
        assert_eq!(record.created_at, at(0));
    }

    #[test]
    fn advance_rejects_skips_and_leaves_record_untouched() {
        let mut record = intent_record();
        let err = record.advance(IntentState::Completed, at(1)).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(record.state(), IntentState::Pending);
        assert_eq!(record.updated_at(), at(0));
    }

    #[test]
    fn result_is_set_at_most_once() {
        let mut record = intent_record();
        record.attach_result(outcome()).unwrap();
        let err = record.attach_result(outcome()).unwrap_err();
        assert!(matches!(err, TransitionError::ResultAlreadySet { .. }));
        assert_eq!(record.result().unwrap().actual_gain, "8.2%");
    }

    #[test]
    fn fail_records_reason_without_settling() {
        let mut record = intent_record();
        record.advance(IntentState::Executing, at(1)).unwrap();
        record.fail("solver rejected route", at(2)).unwrap();
        assert_eq!(record.state(), IntentState::Failed);
        assert_eq!(record.failure(), Some("solver rejected route"));
        assert!(record.settled_at().is_none());
        assert!(record.is_terminal());
    }

    #[test]
    fn fail_from_pending_is_not_on_the_path() {
        let mut record = intent_record();
        assert!(record.fail("nope", at(1)).is_err());
        assert!(record.failure().is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = intent_record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "intent");
        assert_eq!(value["state"], "pending");
        assert_eq!(value["input"]["riskLevel"], "low");
        assert!(value["createdAt"].is_string());
        assert!(value["settledAt"].is_null());
        assert!(value.get("failure").is_none());
    }
}
