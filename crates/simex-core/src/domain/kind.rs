//! Task kinds and the lifecycle contract shared by their state machines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{PipelineError, TransitionError};
use super::ids::{Id, IdMarker};
use super::intent::{Intent, IntentId};
use super::prediction::{Prediction, PredictionId};
use super::wallet::{TransactionId, WalletTransaction};

/// Runtime tag of a task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Intent,
    Prediction,
    WalletTransaction,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Intent, Kind::Prediction, Kind::WalletTransaction];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Intent => "intent",
            Kind::Prediction => "prediction",
            Kind::WalletTransaction => "wallet_transaction",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "intent" => Ok(Kind::Intent),
            "prediction" => Ok(Kind::Prediction),
            "wallet_transaction" | "transaction" => Ok(Kind::WalletTransaction),
            _ => Err(PipelineError::InvalidValue {
                field: "kind",
                value: s.to_string(),
            }),
        }
    }
}

/// A per-kind state machine.
///
/// Transitions are monotonic: a state only moves to one of its `successors`.
/// Self transitions and anything out of a terminal state are rejected.
pub trait Lifecycle:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static
{
    fn initial() -> Self;

    /// The failure landing state. Every machine has one, even if the
    /// default synthesizers never drive a record there.
    fn failed() -> Self;

    fn successors(self) -> &'static [Self];

    /// Terminal and successful (`Completed`, `Verified`).
    fn is_success(self) -> bool;

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    fn validate_transition(self, id: &str, next: Self) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                id: id.to_string(),
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Binds a kind marker to its input, result and state types.
///
/// The markers (`Intent`, `Prediction`, `WalletTransaction`) are uninhabited
/// enums that double as `IdMarker`s, so `Id<Intent>` is the intent id type.
pub trait TaskKind: IdMarker + Clone + fmt::Debug + Sized {
    const KIND: Kind;

    type Input: Clone + fmt::Debug + Serialize + Send + Sync + 'static;
    type Output: Clone + fmt::Debug + Serialize + Send + Sync + 'static;
    type State: Lifecycle;

    fn task_ref(id: Id<Self>) -> TaskRef;
}

/// Kind-erased reference to one task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskRef {
    Intent(IntentId),
    Prediction(PredictionId),
    WalletTransaction(TransactionId),
}

impl TaskRef {
    pub fn kind(self) -> Kind {
        match self {
            TaskRef::Intent(_) => Kind::Intent,
            TaskRef::Prediction(_) => Kind::Prediction,
            TaskRef::WalletTransaction(_) => Kind::WalletTransaction,
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Intent(id) => id.fmt(f),
            TaskRef::Prediction(id) => id.fmt(f),
            TaskRef::WalletTransaction(id) => id.fmt(f),
        }
    }
}

impl From<IntentId> for TaskRef {
    fn from(id: IntentId) -> Self {
        Intent::task_ref(id)
    }
}

impl From<PredictionId> for TaskRef {
    fn from(id: PredictionId) -> Self {
        Prediction::task_ref(id)
    }
}

impl From<TransactionId> for TaskRef {
    fn from(id: TransactionId) -> Self {
        WalletTransaction::task_ref(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    #[rstest]
    #[case::intent("intent", Kind::Intent)]
    #[case::prediction("Prediction", Kind::Prediction)]
    #[case::wallet("wallet_transaction", Kind::WalletTransaction)]
    #[case::wallet_dashed("wallet-transaction", Kind::WalletTransaction)]
    #[case::short("transaction", Kind::WalletTransaction)]
    fn kind_parses(#[case] raw: &str, #[case] expected: Kind) {
        assert_eq!(raw.parse::<Kind>().unwrap(), expected);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "vault".parse::<Kind>().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { field: "kind", .. }));
    }

    #[test]
    fn kind_display_matches_serde() {
        for kind in Kind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn task_ref_serializes_kind_and_id() {
        let id = IntentId::from_ulid(Ulid::nil());
        let value = serde_json::to_value(TaskRef::from(id)).unwrap();
        assert_eq!(value["kind"], "intent");
        assert_eq!(value["id"], Ulid::nil().to_string());
        assert_eq!(TaskRef::from(id).kind(), Kind::Intent);
        assert_eq!(TaskRef::from(id).to_string(), id.to_string());
    }
}
