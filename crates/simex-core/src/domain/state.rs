//! Per-kind state machines.
//!
//! All three share one shape: submitted -> processing -> (branch) -> terminal.
//!
//! - Intent: `Pending -> Executing -> {Completed, Failed}`
//! - Prediction: `Generating -> Unverified -> {Verified, Failed}`
//! - WalletTransaction: `Pending -> {Completed, Failed}`

use std::fmt;

use serde::{Deserialize, Serialize};

use super::kind::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    /// Submitted, waiting for an explicit execute.
    Pending,

    /// Handed to the (simulated) solver network.
    Executing,

    Completed,

    Failed,
}

impl Lifecycle for IntentState {
    fn initial() -> Self {
        IntentState::Pending
    }

    fn failed() -> Self {
        IntentState::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            IntentState::Pending => &[IntentState::Executing],
            IntentState::Executing => &[IntentState::Completed, IntentState::Failed],
            IntentState::Completed | IntentState::Failed => &[],
        }
    }

    fn is_success(self) -> bool {
        self == IntentState::Completed
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentState::Pending => write!(f, "pending"),
            IntentState::Executing => write!(f, "executing"),
            IntentState::Completed => write!(f, "completed"),
            IntentState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionState {
    /// Implicit: a record only becomes visible once synthesis succeeded,
    /// so stored predictions never sit here.
    Generating,

    /// Result and proof attached, on-chain verification pending.
    Unverified,

    Verified,

    Failed,
}

impl Lifecycle for PredictionState {
    fn initial() -> Self {
        PredictionState::Generating
    }

    fn failed() -> Self {
        PredictionState::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            PredictionState::Generating => &[PredictionState::Unverified],
            PredictionState::Unverified => &[PredictionState::Verified, PredictionState::Failed],
            PredictionState::Verified | PredictionState::Failed => &[],
        }
    }

    fn is_success(self) -> bool {
        self == PredictionState::Verified
    }
}

impl fmt::Display for PredictionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionState::Generating => write!(f, "generating"),
            PredictionState::Unverified => write!(f, "unverified"),
            PredictionState::Verified => write!(f, "verified"),
            PredictionState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Pending,
    Completed,
    Failed,
}

impl Lifecycle for TransactionState {
    fn initial() -> Self {
        TransactionState::Pending
    }

    fn failed() -> Self {
        TransactionState::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            TransactionState::Pending => &[TransactionState::Completed, TransactionState::Failed],
            TransactionState::Completed | TransactionState::Failed => &[],
        }
    }

    fn is_success(self) -> bool {
        self == TransactionState::Completed
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Pending => write!(f, "pending"),
            TransactionState::Completed => write!(f, "completed"),
            TransactionState::Failed => write!(f, "failed"),
        }
    }
}
