//! Error taxonomy.
//!
//! - `StoreError` / `TransitionError`: internal invariant violations. They
//!   should never surface with correct id generation and scheduling.
//! - `PipelineError`: what the submission entry points return. Most variants
//!   are recoverable client errors shown to the user as-is.

use thiserror::Error;

use super::kind::Kind;
use super::wallet::ModuleId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: Kind, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: Kind, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to} for {id}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("result already set for {id}")]
    ResultAlreadySet { id: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Labels of the required fields that were empty, in schema order.
    #[error("missing input: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{module} is disabled; enable the module first")]
    FeatureDisabled { module: ModuleId },

    #[error("unknown prediction model: {0}")]
    UnknownModel(String),

    #[error("unknown wallet module: {0}")]
    UnknownModule(String),

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("{kind} synthesis failed: {reason}")]
    SynthesisFailed { kind: Kind, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Client-side problems the presentation layer should show to the user.
    /// Everything else is a programming error and only worth logging.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingFields(_)
                | Self::FeatureDisabled { .. }
                | Self::UnknownModel(_)
                | Self::UnknownModule(_)
                | Self::InvalidValue { .. }
                | Self::SynthesisFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_labels() {
        let err = PipelineError::MissingFields(vec![
            "Annual Income ($)".to_string(),
            "Employment Status".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "missing input: Annual Income ($), Employment Status"
        );
        assert!(err.is_user_facing());
    }

    #[test]
    fn store_errors_are_internal() {
        let err: PipelineError = StoreError::NotFound {
            kind: Kind::Intent,
            id: "intent-x".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "intent not found: intent-x");
        assert!(!err.is_user_facing());
    }

    #[test]
    fn feature_disabled_names_the_module() {
        let err = PipelineError::FeatureDisabled {
            module: ModuleId::Gasless,
        };
        assert!(err.to_string().starts_with("gasless is disabled"));
    }
}
