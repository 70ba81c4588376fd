//! Intents: natural-language DeFi goals routed through a solver network.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::PipelineError;
use super::ids::{Id, IdMarker};
use super::kind::{Kind, TaskKind, TaskRef};
use super::state::IntentState;

/// Marker for intent tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Intent {}

impl IdMarker for Intent {
    fn prefix() -> &'static str {
        "intent-"
    }
}

impl TaskKind for Intent {
    const KIND: Kind = Kind::Intent;

    type Input = IntentInput;
    type Output = IntentOutcome;
    type State = IntentState;

    fn task_ref(id: Id<Self>) -> TaskRef {
        TaskRef::Intent(id)
    }
}

pub type IntentId = Id<Intent>;

pub const DESCRIPTION_LABEL: &str = "Intent description";
pub const AMOUNT_LABEL: &str = "Amount";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(PipelineError::InvalidValue {
                field: "risk_level",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentInput {
    pub description: String,
    pub amount: String,
    pub risk_level: RiskLevel,
}

impl IntentInput {
    /// Validates raw form values. Description and amount are required
    /// (whitespace counts as empty); a missing risk level means medium.
    pub fn parse(
        description: &str,
        amount: &str,
        risk_level: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let mut missing = Vec::new();
        if description.trim().is_empty() {
            missing.push(DESCRIPTION_LABEL.to_string());
        }
        if amount.trim().is_empty() {
            missing.push(AMOUNT_LABEL.to_string());
        }
        if !missing.is_empty() {
            return Err(PipelineError::MissingFields(missing));
        }

        let risk_level = match risk_level.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => RiskLevel::default(),
        };

        Ok(Self {
            description: description.trim().to_string(),
            amount: amount.trim().to_string(),
            risk_level,
        })
    }
}

/// Read-only preview of how an intent would be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePreview {
    pub parsed_intent: String,
    pub optimal_route: Vec<String>,
    pub estimated_apy: String,
    pub gas_cost: String,
    pub slippage: String,
    pub time_to_execute: String,
}

impl RoutePreview {
    pub fn route_summary(&self) -> String {
        self.optimal_route.join(" → ")
    }
}

/// Attached when an intent completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentOutcome {
    pub route: String,
    pub estimated_gain: String,
    pub actual_gain: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_trims_and_defaults_risk() {
        let input = IntentInput::parse("  test ", " 1.0", None).unwrap();
        assert_eq!(input.description, "test");
        assert_eq!(input.amount, "1.0");
        assert_eq!(input.risk_level, RiskLevel::Medium);
    }

    #[rstest]
    #[case::no_description("", "1.0", vec![DESCRIPTION_LABEL])]
    #[case::blank_amount("test", "   ", vec![AMOUNT_LABEL])]
    #[case::both("", "", vec![DESCRIPTION_LABEL, AMOUNT_LABEL])]
    fn parse_reports_missing_fields(
        #[case] description: &str,
        #[case] amount: &str,
        #[case] expected: Vec<&str>,
    ) {
        let err = IntentInput::parse(description, amount, None).unwrap_err();
        match err {
            PipelineError::MissingFields(labels) => assert_eq!(labels, expected),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[rstest]
    #[case("low", RiskLevel::Low)]
    #[case("HIGH", RiskLevel::High)]
    #[case(" medium ", RiskLevel::Medium)]
    fn risk_level_parses(#[case] raw: &str, #[case] expected: RiskLevel) {
        let input = IntentInput::parse("test", "1.0", Some(raw)).unwrap();
        assert_eq!(input.risk_level, expected);
    }

    #[test]
    fn unknown_risk_level_is_invalid() {
        let err = IntentInput::parse("test", "1.0", Some("yolo")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { field: "risk_level", .. }));
    }

    #[test]
    fn route_summary_joins_steps() {
        let preview = RoutePreview {
            parsed_intent: "test".to_string(),
            optimal_route: vec!["Swap".to_string(), "Stake".to_string()],
            estimated_apy: "8.4%".to_string(),
            gas_cost: "0.012 ETH".to_string(),
            slippage: "0.1%".to_string(),
            time_to_execute: "~45 seconds".to_string(),
        };
        assert_eq!(preview.route_summary(), "Swap → Stake");
    }
}
