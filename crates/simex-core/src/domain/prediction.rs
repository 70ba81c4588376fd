//! Predictions: model runs whose results carry a (fabricated) zkML proof.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::PipelineError;
use super::ids::{Id, IdMarker};
use super::kind::{Kind, TaskKind, TaskRef};
use super::state::PredictionState;

/// Marker for prediction tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prediction {}

impl IdMarker for Prediction {
    fn prefix() -> &'static str {
        "prediction-"
    }
}

impl TaskKind for Prediction {
    const KIND: Kind = Kind::Prediction;

    type Input = PredictionInput;
    type Output = PredictionOutcome;
    type State = PredictionState;

    fn task_ref(id: Id<Self>) -> TaskRef {
        TaskRef::Prediction(id)
    }
}

pub type PredictionId = Id<Prediction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    CreditRisk,
    PricePrediction,
    DefiRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub placeholder: &'static str,
}

/// Input schema and display metadata for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn field(
    key: &'static str,
    label: &'static str,
    field_type: FieldType,
    placeholder: &'static str,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        field_type,
        placeholder,
    }
}

const CREDIT_RISK: ModelSpec = ModelSpec {
    kind: ModelKind::CreditRisk,
    name: "Credit Risk Assessment",
    description: "Analyze credit risk based on financial metrics",
    fields: &[
        field("income", "Annual Income ($)", FieldType::Number, "50000"),
        field("debt", "Total Debt ($)", FieldType::Number, "25000"),
        field("credit_history", "Credit History (years)", FieldType::Number, "5"),
        field("employment", "Employment Status", FieldType::Text, "Full-time"),
    ],
};

const PRICE_PREDICTION: ModelSpec = ModelSpec {
    kind: ModelKind::PricePrediction,
    name: "Asset Price Prediction",
    description: "Predict future asset prices using ML models",
    fields: &[
        field("symbol", "Asset Symbol", FieldType::Text, "ETH"),
        field("timeframe", "Timeframe (hours)", FieldType::Number, "24"),
        field("current_price", "Current Price ($)", FieldType::Number, "2000"),
        field("volume", "24h Volume", FieldType::Number, "1000000"),
    ],
};

const DEFI_RISK: ModelSpec = ModelSpec {
    kind: ModelKind::DefiRisk,
    name: "DeFi Protocol Risk",
    description: "Assess risk levels of DeFi protocols",
    fields: &[
        field("protocol", "Protocol Name", FieldType::Text, "Uniswap"),
        field("tvl", "TVL ($)", FieldType::Number, "5000000000"),
        field("age_days", "Protocol Age (days)", FieldType::Number, "365"),
        field("audit_score", "Audit Score (0-100)", FieldType::Number, "85"),
    ],
};

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::CreditRisk,
        ModelKind::PricePrediction,
        ModelKind::DefiRisk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::CreditRisk => "credit-risk",
            ModelKind::PricePrediction => "price-prediction",
            ModelKind::DefiRisk => "defi-risk",
        }
    }

    pub fn spec(self) -> &'static ModelSpec {
        match self {
            ModelKind::CreditRisk => &CREDIT_RISK,
            ModelKind::PricePrediction => &PRICE_PREDICTION,
            ModelKind::DefiRisk => &DEFI_RISK,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| PipelineError::UnknownModel(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub model: ModelKind,
    pub fields: BTreeMap<String, String>,
}

impl PredictionInput {
    /// Checks every field declared by the model's schema. Missing or blank
    /// fields are reported by label, in schema order.
    pub fn parse(model: &str, fields: BTreeMap<String, String>) -> Result<Self, PipelineError> {
        let model: ModelKind = model.parse()?;
        let missing: Vec<String> = model
            .spec()
            .fields
            .iter()
            .filter(|spec| {
                fields
                    .get(spec.key)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|spec| spec.label.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingFields(missing));
        }
        Ok(Self { model, fields })
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|value| value.trim())
    }
}

/// Model-specific verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Verdict {
    CreditRisk {
        risk_score: String,
        risk_level: String,
        recommended_action: String,
    },
    PricePrediction {
        predicted_price: String,
        price_change: String,
        direction: String,
    },
    DefiRisk {
        risk_score: String,
        risk_category: String,
        recommendation: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcome {
    pub verdict: Verdict,
    /// Percentage in `[70, 100)`.
    pub confidence: f64,
    /// `0x` followed by 64 hex digits.
    pub proof: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(model: ModelKind) -> BTreeMap<String, String> {
        model
            .spec()
            .fields
            .iter()
            .map(|spec| (spec.key.to_string(), spec.placeholder.to_string()))
            .collect()
    }

    #[test]
    fn every_model_declares_four_fields() {
        for model in ModelKind::ALL {
            assert_eq!(model.spec().kind, model);
            assert_eq!(model.spec().fields.len(), 4);
        }
    }

    #[test]
    fn model_ids_round_trip_through_serde() {
        for model in ModelKind::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{model}\""));
            assert_eq!(model.as_str().parse::<ModelKind>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = PredictionInput::parse("weather", BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownModel(name) if name == "weather"));
    }

    #[test]
    fn complete_input_parses() {
        let input = PredictionInput::parse("credit-risk", complete(ModelKind::CreditRisk)).unwrap();
        assert_eq!(input.model, ModelKind::CreditRisk);
        assert_eq!(input.field("income"), Some("50000"));
    }

    #[test]
    fn one_missing_field_is_named_exactly() {
        let mut fields = complete(ModelKind::PricePrediction);
        fields.remove("current_price");
        let err = PredictionInput::parse("price-prediction", fields).unwrap_err();
        match err {
            PipelineError::MissingFields(labels) => {
                assert_eq!(labels, vec!["Current Price ($)".to_string()])
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn blank_fields_count_as_missing_in_schema_order() {
        let mut fields = complete(ModelKind::DefiRisk);
        fields.insert("audit_score".to_string(), " ".to_string());
        fields.remove("protocol");
        let err = PredictionInput::parse("defi-risk", fields).unwrap_err();
        match err {
            PipelineError::MissingFields(labels) => assert_eq!(
                labels,
                vec!["Protocol Name".to_string(), "Audit Score (0-100)".to_string()]
            ),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn verdict_is_tagged_by_model() {
        let verdict = Verdict::PricePrediction {
            predicted_price: "2010.00".to_string(),
            price_change: "0.50".to_string(),
            direction: "Bullish".to_string(),
        };
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["model"], "price-prediction");
        assert_eq!(value["predictedPrice"], "2010.00");
    }
}
