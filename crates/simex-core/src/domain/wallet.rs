//! Smart-wallet transactions and the feature modules that gate them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::PipelineError;
use super::ids::{Id, IdMarker};
use super::kind::{Kind, TaskKind, TaskRef};
use super::state::TransactionState;

/// Marker for wallet transaction tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WalletTransaction {}

impl IdMarker for WalletTransaction {
    fn prefix() -> &'static str {
        "tx-"
    }
}

impl TaskKind for WalletTransaction {
    const KIND: Kind = Kind::WalletTransaction;

    type Input = TransactionInput;
    type Output = TransactionReceipt;
    type State = TransactionState;

    fn task_ref(id: Id<Self>) -> TaskRef {
        TaskRef::WalletTransaction(id)
    }
}

pub type TransactionId = Id<WalletTransaction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Sponsored; requires the `gasless` module.
    #[default]
    Gasless,
    Standard,
}

impl TransactionKind {
    /// The module that must be enabled before this kind is accepted.
    pub fn required_module(self) -> Option<ModuleId> {
        match self {
            TransactionKind::Gasless => Some(ModuleId::Gasless),
            TransactionKind::Standard => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Gasless => write!(f, "gasless"),
            TransactionKind::Standard => write!(f, "standard"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gasless" => Ok(TransactionKind::Gasless),
            "standard" => Ok(TransactionKind::Standard),
            _ => Err(PipelineError::InvalidValue {
                field: "transaction_kind",
                value: s.to_string(),
            }),
        }
    }
}

pub const TX_AMOUNT_LABEL: &str = "Amount";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub kind: TransactionKind,
    pub amount: String,
}

impl TransactionInput {
    pub fn parse(kind: TransactionKind, amount: &str) -> Result<Self, PipelineError> {
        if amount.trim().is_empty() {
            return Err(PipelineError::MissingFields(vec![TX_AMOUNT_LABEL.to_string()]));
        }
        Ok(Self {
            kind,
            amount: amount.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub gasless: bool,
    pub fee: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Gasless,
    Social,
    Automation,
    Session,
}

impl ModuleId {
    pub const ALL: [ModuleId; 4] = [
        ModuleId::Gasless,
        ModuleId::Social,
        ModuleId::Automation,
        ModuleId::Session,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::Gasless => "gasless",
            ModuleId::Social => "social",
            ModuleId::Automation => "automation",
            ModuleId::Session => "session",
        }
    }

    fn catalog(self) -> (&'static str, &'static str, &'static [&'static str]) {
        match self {
            ModuleId::Gasless => (
                "Gasless Transactions",
                "Execute transactions without paying gas fees",
                &["Zero gas fees", "Improved UX", "Sponsored transactions"],
            ),
            ModuleId::Social => (
                "Social Recovery",
                "Recover your wallet using trusted guardians",
                &["No seed phrase needed", "Guardian-based recovery", "Enhanced security"],
            ),
            ModuleId::Automation => (
                "Intent Automation",
                "Automatically execute intents and strategies",
                &["Auto-execution", "Smart scheduling", "Condition-based triggers"],
            ),
            ModuleId::Session => (
                "Session Keys",
                "Temporary keys for specific applications",
                &["Time-limited access", "App-specific permissions", "Enhanced security"],
            ),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| PipelineError::UnknownModule(s.to_string()))
    }
}

/// Display view of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletModule {
    pub id: ModuleId,
    pub name: &'static str,
    pub description: &'static str,
    pub benefits: &'static [&'static str],
    pub enabled: bool,
}

/// On/off flags for the wallet modules. Everything starts disabled.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    enabled: [bool; 4],
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(id: ModuleId) -> usize {
        id as usize
    }

    /// Flip the flag; returns the new value.
    pub fn toggle(&mut self, id: ModuleId) -> bool {
        let flag = &mut self.enabled[Self::slot(id)];
        *flag = !*flag;
        *flag
    }

    pub fn is_enabled(&self, id: ModuleId) -> bool {
        self.enabled[Self::slot(id)]
    }

    pub fn list(&self) -> Vec<WalletModule> {
        ModuleId::ALL
            .into_iter()
            .map(|id| {
                let (name, description, benefits) = id.catalog();
                WalletModule {
                    id,
                    name,
                    description,
                    benefits,
                    enabled: self.is_enabled(id),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn modules_start_disabled() {
        let registry = ModuleRegistry::new();
        assert!(registry.list().iter().all(|m| !m.enabled));
        assert_eq!(registry.list().len(), 4);
    }

    #[test]
    fn toggle_flips_only_one_module() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.toggle(ModuleId::Gasless));
        assert!(registry.is_enabled(ModuleId::Gasless));
        assert!(!registry.is_enabled(ModuleId::Session));

        assert!(!registry.toggle(ModuleId::Gasless));
        assert!(!registry.is_enabled(ModuleId::Gasless));
    }

    #[rstest]
    #[case("gasless", ModuleId::Gasless)]
    #[case("Social", ModuleId::Social)]
    #[case(" automation ", ModuleId::Automation)]
    #[case("session", ModuleId::Session)]
    fn module_ids_parse(#[case] raw: &str, #[case] expected: ModuleId) {
        assert_eq!(raw.parse::<ModuleId>().unwrap(), expected);
    }

    #[test]
    fn unknown_module_is_rejected() {
        let err = "bridge".parse::<ModuleId>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownModule(name) if name == "bridge"));
    }

    #[test]
    fn catalog_matches_module_ids() {
        let modules = ModuleRegistry::new().list();
        assert_eq!(modules[0].name, "Gasless Transactions");
        assert_eq!(modules[1].benefits[0], "No seed phrase needed");
        assert_eq!(modules[3].id, ModuleId::Session);
    }

    #[test]
    fn gasless_requires_its_module() {
        assert_eq!(TransactionKind::Gasless.required_module(), Some(ModuleId::Gasless));
        assert_eq!(TransactionKind::Standard.required_module(), None);
    }

    #[test]
    fn empty_amount_is_missing() {
        let err = TransactionInput::parse(TransactionKind::Gasless, "  ").unwrap_err();
        assert!(matches!(err, PipelineError::MissingFields(labels) if labels == vec!["Amount".to_string()]));
        let input = TransactionInput::parse(TransactionKind::Standard, " 0.1 ").unwrap();
        assert_eq!(input.amount, "0.1");
    }
}
