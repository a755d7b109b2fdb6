//! Deployment-configurable enumerations: currencies, transaction kinds and
//! the spending-category set. Defaults match the original deployment.

use serde::{Deserialize, Serialize};

/// One configured transaction kind.
///
/// *Simple* kinds are single-sided spends: the received side of the entry is
/// forced empty and the status forced to `closed` at validation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionKindConfig {
    pub name: String,
    #[serde(default)]
    pub simple: bool,
}

impl TransactionKindConfig {
    fn new(name: &str, simple: bool) -> Self {
        Self {
            name: name.to_string(),
            simple,
        }
    }

    /// Description used when the entry carries none, e.g. "Groceries
    /// purchase".
    pub fn default_description(&self) -> String {
        let mut chars = self.name.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        if self.simple {
            format!("{capitalized} purchase")
        } else {
            capitalized
        }
    }
}

/// Engine-level configuration, usually deserialized from `settings.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub currencies: Vec<String>,
    pub transaction_kinds: Vec<TransactionKindConfig>,
    pub spending_categories: Vec<String>,
    /// How many entries a transaction listing shows.
    pub list_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currencies: ["USD", "EUR", "GBP"].map(String::from).to_vec(),
            transaction_kinds: vec![
                TransactionKindConfig::new("groceries", true),
                TransactionKindConfig::new("transport", true),
                TransactionKindConfig::new("snack", true),
                TransactionKindConfig::new("rent", true),
                TransactionKindConfig::new("leisure", true),
                TransactionKindConfig::new("transfer", false),
            ],
            spending_categories: ["groceries", "transport", "snack", "rent", "leisure"]
                .map(String::from)
                .to_vec(),
            list_limit: 15,
        }
    }
}

impl EngineConfig {
    /// Looks up a configured kind, case-insensitively.
    pub fn kind(&self, name: &str) -> Option<&TransactionKindConfig> {
        self.transaction_kinds
            .iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
    }

    pub fn is_spending_category(&self, kind: &str) -> bool {
        self.spending_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(kind))
    }
}
