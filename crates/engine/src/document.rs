//! The persisted ledger document and its entry types.
//!
//! The whole state of a deployment lives in one `LedgerDocument`: it is read
//! fully at the start of every operation and written fully back at the end.
//! Every field defaults, so a missing or partial file deserializes into a
//! usable document.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EngineConfig, LedgerError, Money};

/// A shared expense: `payer` fronted `amount`, split equally among
/// `split_with`.
///
/// Payer and split names are stored exactly as submitted; they are matched
/// against the member roster case-insensitively when balances are derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub amount: Money,
    pub payer: String,
    pub split_with: Vec<String>,
}

impl Expense {
    /// Validates on construction: the split list must name at least one
    /// member.
    pub fn new(amount: Money, payer: String, split_with: Vec<String>) -> Result<Self, LedgerError> {
        if split_with.is_empty() {
            return Err(LedgerError::EmptySplit);
        }
        Ok(Self {
            amount,
            payer,
            split_with,
        })
    }
}

/// Settlement state of a transaction: which balance bucket it lands in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Closed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Pending => "pending",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "closed" => Ok(Self::Closed),
            "pending" => Ok(Self::Pending),
            other => Err(LedgerError::KeyNotFound(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Raw transaction fields as collected by the transport, before validation.
///
/// Amounts are the user's text; account names may be in any casing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub kind: String,
    pub amount_sent: String,
    pub currency_sent: String,
    pub from: String,
    pub amount_received: String,
    pub currency_received: String,
    pub to: String,
    pub status: TransactionStatus,
    pub info: String,
    pub description: String,
}

/// A committed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub kind: String,
    pub amount_sent: Money,
    pub currency_sent: String,
    pub from: String,
    pub amount_received: Money,
    pub currency_received: String,
    pub to: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    /// Validates a draft against the configured kind enumeration and parses
    /// its amounts.
    ///
    /// `from`/`to` must already be canonical roster names. For kinds
    /// configured as *simple* the received side is forced empty and the
    /// status forced to `Closed`, regardless of what the draft carried.
    pub fn from_draft(draft: TransactionDraft, config: &EngineConfig) -> Result<Self, LedgerError> {
        let Some(kind) = config.kind(&draft.kind) else {
            return Err(LedgerError::UnknownKind(draft.kind));
        };

        let amount_sent: Money = draft.amount_sent.parse()?;
        let amount_received: Money = if draft.amount_received.trim().is_empty() {
            Money::ZERO
        } else {
            draft.amount_received.parse()?
        };

        let description = if draft.description.is_empty() {
            kind.default_description()
        } else {
            draft.description
        };

        let mut tx = Self {
            date: draft.date,
            kind: kind.name.clone(),
            amount_sent,
            currency_sent: draft.currency_sent,
            from: draft.from,
            amount_received,
            currency_received: draft.currency_received,
            to: draft.to,
            status: draft.status,
            info: draft.info,
            description,
        };

        if kind.simple {
            tx.amount_received = Money::ZERO;
            tx.currency_received = String::new();
            tx.to = String::new();
            tx.status = TransactionStatus::Closed;
        }

        Ok(tx)
    }
}

/// Per-account running totals, one signed bucket per currency code.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    #[serde(default)]
    pub settled: BTreeMap<String, Money>,
    #[serde(default)]
    pub pending: BTreeMap<String, Money>,
}

impl AccountBalance {
    /// The bucket a transaction of the given status lands in.
    pub fn bucket_mut(&mut self, status: TransactionStatus) -> &mut BTreeMap<String, Money> {
        match status {
            TransactionStatus::Closed => &mut self.settled,
            TransactionStatus::Pending => &mut self.pending,
        }
    }
}

/// Per-category contributing transactions plus per-currency running totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub total: BTreeMap<String, Money>,
}

/// The whole persisted state of one deployment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerDocument {
    pub members: Vec<String>,
    pub accounts: Vec<String>,
    pub expenses: Vec<Expense>,
    pub chores: BTreeMap<String, i64>,
    pub penalties: BTreeMap<String, u32>,
    pub last_week_violators: BTreeMap<String, bool>,
    pub transactions: Vec<Transaction>,
    pub balances: BTreeMap<String, AccountBalance>,
    pub spending: BTreeMap<String, CategoryAggregate>,
    pub report_chat_id: Option<i64>,
}

impl LedgerDocument {
    /// Applies a committed transaction to the running balance table.
    ///
    /// The `from` bucket is debited by `amount_sent` in `currency_sent`; the
    /// `to` bucket, when a destination and a positive received amount are
    /// present, is credited by `amount_received` in `currency_received`.
    /// This is a pure running-total update, never replayed from history:
    /// correctness depends on every commit path calling it exactly once.
    pub fn apply_balance_effects(&mut self, tx: &Transaction) {
        let from = self.balances.entry(tx.from.clone()).or_default();
        let bucket = from.bucket_mut(tx.status);
        *bucket.entry(tx.currency_sent.clone()).or_default() -= tx.amount_sent;

        if !tx.to.is_empty() && tx.amount_received.is_positive() {
            let to = self.balances.entry(tx.to.clone()).or_default();
            let bucket = to.bucket_mut(tx.status);
            *bucket.entry(tx.currency_received.clone()).or_default() += tx.amount_received;
        }
    }

    /// Appends a committed transaction to its spending-category aggregate,
    /// when its kind belongs to the configured category set.
    pub fn apply_spending_effects(&mut self, tx: &Transaction, config: &EngineConfig) {
        if !config.is_spending_category(&tx.kind) {
            return;
        }
        let aggregate = self.spending.entry(tx.kind.clone()).or_default();
        aggregate.transactions.push(tx.clone());
        *aggregate
            .total
            .entry(tx.currency_sent.clone())
            .or_default() += tx.amount_sent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_requires_a_split() {
        let err = Expense::new(Money::new(1000), "Alice".to_string(), Vec::new()).unwrap_err();
        assert_eq!(err, LedgerError::EmptySplit);
    }

    #[test]
    fn partial_document_self_heals_missing_fields() {
        let doc: LedgerDocument =
            serde_json::from_str(r#"{"members": ["alice"], "chores": {"alice": 3}}"#).unwrap();
        assert_eq!(doc.members, vec!["alice"]);
        assert_eq!(doc.chores.get("alice"), Some(&3));
        assert!(doc.transactions.is_empty());
        assert!(doc.balances.is_empty());
        assert_eq!(doc.report_chat_id, None);
    }

    #[test]
    fn simple_kind_forces_received_side_empty() {
        let config = EngineConfig::default();
        let draft = TransactionDraft {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            kind: "groceries".to_string(),
            amount_sent: "12,30".to_string(),
            currency_sent: "EUR".to_string(),
            from: "Cash".to_string(),
            amount_received: "99".to_string(),
            currency_received: "USD".to_string(),
            to: "Bank".to_string(),
            status: TransactionStatus::Pending,
            info: String::new(),
            description: String::new(),
        };

        let tx = Transaction::from_draft(draft, &config).unwrap();
        assert_eq!(tx.amount_sent, Money::new(1230));
        assert_eq!(tx.amount_received, Money::ZERO);
        assert_eq!(tx.currency_received, "");
        assert_eq!(tx.to, "");
        assert_eq!(tx.status, TransactionStatus::Closed);
        assert_eq!(tx.description, "Groceries purchase");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let config = EngineConfig::default();
        let draft = TransactionDraft {
            kind: "bribes".to_string(),
            amount_sent: "1".to_string(),
            ..TransactionDraft::default()
        };
        let err = Transaction::from_draft(draft, &config).unwrap_err();
        assert_eq!(err, LedgerError::UnknownKind("bribes".to_string()));
    }

    #[test]
    fn pending_transaction_only_touches_the_pending_bucket() {
        let mut doc = LedgerDocument::default();
        let tx = Transaction {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            kind: "transfer".to_string(),
            amount_sent: Money::new(500),
            currency_sent: "EUR".to_string(),
            from: "Cash".to_string(),
            amount_received: Money::new(540),
            currency_received: "USD".to_string(),
            to: "Bank".to_string(),
            status: TransactionStatus::Pending,
            info: String::new(),
            description: String::new(),
        };

        doc.apply_balance_effects(&tx);

        let cash = &doc.balances["Cash"];
        assert_eq!(cash.pending.get("EUR"), Some(&Money::new(-500)));
        assert!(cash.settled.is_empty());

        let bank = &doc.balances["Bank"];
        assert_eq!(bank.pending.get("USD"), Some(&Money::new(540)));
        assert!(bank.settled.is_empty());
    }
}
