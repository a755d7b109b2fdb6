//! The ledger engine: validates entries and commits them to the store.
//!
//! Every operation follows the same cycle: read the document fresh, stage
//! all changes on that local copy in a fixed order (append entry, update
//! balances, update category aggregates), persist, and only then return.
//! A failed persist drops the staged copy, so no entry is ever partially
//! committed: the store is the state.

use crate::{
    AccountBalance, DocumentStore, EngineConfig, Expense, LedgerDocument, LedgerError, Money,
    Roster, ToggleAction, Transaction, TransactionDraft,
    standings::{self, LagReport, PenaltyPolicy},
};

/// Points credited for one chore, together with the member's new total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoreCredit {
    pub member: String,
    pub points: i64,
    pub total: i64,
}

/// Minutes of chore work per point.
pub const MINUTES_PER_POINT: i64 = 15;

/// The ledger state machine over an injected document store.
pub struct Ledger<S: DocumentStore> {
    store: S,
    config: EngineConfig,
}

impl<S: DocumentStore> Ledger<S> {
    /// Builds the engine and primes the store, so a missing or corrupt
    /// document self-heals at startup rather than on the first user action.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, LedgerError> {
        store.read()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load(&self) -> Result<LedgerDocument, LedgerError> {
        Ok(self.store.read()?)
    }

    fn commit(&self, doc: &LedgerDocument) -> Result<(), LedgerError> {
        Ok(self.store.write(doc)?)
    }

    /// A snapshot of the whole document (read-only collaborators, tests).
    pub fn document(&self) -> Result<LedgerDocument, LedgerError> {
        self.load()
    }

    pub fn members(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.load()?.members)
    }

    pub fn accounts(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.load()?.accounts)
    }

    /// Adds the member if absent, removes them if present (case-insensitive
    /// match, removal by stored casing). Removing a member also deletes
    /// their penalty counter and lag flag; chore history is retained.
    pub fn toggle_member(&self, name: &str) -> Result<ToggleAction, LedgerError> {
        let mut doc = self.load()?;
        let mut roster = Roster::from_names(&doc.members);
        let action = roster.toggle(name);
        doc.members = roster.into_names();

        if let ToggleAction::Removed(canonical) = &action {
            doc.penalties.remove(canonical);
            doc.last_week_violators.remove(&canonical.to_lowercase());
        }

        self.commit(&doc)?;
        tracing::info!(?action, "member roster changed");
        Ok(action)
    }

    /// Adds the account if absent (with an empty balance bucket), removes it
    /// and its balance bucket if present.
    pub fn toggle_account(&self, name: &str) -> Result<ToggleAction, LedgerError> {
        let mut doc = self.load()?;
        let mut roster = Roster::from_names(&doc.accounts);
        let action = roster.toggle(name);
        doc.accounts = roster.into_names();

        match &action {
            ToggleAction::Added(canonical) => {
                doc.balances
                    .insert(canonical.clone(), AccountBalance::default());
            }
            ToggleAction::Removed(canonical) => {
                doc.balances.remove(canonical);
            }
        }

        self.commit(&doc)?;
        tracing::info!(?action, "account roster changed");
        Ok(action)
    }

    /// Records a shared expense. No balance table is touched: chore-variant
    /// balances are derived from the expense log on demand.
    pub fn record_expense(
        &self,
        amount_text: &str,
        payer: &str,
        split_with: &[String],
    ) -> Result<Expense, LedgerError> {
        let amount: Money = amount_text.parse()?;
        let expense = Expense::new(amount, payer.trim().to_string(), split_with.to_vec())?;

        let mut doc = self.load()?;
        doc.expenses.push(expense.clone());
        self.commit(&doc)?;

        tracing::info!(amount = %expense.amount, payer = %expense.payer, "expense recorded");
        Ok(expense)
    }

    /// Credits chore points: one point per started-and-finished 15 minutes,
    /// the fractional remainder is discarded.
    pub fn record_chore(&self, member: &str, minutes_text: &str) -> Result<ChoreCredit, LedgerError> {
        let minutes: i64 = minutes_text.trim().parse().map_err(|_| {
            LedgerError::InvalidDuration(format!("not a whole number of minutes: {minutes_text}"))
        })?;
        if minutes < 0 {
            return Err(LedgerError::InvalidDuration(
                "minutes must be non-negative".to_string(),
            ));
        }

        let points = minutes / MINUTES_PER_POINT;
        let mut doc = self.load()?;

        // Accumulate under an existing chore key when one matches
        // case-insensitively, so a re-typed name never splits a total.
        let member = member.trim();
        let key = doc
            .chores
            .keys()
            .find(|k| k.to_lowercase() == member.to_lowercase())
            .cloned()
            .unwrap_or_else(|| member.to_string());

        let total = doc.chores.entry(key.clone()).or_insert(0);
        *total += points;
        let credit = ChoreCredit {
            member: key,
            points,
            total: *total,
        };

        self.commit(&doc)?;
        tracing::info!(member = %credit.member, points, "chore recorded");
        Ok(credit)
    }

    /// Validates and commits one transaction, with side effects in fixed
    /// order: append to the log, update balances, update category
    /// aggregates, persist.
    pub fn record_transaction(&self, draft: TransactionDraft) -> Result<Transaction, LedgerError> {
        let mut doc = self.load()?;
        if doc.accounts.is_empty() {
            return Err(LedgerError::NoAccounts);
        }

        // Validate (and apply the simple-kind forcing rule) before resolving
        // accounts: a forced-empty destination never needs to resolve.
        let mut tx = Transaction::from_draft(draft, &self.config)?;

        let roster = Roster::from_names(&doc.accounts);
        tx.from = roster
            .resolve(&tx.from)
            .ok_or_else(|| LedgerError::KeyNotFound(tx.from.clone()))?
            .to_string();
        if !tx.to.is_empty() {
            tx.to = roster
                .resolve(&tx.to)
                .ok_or_else(|| LedgerError::KeyNotFound(tx.to.clone()))?
                .to_string();
        }

        doc.transactions.push(tx.clone());
        doc.apply_balance_effects(&tx);
        doc.apply_spending_effects(&tx, &self.config);
        self.commit(&doc)?;

        tracing::info!(
            kind = %tx.kind,
            amount = %tx.amount_sent,
            currency = %tx.currency_sent,
            from = %tx.from,
            "transaction recorded"
        );
        Ok(tx)
    }

    /// Registers the chat the scheduled weekly report is delivered to.
    pub fn register_report_chat(&self, chat_id: i64) -> Result<(), LedgerError> {
        let mut doc = self.load()?;
        doc.report_chat_id = Some(chat_id);
        self.commit(&doc)
    }

    pub fn report_chat(&self) -> Result<Option<i64>, LedgerError> {
        Ok(self.load()?.report_chat_id)
    }

    /// Runs a lag check under the given policy and persists the updated
    /// penalty counters and flags.
    pub fn check_penalties(&self, policy: PenaltyPolicy) -> Result<LagReport, LedgerError> {
        let mut doc = self.load()?;
        let (report, updates) = standings::detect_lag(&doc, policy);
        doc.penalties = updates.penalties;
        doc.last_week_violators = updates.flags;
        self.commit(&doc)?;
        Ok(report)
    }

    /// Rebuilds the running balance table and category aggregates by
    /// replaying the full transaction log. Recovery operation: the normal
    /// write path never reconciles the running totals.
    pub fn recompute_balances(&self) -> Result<(), LedgerError> {
        let mut doc = self.load()?;
        standings::replay_balances(&mut doc, &self.config);
        self.commit(&doc)?;
        tracing::info!("balances recomputed from transaction log");
        Ok(())
    }

    /// Explicit full-data deletion, the only way balances reset.
    pub fn erase_all(&self) -> Result<(), LedgerError> {
        self.commit(&LedgerDocument::default())?;
        tracing::warn!("ledger erased");
        Ok(())
    }

    /// Chore standings plus derived balances, rendered.
    pub fn standings_text(&self) -> Result<String, LedgerError> {
        Ok(crate::report::standings_text(&self.load()?))
    }

    /// Recent transactions, rendered.
    pub fn transactions_text(&self) -> Result<String, LedgerError> {
        Ok(crate::report::transactions_text(
            &self.load()?,
            self.config.list_limit,
        ))
    }

    /// Account summary and spending-by-category, rendered.
    pub fn report_text(&self) -> Result<String, LedgerError> {
        Ok(crate::report::report_text(&self.load()?))
    }
}
