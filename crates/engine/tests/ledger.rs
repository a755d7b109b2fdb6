use chrono::NaiveDate;

use engine::{
    EngineConfig, JsonFileStore, LagChange, LagReport, Ledger, LedgerError, MemoryStore, Money,
    PenaltyPolicy, ToggleAction, TransactionDraft, TransactionStatus, report,
};

fn ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::default(), EngineConfig::default()).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn simple_draft(kind: &str, amount: &str, from: &str) -> TransactionDraft {
    TransactionDraft {
        date: date(),
        kind: kind.to_string(),
        amount_sent: amount.to_string(),
        currency_sent: "EUR".to_string(),
        from: from.to_string(),
        ..TransactionDraft::default()
    }
}

#[test]
fn chore_points_are_minutes_div_fifteen() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();

    for (minutes, points) in [("0", 0), ("14", 0), ("15", 1), ("29", 1), ("30", 2)] {
        let credit = ledger.record_chore("Alice", minutes).unwrap();
        assert_eq!(credit.points, points, "minutes={minutes}");
    }

    // 0 + 0 + 1 + 1 + 2 accumulated.
    let doc = ledger.document().unwrap();
    assert_eq!(doc.chores.get("Alice"), Some(&4));
}

#[test]
fn chore_rejects_non_integer_and_negative_minutes() {
    let ledger = ledger();
    assert!(matches!(
        ledger.record_chore("Alice", "twenty").unwrap_err(),
        LedgerError::InvalidDuration(_)
    ));
    assert!(matches!(
        ledger.record_chore("Alice", "12.5").unwrap_err(),
        LedgerError::InvalidDuration(_)
    ));
    assert!(matches!(
        ledger.record_chore("Alice", "-15").unwrap_err(),
        LedgerError::InvalidDuration(_)
    ));
}

#[test]
fn chore_accumulates_under_one_key_across_casings() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    ledger.record_chore("Alice", "30").unwrap();
    let credit = ledger.record_chore("ALICE", "15").unwrap();

    assert_eq!(credit.member, "Alice");
    assert_eq!(credit.total, 3);
    assert_eq!(ledger.document().unwrap().chores.len(), 1);
}

#[test]
fn expense_shares_sum_to_the_amount_within_rounding_tolerance() {
    let ledger = ledger();
    for name in ["Alice", "Bob", "Carol"] {
        ledger.toggle_member(name).unwrap();
    }

    ledger
        .record_expense(
            "10.00",
            "Alice",
            &["Alice".to_string(), "Bob".to_string(), "Carol".to_string()],
        )
        .unwrap();

    let doc = ledger.document().unwrap();
    let balances = engine::standings::member_balances(&doc);
    // 10.00 split three ways: each share 3.33, 0.01 of documented drift.
    assert_eq!(balances["Bob"], Money::new(-333));
    assert_eq!(balances["Carol"], Money::new(-333));
    assert_eq!(balances["Alice"], Money::new(1000 - 333));
}

#[test]
fn expense_validation_errors() {
    let ledger = ledger();
    assert!(matches!(
        ledger
            .record_expense("lots", "Alice", &["Bob".to_string()])
            .unwrap_err(),
        LedgerError::InvalidAmount(_)
    ));
    assert_eq!(
        ledger.record_expense("10", "Alice", &[]).unwrap_err(),
        LedgerError::EmptySplit
    );

    // Nothing was committed.
    assert!(ledger.document().unwrap().expenses.is_empty());
}

#[test]
fn expense_amount_is_rounded_at_entry_time() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    let expense = ledger
        .record_expense("10,005", "Alice", &["Alice".to_string()])
        .unwrap();
    assert_eq!(expense.amount, Money::new(1001));
}

#[test]
fn toggling_twice_restores_roster_and_drops_penalty_buckets() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    ledger.toggle_member("Bob").unwrap();

    // Build up penalty state for Bob.
    ledger.record_chore("Alice", "75").unwrap();
    ledger.record_chore("Bob", "0").unwrap();
    ledger.check_penalties(PenaltyPolicy::Immediate).unwrap();
    ledger.check_penalties(PenaltyPolicy::TwoPhase).unwrap();
    let doc = ledger.document().unwrap();
    assert!(doc.penalties.contains_key("Bob"));
    assert!(doc.last_week_violators.contains_key("bob"));

    assert_eq!(
        ledger.toggle_member("BOB").unwrap(),
        ToggleAction::Removed("Bob".to_string())
    );
    assert_eq!(
        ledger.toggle_member("bob").unwrap(),
        ToggleAction::Added("bob".to_string())
    );

    let doc = ledger.document().unwrap();
    assert_eq!(doc.members, vec!["Alice".to_string(), "bob".to_string()]);
    assert!(!doc.penalties.contains_key("Bob"));
    assert!(!doc.last_week_violators.contains_key("bob"));
}

#[test]
fn toggling_an_account_twice_drops_its_balance_bucket() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    ledger
        .record_transaction(simple_draft("groceries", "12.30", "cash"))
        .unwrap();
    assert!(ledger.document().unwrap().balances.contains_key("Cash"));

    ledger.toggle_account("CASH").unwrap();
    let doc = ledger.document().unwrap();
    assert!(doc.accounts.is_empty());
    assert!(doc.balances.is_empty());

    ledger.toggle_account("Cash").unwrap();
    let doc = ledger.document().unwrap();
    assert_eq!(doc.accounts, vec!["Cash".to_string()]);
    // Re-adding starts from an empty bucket; the log still holds the entry.
    assert!(doc.balances["Cash"].settled.is_empty());
    assert_eq!(doc.transactions.len(), 1);
}

#[test]
fn transaction_requires_an_account_roster() {
    let ledger = ledger();
    assert_eq!(
        ledger
            .record_transaction(simple_draft("groceries", "5", "Cash"))
            .unwrap_err(),
        LedgerError::NoAccounts
    );
}

#[test]
fn transaction_amount_accepts_comma_separator() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    let tx = ledger
        .record_transaction(simple_draft("snack", "3,40", "Cash"))
        .unwrap();
    assert_eq!(tx.amount_sent, Money::new(340));

    assert!(matches!(
        ledger
            .record_transaction(simple_draft("snack", "3,4,0", "Cash"))
            .unwrap_err(),
        LedgerError::InvalidAmount(_)
    ));
}

#[test]
fn simple_kind_commits_with_forced_fields() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();

    // "Savings" is not an account; for a simple kind the destination is
    // forced away before resolution, so the entry still commits.
    let mut draft = simple_draft("rent", "800", "Cash");
    draft.to = "Savings".to_string();
    draft.amount_received = "800".to_string();
    draft.currency_received = "EUR".to_string();
    draft.status = TransactionStatus::Pending;

    let tx = ledger.record_transaction(draft).unwrap();
    assert_eq!(tx.to, "");
    assert_eq!(tx.amount_received, Money::ZERO);
    assert_eq!(tx.status, TransactionStatus::Closed);

    let doc = ledger.document().unwrap();
    assert_eq!(
        doc.balances["Cash"].settled.get("EUR"),
        Some(&Money::new(-80_000))
    );
    assert_eq!(doc.balances.len(), 1);
}

#[test]
fn pending_status_never_touches_the_settled_bucket() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    ledger.toggle_account("Bank").unwrap();

    let mut draft = simple_draft("transfer", "100", "Cash");
    draft.to = "bank".to_string();
    draft.amount_received = "110".to_string();
    draft.currency_received = "USD".to_string();
    draft.status = TransactionStatus::Pending;
    ledger.record_transaction(draft).unwrap();

    let doc = ledger.document().unwrap();
    let cash = &doc.balances["Cash"];
    assert_eq!(cash.pending.get("EUR"), Some(&Money::new(-10_000)));
    assert!(cash.settled.is_empty());
    let bank = &doc.balances["Bank"];
    assert_eq!(bank.pending.get("USD"), Some(&Money::new(11_000)));
    assert!(bank.settled.is_empty());

    // And the other way around.
    let mut draft = simple_draft("transfer", "50", "Cash");
    draft.to = "Bank".to_string();
    draft.amount_received = "50".to_string();
    draft.currency_received = "EUR".to_string();
    ledger.record_transaction(draft).unwrap();

    let doc = ledger.document().unwrap();
    let cash = &doc.balances["Cash"];
    assert_eq!(cash.settled.get("EUR"), Some(&Money::new(-5_000)));
    assert_eq!(cash.pending.get("EUR"), Some(&Money::new(-10_000)));
}

#[test]
fn spending_categories_aggregate_per_currency() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();

    ledger
        .record_transaction(simple_draft("groceries", "12.30", "Cash"))
        .unwrap();
    ledger
        .record_transaction(simple_draft("groceries", "7.70", "Cash"))
        .unwrap();
    let mut usd = simple_draft("groceries", "4", "Cash");
    usd.currency_sent = "USD".to_string();
    ledger.record_transaction(usd).unwrap();

    // "transfer" is configured but not a spending category.
    let mut transfer = simple_draft("transfer", "100", "Cash");
    transfer.to = "Cash".to_string();
    ledger.record_transaction(transfer).unwrap();

    let doc = ledger.document().unwrap();
    let groceries = &doc.spending["groceries"];
    assert_eq!(groceries.transactions.len(), 3);
    assert_eq!(groceries.total.get("EUR"), Some(&Money::new(2000)));
    assert_eq!(groceries.total.get("USD"), Some(&Money::new(400)));
    assert!(!doc.spending.contains_key("transfer"));
}

#[test]
fn unknown_kind_is_rejected_before_any_side_effect() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    assert_eq!(
        ledger
            .record_transaction(simple_draft("bribes", "5", "Cash"))
            .unwrap_err(),
        LedgerError::UnknownKind("bribes".to_string())
    );
    let doc = ledger.document().unwrap();
    assert!(doc.transactions.is_empty());
    assert!(doc.balances["Cash"].settled.is_empty());
}

#[test]
fn two_phase_penalty_scenario() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    ledger.toggle_member("Bob").unwrap();
    ledger.record_chore("Alice", "75").unwrap(); // 5 points
    ledger.record_chore("Bob", "0").unwrap(); // on the board with 0

    // First run: Bob is flagged at-risk, no penalty.
    let report = ledger.check_penalties(PenaltyPolicy::TwoPhase).unwrap();
    let LagReport::Standings { leader, changes } = report else {
        panic!("expected standings");
    };
    assert_eq!(leader.name, "Alice");
    assert_eq!(
        changes,
        vec![LagChange::AtRisk {
            member: "Bob".to_string(),
            gap: 5,
            leader: "Alice".to_string(),
        }]
    );
    assert!(ledger.document().unwrap().penalties.is_empty());

    // Second consecutive run with the same gap: penalty counter moves.
    let report = ledger.check_penalties(PenaltyPolicy::TwoPhase).unwrap();
    let LagReport::Standings { changes, .. } = report else {
        panic!("expected standings");
    };
    assert_eq!(
        changes,
        vec![LagChange::Penalized {
            member: "Bob".to_string(),
            weeks_owed: 1,
        }]
    );

    // Third run with Bob raised to 4 points (gap = 1): flag clears,
    // improvement reported, counter untouched.
    ledger.record_chore("Bob", "60").unwrap();
    let report = ledger.check_penalties(PenaltyPolicy::TwoPhase).unwrap();
    let LagReport::Standings { changes, .. } = report else {
        panic!("expected standings");
    };
    assert_eq!(
        changes,
        vec![LagChange::Improved {
            member: "Bob".to_string(),
        }]
    );
    let doc = ledger.document().unwrap();
    assert_eq!(doc.penalties.get("Bob"), Some(&1));
    assert!(doc.last_week_violators.is_empty());
}

#[test]
fn immediate_policy_escalates_on_every_run() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    ledger.toggle_member("Bob").unwrap();
    ledger.record_chore("Alice", "90").unwrap(); // 6 points
    ledger.record_chore("Bob", "0").unwrap();

    ledger.check_penalties(PenaltyPolicy::Immediate).unwrap();
    ledger.check_penalties(PenaltyPolicy::Immediate).unwrap();
    assert_eq!(ledger.document().unwrap().penalties.get("Bob"), Some(&2));
}

#[test]
fn empty_state_formatting() {
    let ledger = ledger();
    assert!(
        ledger
            .standings_text()
            .unwrap()
            .ends_with(report::MSG_NO_MEMBERS)
    );
    assert_eq!(
        ledger.transactions_text().unwrap(),
        report::MSG_NO_TRANSACTIONS
    );
}

#[test]
fn report_output_is_byte_identical_on_unchanged_state() {
    let ledger = ledger();
    ledger.toggle_member("Alice").unwrap();
    ledger.toggle_account("Cash").unwrap();
    ledger.record_chore("Alice", "45").unwrap();
    ledger
        .record_transaction(simple_draft("leisure", "9.99", "Cash"))
        .unwrap();

    assert_eq!(
        ledger.standings_text().unwrap(),
        ledger.standings_text().unwrap()
    );
    assert_eq!(
        ledger.transactions_text().unwrap(),
        ledger.transactions_text().unwrap()
    );
    assert_eq!(ledger.report_text().unwrap(), ledger.report_text().unwrap());
}

#[test]
fn transactions_listing_shows_newest_first_up_to_the_limit() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    for n in 1..=20 {
        ledger
            .record_transaction(simple_draft("snack", &n.to_string(), "Cash"))
            .unwrap();
    }

    let text = ledger.transactions_text().unwrap();
    assert!(text.contains("| 20.00 |"));
    assert!(text.contains("| 6.00 |"));
    // Default list limit is 15; entry 5 fell off.
    assert!(!text.contains("| 5.00 |"));
    let first = text.find("| 20.00 |").unwrap();
    let second = text.find("| 19.00 |").unwrap();
    assert!(first < second);
}

#[test]
fn recompute_balances_repairs_drifted_running_totals() {
    let store = MemoryStore::default();
    let ledger = Ledger::new(store, EngineConfig::default()).unwrap();
    ledger.toggle_account("Cash").unwrap();
    ledger.toggle_account("Bank").unwrap();
    ledger
        .record_transaction(simple_draft("groceries", "25", "Cash"))
        .unwrap();
    let mut transfer = simple_draft("transfer", "100", "Cash");
    transfer.to = "Bank".to_string();
    transfer.amount_received = "100".to_string();
    transfer.currency_received = "EUR".to_string();
    ledger.record_transaction(transfer).unwrap();

    let clean = ledger.document().unwrap();

    // Corrupt the running totals behind the engine's back, the way a buggy
    // second write path would.
    let mut corrupted = clean.clone();
    corrupted
        .balances
        .get_mut("Cash")
        .unwrap()
        .settled
        .insert("EUR".to_string(), Money::new(999));
    corrupted.spending.clear();
    let store = MemoryStore::new(corrupted);
    let ledger = Ledger::new(store, EngineConfig::default()).unwrap();

    ledger.recompute_balances().unwrap();
    let repaired = ledger.document().unwrap();
    assert_eq!(repaired.balances, clean.balances);
    assert_eq!(repaired.spending, clean.spending);
}

#[test]
fn file_store_self_heals_through_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, "definitely not json").unwrap();

    let ledger = Ledger::new(JsonFileStore::new(&path), EngineConfig::default()).unwrap();
    assert!(ledger.members().unwrap().is_empty());

    ledger.toggle_member("Alice").unwrap();
    drop(ledger);

    // A fresh engine over the same file sees the committed state.
    let ledger = Ledger::new(JsonFileStore::new(&path), EngineConfig::default()).unwrap();
    assert_eq!(ledger.members().unwrap(), vec!["Alice".to_string()]);
}

#[test]
fn erase_all_is_the_only_balance_reset() {
    let ledger = ledger();
    ledger.toggle_account("Cash").unwrap();
    ledger
        .record_transaction(simple_draft("rent", "500", "Cash"))
        .unwrap();
    ledger.register_report_chat(-100123).unwrap();

    ledger.erase_all().unwrap();
    let doc = ledger.document().unwrap();
    assert!(doc.accounts.is_empty());
    assert!(doc.balances.is_empty());
    assert!(doc.transactions.is_empty());
    assert_eq!(doc.report_chat_id, None);
}
