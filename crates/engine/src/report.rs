//! Renders ledger state and calculator outputs into user-facing text.
//!
//! Everything here is a pure function of its arguments: rendering the same
//! state twice produces byte-identical output, and empty states get their
//! own textual branch instead of an omitted section.

use chrono::NaiveDate;

use crate::{
    LedgerDocument, Money, Roster,
    standings::{self, LagChange, LagReport},
};

pub const MSG_NO_MEMBERS: &str = "No members recorded yet.";
pub const MSG_NO_CHORES: &str = "No chores recorded yet.";
pub const MSG_NO_ACCOUNTS: &str = "No accounts recorded yet.";
pub const MSG_NO_SPENDING: &str = "No spending recorded yet.";
pub const MSG_NO_TRANSACTIONS: &str = "No transactions found.";
pub const MSG_NO_PENALTIES: &str = "No penalties this week!";
pub const MSG_NOT_ENOUGH_DATA: &str = "Weekly Report: Not enough data to calculate penalties. \
     Make sure members are added and chores are recorded.";

const HEADER_TRANSACTIONS: &str = "📄 Your Recent Transactions:";
const HEADER_ACCOUNTS: &str = "💳 Account Summary";
const HEADER_SPENDING: &str = "📊 Spending by Category";
const TABLE_HEADER: &str = "| Date | Type | Amount | Curr | From | Details |";
const TABLE_SEPARATOR: &str = "|---|---|---|---|---|---|";

/// Chore standings plus derived financial balance, one line per member,
/// sorted by points descending.
pub fn standings_text(doc: &LedgerDocument) -> String {
    let balances = standings::member_balances(doc);
    let mut text = String::from("Chore Standings + Financial Balance:\n");

    for member in standings::chore_standings(doc) {
        let balance = balances
            .get(&member.name)
            .copied()
            .unwrap_or(Money::ZERO);
        text.push_str(&format!(
            "{}: {} points (Balance: {}€)\n",
            member.name,
            member.points,
            balance.signed()
        ));
    }

    if doc.members.is_empty() {
        text.push_str(MSG_NO_MEMBERS);
    } else if !has_ranked_chores(doc) {
        text.push_str(MSG_NO_CHORES);
    }

    text
}

/// `true` when at least one chore entry resolves to a roster member.
fn has_ranked_chores(doc: &LedgerDocument) -> bool {
    let roster = Roster::from_names(&doc.members);
    doc.chores.keys().any(|name| roster.contains(name))
}

/// The most recent `limit` transactions, newest first, as a markdown table.
pub fn transactions_text(doc: &LedgerDocument, limit: usize) -> String {
    if doc.transactions.is_empty() {
        return MSG_NO_TRANSACTIONS.to_string();
    }

    let mut lines = vec![
        format!("{HEADER_TRANSACTIONS}\n"),
        format!("```{TABLE_HEADER}"),
        TABLE_SEPARATOR.to_string(),
    ];
    for tx in doc.transactions.iter().rev().take(limit) {
        let details: String = tx.info.chars().take(10).collect();
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            tx.date, tx.kind, tx.amount_sent, tx.currency_sent, tx.from, details
        ));
    }
    lines.push("```".to_string());
    lines.join("\n")
}

/// Account balances and spending-category totals.
pub fn report_text(doc: &LedgerDocument) -> String {
    let mut text = format!("**{HEADER_ACCOUNTS}**\n");

    if doc.balances.is_empty() {
        text.push_str(&format!(" - {MSG_NO_ACCOUNTS}\n"));
    }
    for (account, balance) in &doc.balances {
        let settled = join_totals(&balance.settled);
        text.push_str(&format!(" - **{account}**: {settled}"));
        if !balance.pending.is_empty() {
            text.push_str(&format!(" (pending: {})", join_totals(&balance.pending)));
        }
        text.push('\n');
    }

    text.push_str(&format!("\n**{HEADER_SPENDING}**\n"));
    if doc.spending.is_empty() {
        text.push_str(&format!(" - {MSG_NO_SPENDING}\n"));
    }
    for (category, aggregate) in &doc.spending {
        text.push_str(&format!(
            " - **{}**: {}\n",
            capitalize(category),
            join_totals(&aggregate.total)
        ));
    }

    text
}

fn join_totals(totals: &std::collections::BTreeMap<String, Money>) -> String {
    if totals.is_empty() {
        return "0.00".to_string();
    }
    totals
        .iter()
        .map(|(currency, amount)| format!("{amount} {currency}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// On-demand penalty check output (immediate policy path).
pub fn penalties_text(report: &LagReport) -> String {
    match report {
        LagReport::NotEnoughData => MSG_NO_CHORES.to_string(),
        LagReport::Standings { changes, .. } => {
            let lines: Vec<String> = changes
                .iter()
                .filter_map(|change| match change {
                    LagChange::Penalized { member, weeks_owed } => {
                        Some(format!("{member} owes {weeks_owed} beers!"))
                    }
                    _ => None,
                })
                .collect();
            if lines.is_empty() {
                MSG_NO_PENALTIES.to_string()
            } else {
                format!("Beer Penalties:\n{}", lines.join("\n"))
            }
        }
    }
}

/// Scheduled weekly report (two-phase policy path). The date is an argument
/// so rendering stays deterministic.
pub fn weekly_report_text(report: &LagReport, date: NaiveDate) -> String {
    let LagReport::Standings { leader, changes } = report else {
        return MSG_NOT_ENOUGH_DATA.to_string();
    };

    let mut text = format!(
        "📊 Weekly Chore Report ({date}):\n\n👑 Leader: {} with {} points\n\n",
        leader.name, leader.points
    );

    if changes.is_empty() {
        text.push_str("Everyone is keeping up with their chores! No penalties this week. 🎉");
        return text;
    }

    let lines: Vec<String> = changes
        .iter()
        .map(|change| match change {
            LagChange::Penalized { member, weeks_owed } => {
                format!("{member} owes {weeks_owed} beers! 🍺")
            }
            LagChange::AtRisk {
                member,
                gap,
                leader,
            } => format!(
                "{member} is lagging by {gap} points behind {leader}. \
                 If not improved by next week, beer penalty will apply! ⚠️"
            ),
            LagChange::Improved { member } => {
                format!("{member} has improved their standing! No beer penalty this week. 👍")
            }
        })
        .collect();

    text.push_str("Penalties:\n");
    text.push_str(&lines.join("\n"));
    text
}
