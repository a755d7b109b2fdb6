//! Read-only derivations over the ledger document: member balances, chore
//! standings, lag detection and the full-replay balance recompute.
//!
//! Nothing here mutates the document; the ledger engine applies the maps a
//! detector returns and persists them.

use std::collections::{BTreeMap, HashMap};

use crate::{AccountBalance, EngineConfig, LedgerDocument, Money, Roster};

/// A lagging member escalates once the leader is ahead by strictly more than
/// this many points.
pub const PENALTY_GAP: i64 = 4;

/// How lag escalates into penalties.
///
/// Both policies ship on purpose: the on-demand command penalizes on every
/// run, the scheduled weekly report grants a one-week grace period. They are
/// independent code paths, not a behavior to unify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenaltyPolicy {
    /// Every run while lagging increments the penalty counter.
    Immediate,
    /// First offense flags the member as at-risk; the counter only moves if
    /// they are still lagging on the next check while flagged. Closing the
    /// gap clears the flag.
    TwoPhase,
}

/// A member with their cumulative chore points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedMember {
    pub name: String,
    pub points: i64,
}

/// One member's status change produced by a lag check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LagChange {
    Penalized { member: String, weeks_owed: u32 },
    AtRisk { member: String, gap: i64, leader: String },
    Improved { member: String },
}

/// Outcome of a lag check, handed to the transport for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LagReport {
    /// No members or no chores recorded yet.
    NotEnoughData,
    Standings {
        leader: RankedMember,
        changes: Vec<LagChange>,
    },
}

/// Penalty counters and lag flags as they should be persisted after a check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LagUpdates {
    pub penalties: BTreeMap<String, u32>,
    pub flags: BTreeMap<String, bool>,
}

/// Derives the financial balance of every member from the expense log.
///
/// Balance = sum of amounts the member paid, minus an equal share of every
/// expense they appear in. Payer and split names were stored as typed, so
/// they are matched case-insensitively against the roster; names that no
/// longer resolve are skipped.
pub fn member_balances(doc: &LedgerDocument) -> HashMap<String, Money> {
    let roster = Roster::from_names(&doc.members);
    let mut balances: HashMap<String, Money> = doc
        .members
        .iter()
        .map(|m| (m.clone(), Money::ZERO))
        .collect();

    for expense in &doc.expenses {
        let share = expense.amount.split_share(expense.split_with.len());

        if let Some(payer) = roster.resolve(&expense.payer)
            && let Some(balance) = balances.get_mut(payer)
        {
            *balance += expense.amount;
        }

        for user in &expense.split_with {
            if let Some(member) = roster.resolve(user)
                && let Some(balance) = balances.get_mut(member)
            {
                *balance -= share;
            }
        }
    }

    balances
}

/// Chore points per roster member, matched case-insensitively against the
/// chore table.
fn normalized_points(doc: &LedgerDocument) -> Vec<RankedMember> {
    let mut by_lowercase: HashMap<String, i64> = HashMap::with_capacity(doc.chores.len());
    for (name, points) in &doc.chores {
        by_lowercase.entry(name.to_lowercase()).or_insert(*points);
    }

    doc.members
        .iter()
        .map(|member| RankedMember {
            name: member.clone(),
            points: by_lowercase
                .get(&member.to_lowercase())
                .copied()
                .unwrap_or(0),
        })
        .collect()
}

/// Roster members sorted by chore points descending.
///
/// The sort is stable: members are ranked even with zero points, and ties
/// keep roster encounter order.
pub fn chore_standings(doc: &LedgerDocument) -> Vec<RankedMember> {
    let mut standings = normalized_points(doc);
    standings.sort_by_key(|m| std::cmp::Reverse(m.points));
    standings
}

/// Runs a lag check against the current standings.
///
/// Pure: returns the report plus the penalty/flag maps to persist. Flags are
/// keyed by lowercase member name and are only touched by the two-phase
/// policy.
pub fn detect_lag(doc: &LedgerDocument, policy: PenaltyPolicy) -> (LagReport, LagUpdates) {
    let updates = LagUpdates {
        penalties: doc.penalties.clone(),
        flags: doc.last_week_violators.clone(),
    };

    if doc.members.is_empty() || doc.chores.is_empty() {
        return (LagReport::NotEnoughData, updates);
    }

    let standings = chore_standings(doc);
    let mut updates = updates;
    let Some((leader, rest)) = standings.split_first() else {
        return (LagReport::NotEnoughData, updates);
    };

    let mut changes = Vec::new();
    for member in rest {
        let gap = leader.points - member.points;
        let flag_key = member.name.to_lowercase();

        if gap > PENALTY_GAP {
            match policy {
                PenaltyPolicy::Immediate => {
                    let weeks = updates.penalties.entry(member.name.clone()).or_insert(0);
                    *weeks += 1;
                    changes.push(LagChange::Penalized {
                        member: member.name.clone(),
                        weeks_owed: *weeks,
                    });
                }
                PenaltyPolicy::TwoPhase => {
                    if updates.flags.get(&flag_key).copied().unwrap_or(false) {
                        let weeks = updates.penalties.entry(member.name.clone()).or_insert(0);
                        *weeks += 1;
                        changes.push(LagChange::Penalized {
                            member: member.name.clone(),
                            weeks_owed: *weeks,
                        });
                    } else {
                        updates.flags.insert(flag_key, true);
                        changes.push(LagChange::AtRisk {
                            member: member.name.clone(),
                            gap,
                            leader: leader.name.clone(),
                        });
                    }
                }
            }
        } else if policy == PenaltyPolicy::TwoPhase && updates.flags.remove(&flag_key).is_some() {
            changes.push(LagChange::Improved {
                member: member.name.clone(),
            });
        }
    }

    (
        LagReport::Standings {
            leader: leader.clone(),
            changes,
        },
        updates,
    )
}

/// Recomputes the running balance table and category aggregates by replaying
/// the full transaction log.
///
/// The running totals are never reconciled on the normal write path; this is
/// the explicit recovery operation for drift (or for tests). Accounts no
/// longer on the roster stay deleted: their transactions are skipped, the
/// same way balance derivation skips unresolvable member names.
pub fn replay_balances(doc: &mut LedgerDocument, config: &EngineConfig) {
    let roster = Roster::from_names(&doc.accounts);

    // Accounts that never transacted keep an empty bucket, matching the one
    // created when an account is added.
    doc.balances = doc
        .accounts
        .iter()
        .map(|a| (a.clone(), AccountBalance::default()))
        .collect();
    doc.spending = BTreeMap::new();

    let transactions = doc.transactions.clone();
    for tx in &transactions {
        if roster.resolve(&tx.from).is_none() {
            continue;
        }
        if !tx.to.is_empty() && roster.resolve(&tx.to).is_none() {
            continue;
        }
        doc.apply_balance_effects(tx);
        doc.apply_spending_effects(tx, config);
    }
}
