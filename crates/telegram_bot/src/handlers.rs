//! Message and callback routing: maps guided dialogs onto engine calls.
//!
//! The transport owns no ledger state. Every dialog stages its input in the
//! per-chat session and hands the engine one complete entry at the final
//! step; engine errors become user-facing text and a re-prompt.

use engine::{LedgerError, Money, PenaltyPolicy, ToggleAction, TransactionDraft, report};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatId, ParseMode, User},
};

use crate::{ConfigParameters, state::Dialog, ui};

const MSG_BOT_ACTIVE: &str = "Household Bot is active! Use the buttons below:";
const MSG_CANCELLED: &str = "Operation cancelled. Returning to the main menu.";
const MSG_SESSION_TIMEOUT: &str = "Session timed out. Returning to the main menu.";
const MSG_NO_MEMBERS: &str = "No members found. Please add members first.";
const MSG_INVALID_AMOUNT: &str = "That's not a valid amount. Please enter a number (e.g., 10.50).";
const MSG_INVALID_MINUTES: &str = "Invalid input. Enter the minutes again.";
const MSG_ENTER_AMOUNT: &str = "Enter the amount:";
const MSG_WHO_PAID: &str = "Who paid?";
const MSG_WHO_SPLITS: &str =
    "Who should split the expense? Select names and press 'Done' when finished:";
const MSG_SPLIT_NEEDS_ONE: &str = "You must select at least one person to split with.";
const MSG_WHO_DID_CHORE: &str = "Who completed the chore?";
const MSG_HOW_MANY_MINUTES: &str = "How many minutes did it take?";
const MSG_SELECT_TYPE: &str = "What kind of transaction is this?";
const MSG_ENTER_AMOUNT_SENT: &str = "How much did you spend?";
const MSG_SELECT_CURRENCY: &str = "Select the currency:";
const MSG_SELECT_FROM_ACCOUNT: &str = "Which account did you use?";
const MSG_ADD_INFO_QUESTION: &str = "Do you want to add a note?";
const MSG_ENTER_INFO: &str = "Enter the details now:";
const MSG_NO_ACCOUNTS: &str = "You don't have any accounts yet.";
const MSG_USE_MANAGE_ACCOUNTS: &str =
    "Please set up an account first using the 'Manage Accounts' button.";
const MSG_ACCOUNTS_CLOSED: &str = "Account management closed.";
const MSG_OPERATION_FAILED: &str = "Something went wrong. Returning to the main menu.";
const MSG_STORAGE_FAILED: &str = "Storage failure, nothing was saved. Please try again.";

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg, msg.from.as_ref()) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let text = text.trim().to_string();
    let chat_id = msg.chat.id;

    // Per-session timeout: expired staged input is discarded without ever
    // reaching the engine.
    let session = cfg.sessions.get(chat_id).await;
    let mut dialog = session.dialog;
    if dialog != Dialog::Idle && session.last_activity.elapsed() > cfg.timeout {
        dialog = Dialog::Idle;
        cfg.sessions.reset(chat_id).await;
        send_main(&bot, chat_id, MSG_SESSION_TIMEOUT).await?;
    }

    if text == "/start" {
        cfg.sessions.reset(chat_id).await;
        send_main(&bot, chat_id, MSG_BOT_ACTIVE).await?;
        return Ok(());
    }
    if text == "/cancel" || text == ui::BTN_CANCEL {
        cfg.sessions.reset(chat_id).await;
        send_main(&bot, chat_id, MSG_CANCELLED).await?;
        return Ok(());
    }

    match dialog {
        Dialog::Idle => handle_menu(&bot, &msg, &cfg, &text).await,
        Dialog::ExpenseAmount => expense_amount(&bot, chat_id, &cfg, &text).await,
        Dialog::ExpensePayer { amount } => expense_payer(&bot, chat_id, &cfg, amount, text).await,
        Dialog::ExpenseSplit {
            amount,
            payer,
            split_with,
        } => expense_split(&bot, chat_id, &cfg, amount, payer, split_with, text).await,
        Dialog::ChoreMember => {
            cfg.sessions
                .set(chat_id, Dialog::ChoreMinutes { member: text })
                .await;
            bot.send_message(chat_id, MSG_HOW_MANY_MINUTES)
                .reply_markup(ui::remove_keyboard())
                .await?;
            Ok(())
        }
        Dialog::ChoreMinutes { member } => chore_minutes(&bot, chat_id, &cfg, member, &text).await,
        Dialog::ManageMembers => manage_members(&bot, chat_id, &cfg, &text).await,
        Dialog::ManageAccounts => manage_accounts(&bot, chat_id, &cfg, &text).await,
        Dialog::TransactionInfo {
            kind,
            amount,
            currency,
            from,
        } => finalize_transaction(&bot, chat_id, &cfg, kind, amount, currency, from, text).await,
        Dialog::TransactionAmount { kind } => {
            transaction_amount(&bot, chat_id, &cfg, kind, text).await
        }
        // Waiting for an inline button; free text is ignored here.
        Dialog::TransactionKind | Dialog::TransactionCurrency { .. }
        | Dialog::TransactionFrom { .. } => Ok(()),
    }
}

async fn handle_menu(
    bot: &Bot,
    msg: &Message,
    cfg: &ConfigParameters,
    text: &str,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    match text {
        ui::BTN_ADD_EXPENSE => {
            cfg.sessions.set(chat_id, Dialog::ExpenseAmount).await;
            bot.send_message(chat_id, MSG_ENTER_AMOUNT)
                .reply_markup(ui::remove_keyboard())
                .await?;
        }
        ui::BTN_ADD_CHORE => {
            let members = { cfg.ledger.lock().await.members() };
            match members {
                Ok(members) => match ui::member_keyboard(&members) {
                    Some(keyboard) => {
                        cfg.sessions.set(chat_id, Dialog::ChoreMember).await;
                        bot.send_message(chat_id, MSG_WHO_DID_CHORE)
                            .reply_markup(keyboard)
                            .await?;
                    }
                    None => send_main(bot, chat_id, MSG_NO_MEMBERS).await?,
                },
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_ADD_TRANSACTION => {
            let kinds: Vec<String> = {
                let ledger = cfg.ledger.lock().await;
                ledger
                    .config()
                    .transaction_kinds
                    .iter()
                    .map(|k| k.name.clone())
                    .collect()
            };
            cfg.sessions.set(chat_id, Dialog::TransactionKind).await;
            bot.send_message(chat_id, MSG_SELECT_TYPE)
                .reply_markup(ui::inline_options(ui::CB_TYPE_PREFIX, &kinds))
                .await?;
        }
        ui::BTN_STANDINGS => {
            let standings = { cfg.ledger.lock().await.standings_text() };
            match standings {
                Ok(standings) => {
                    bot.send_message(chat_id, standings).await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_BEER_OWED => {
            let outcome = {
                cfg.ledger
                    .lock()
                    .await
                    .check_penalties(PenaltyPolicy::Immediate)
            };
            match outcome {
                Ok(outcome) => {
                    bot.send_message(chat_id, report::penalties_text(&outcome))
                        .await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_LIST_TRANSACTIONS => {
            let listing = { cfg.ledger.lock().await.transactions_text() };
            match listing {
                Ok(listing) => {
                    bot.send_message(chat_id, listing)
                        .parse_mode(ParseMode::Markdown)
                        .await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_GENERATE_REPORT => {
            let summary = { cfg.ledger.lock().await.report_text() };
            match summary {
                Ok(summary) => {
                    bot.send_message(chat_id, summary)
                        .parse_mode(ParseMode::Markdown)
                        .reply_markup(ui::main_keyboard())
                        .await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_MANAGE_MEMBERS => {
            let members = { cfg.ledger.lock().await.members() };
            match members {
                Ok(members) => {
                    let prompt = if members.is_empty() {
                        "No members yet. Enter the name of a member to add:".to_string()
                    } else {
                        format!(
                            "Current members: {}\n\nEnter the name of the member to add or remove:",
                            members.join(", ")
                        )
                    };
                    cfg.sessions.set(chat_id, Dialog::ManageMembers).await;
                    bot.send_message(chat_id, prompt)
                        .reply_markup(ui::remove_keyboard())
                        .await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_MANAGE_ACCOUNTS => {
            let accounts = { cfg.ledger.lock().await.accounts() };
            match accounts {
                Ok(accounts) => {
                    let prompt = if accounts.is_empty() {
                        "You have no accounts. Enter a name to create one.".to_string()
                    } else {
                        format!(
                            "Your accounts: {}\n\nEnter a new name to add an account, \
                             or an existing name to remove it.",
                            accounts.join(", ")
                        )
                    };
                    cfg.sessions.set(chat_id, Dialog::ManageAccounts).await;
                    bot.send_message(chat_id, prompt)
                        .reply_markup(ui::back_keyboard())
                        .await?;
                }
                Err(err) => notify_error(bot, chat_id, &err).await?,
            }
        }
        ui::BTN_SET_WEEKLY_REPORT => set_weekly_report(bot, msg, cfg).await?,
        _ => {}
    }
    Ok(())
}

async fn set_weekly_report(bot: &Bot, msg: &Message, cfg: &ConfigParameters) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    if msg.chat.is_group() || msg.chat.is_supergroup() {
        let result = { cfg.ledger.lock().await.register_report_chat(chat_id.0) };
        match result {
            Ok(()) => {
                send_main(
                    bot,
                    chat_id,
                    "Weekly reports will be sent to this group every Monday!",
                )
                .await?;
            }
            Err(err) => notify_error(bot, chat_id, &err).await?,
        }
        return Ok(());
    }

    let registered = { cfg.ledger.lock().await.report_chat() };
    let reply = match registered {
        Ok(Some(_)) => {
            "Weekly reports are set to be sent to a group chat. \
             To change the group, use this command in the new group chat."
        }
        Ok(None) => "Please use this command in the group chat where you want the weekly reports to be sent.",
        Err(err) => return notify_error(bot, chat_id, &err).await,
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

async fn expense_amount(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    text: &str,
) -> ResponseResult<()> {
    if text.parse::<Money>().is_err() {
        bot.send_message(chat_id, MSG_INVALID_AMOUNT).await?;
        return Ok(());
    }

    let members = { cfg.ledger.lock().await.members() };
    match members {
        Ok(members) => match ui::member_keyboard(&members) {
            Some(keyboard) => {
                cfg.sessions
                    .set(
                        chat_id,
                        Dialog::ExpensePayer {
                            amount: text.to_string(),
                        },
                    )
                    .await;
                bot.send_message(chat_id, MSG_WHO_PAID)
                    .reply_markup(keyboard)
                    .await?;
            }
            None => {
                cfg.sessions.reset(chat_id).await;
                send_main(bot, chat_id, MSG_NO_MEMBERS).await?;
            }
        },
        Err(err) => notify_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

async fn expense_payer(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    amount: String,
    payer: String,
) -> ResponseResult<()> {
    let members = { cfg.ledger.lock().await.members() };
    match members {
        Ok(members) => match ui::member_keyboard(&members) {
            Some(keyboard) => {
                cfg.sessions
                    .set(
                        chat_id,
                        Dialog::ExpenseSplit {
                            amount,
                            payer,
                            split_with: Vec::new(),
                        },
                    )
                    .await;
                bot.send_message(chat_id, MSG_WHO_SPLITS)
                    .reply_markup(keyboard)
                    .await?;
            }
            None => {
                cfg.sessions.reset(chat_id).await;
                send_main(bot, chat_id, MSG_NO_MEMBERS).await?;
            }
        },
        Err(err) => notify_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn expense_split(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    amount: String,
    payer: String,
    mut split_with: Vec<String>,
    text: String,
) -> ResponseResult<()> {
    if text.eq_ignore_ascii_case(ui::BTN_DONE) {
        if split_with.is_empty() {
            bot.send_message(chat_id, MSG_SPLIT_NEEDS_ONE).await?;
            return Ok(());
        }

        let result = {
            cfg.ledger
                .lock()
                .await
                .record_expense(&amount, &payer, &split_with)
        };
        cfg.sessions.reset(chat_id).await;
        match result {
            Ok(expense) => {
                send_main(
                    bot,
                    chat_id,
                    &format!(
                        "Expense of {} added by {} shared with {}",
                        expense.amount,
                        expense.payer,
                        expense.split_with.join(", ")
                    ),
                )
                .await?;
            }
            Err(err) => notify_error(bot, chat_id, &err).await?,
        }
        return Ok(());
    }

    let members = { cfg.ledger.lock().await.members() };
    let members = match members {
        Ok(members) => members,
        Err(err) => return notify_error(bot, chat_id, &err).await,
    };

    // Names arrive from the member keyboard, so they are compared exactly as
    // stored.
    if !members.contains(&text) {
        bot.send_message(
            chat_id,
            format!("'{text}' is not a valid member. Please select from the keyboard."),
        )
        .await?;
    } else if split_with.contains(&text) {
        bot.send_message(
            chat_id,
            format!("'{text}' has already been added to split list."),
        )
        .await?;
    } else {
        split_with.push(text.clone());
        cfg.sessions
            .set(
                chat_id,
                Dialog::ExpenseSplit {
                    amount,
                    payer,
                    split_with,
                },
            )
            .await;
        bot.send_message(
            chat_id,
            format!("{text} added. Select more or press 'Done' when finished."),
        )
        .await?;
    }
    Ok(())
}

async fn chore_minutes(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    member: String,
    text: &str,
) -> ResponseResult<()> {
    let result = { cfg.ledger.lock().await.record_chore(&member, text) };
    match result {
        Ok(credit) => {
            cfg.sessions.reset(chat_id).await;
            send_main(
                bot,
                chat_id,
                &format!("{} earned {} points!", credit.member, credit.points),
            )
            .await?;
        }
        // Invalid minutes re-prompt without losing the staged member.
        Err(LedgerError::InvalidDuration(_)) => {
            cfg.sessions
                .set(chat_id, Dialog::ChoreMinutes { member })
                .await;
            bot.send_message(chat_id, MSG_INVALID_MINUTES).await?;
        }
        Err(err) => {
            cfg.sessions.reset(chat_id).await;
            notify_error(bot, chat_id, &err).await?;
        }
    }
    Ok(())
}

async fn manage_members(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    text: &str,
) -> ResponseResult<()> {
    let result = { cfg.ledger.lock().await.toggle_member(text) };
    cfg.sessions.reset(chat_id).await;
    match result {
        Ok(ToggleAction::Added(name)) => {
            send_main(bot, chat_id, &format!("Added {name} to the household.")).await?;
        }
        Ok(ToggleAction::Removed(name)) => {
            send_main(bot, chat_id, &format!("Removed {name} from the household.")).await?;
        }
        Err(err) => notify_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

async fn manage_accounts(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    text: &str,
) -> ResponseResult<()> {
    if text.eq_ignore_ascii_case(ui::BTN_BACK) {
        cfg.sessions.reset(chat_id).await;
        send_main(bot, chat_id, MSG_ACCOUNTS_CLOSED).await?;
        return Ok(());
    }

    let result = { cfg.ledger.lock().await.toggle_account(text) };
    cfg.sessions.reset(chat_id).await;
    match result {
        Ok(ToggleAction::Added(name)) => {
            send_main(bot, chat_id, &format!("Account '{name}' has been added.")).await?;
        }
        Ok(ToggleAction::Removed(name)) => {
            send_main(bot, chat_id, &format!("Account '{name}' has been removed.")).await?;
        }
        Err(err) => notify_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

async fn transaction_amount(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    kind: String,
    text: String,
) -> ResponseResult<()> {
    if text.parse::<Money>().is_err() {
        bot.send_message(chat_id, MSG_INVALID_AMOUNT).await?;
        return Ok(());
    }

    let currencies = { cfg.ledger.lock().await.config().currencies.clone() };
    cfg.sessions
        .set(
            chat_id,
            Dialog::TransactionCurrency { kind, amount: text },
        )
        .await;
    bot.send_message(chat_id, MSG_SELECT_CURRENCY)
        .reply_markup(ui::inline_options(ui::CB_CURRENCY_PREFIX, &currencies))
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn finalize_transaction(
    bot: &Bot,
    chat_id: ChatId,
    cfg: &ConfigParameters,
    kind: String,
    amount: String,
    currency: String,
    from: String,
    info: String,
) -> ResponseResult<()> {
    let draft = TransactionDraft {
        date: chrono::Local::now().date_naive(),
        kind,
        amount_sent: amount,
        currency_sent: currency,
        from,
        info,
        ..TransactionDraft::default()
    };

    let result = { cfg.ledger.lock().await.record_transaction(draft) };
    cfg.sessions.reset(chat_id).await;
    match result {
        Ok(tx) => {
            let notes = if tx.info.is_empty() {
                "N/A"
            } else {
                tx.info.as_str()
            };
            send_main(
                bot,
                chat_id,
                &format!(
                    "✅ Transaction Recorded!\n\nType: {}\nAmount: {} {}\nAccount: {}\nNotes: {}",
                    capitalize(&tx.kind),
                    tx.amount_sent,
                    tx.currency_sent,
                    tx.from,
                    notes
                ),
            )
            .await?;
        }
        Err(err) => notify_error(bot, chat_id, &err).await?,
    }
    Ok(())
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg, Some(&q.from)) {
        return Ok(());
    }

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let session = cfg.sessions.get(chat_id).await;
    if session.dialog != Dialog::Idle && session.last_activity.elapsed() > cfg.timeout {
        cfg.sessions.reset(chat_id).await;
        send_main(&bot, chat_id, MSG_SESSION_TIMEOUT).await?;
        return Ok(());
    }
    let dialog = session.dialog;

    if let Some(kind) = data.strip_prefix(ui::CB_TYPE_PREFIX) {
        if dialog != Dialog::TransactionKind {
            return Ok(());
        }
        cfg.sessions
            .set(
                chat_id,
                Dialog::TransactionAmount {
                    kind: kind.to_string(),
                },
            )
            .await;
        bot.send_message(chat_id, MSG_ENTER_AMOUNT_SENT).await?;
    } else if let Some(currency) = data.strip_prefix(ui::CB_CURRENCY_PREFIX) {
        let Dialog::TransactionCurrency { kind, amount } = dialog else {
            return Ok(());
        };

        let accounts = { cfg.ledger.lock().await.accounts() };
        let accounts = match accounts {
            Ok(accounts) => accounts,
            Err(err) => return notify_error(&bot, chat_id, &err).await,
        };
        if accounts.is_empty() {
            cfg.sessions.reset(chat_id).await;
            bot.send_message(chat_id, MSG_NO_ACCOUNTS).await?;
            send_main(&bot, chat_id, MSG_USE_MANAGE_ACCOUNTS).await?;
            return Ok(());
        }

        cfg.sessions
            .set(
                chat_id,
                Dialog::TransactionFrom {
                    kind,
                    amount,
                    currency: currency.to_string(),
                },
            )
            .await;
        bot.send_message(chat_id, MSG_SELECT_FROM_ACCOUNT)
            .reply_markup(ui::inline_options(ui::CB_FROM_PREFIX, &accounts))
            .await?;
    } else if let Some(from) = data.strip_prefix(ui::CB_FROM_PREFIX) {
        let Dialog::TransactionFrom {
            kind,
            amount,
            currency,
        } = dialog
        else {
            return Ok(());
        };
        cfg.sessions
            .set(
                chat_id,
                Dialog::TransactionInfo {
                    kind,
                    amount,
                    currency,
                    from: from.to_string(),
                },
            )
            .await;
        bot.send_message(chat_id, MSG_ADD_INFO_QUESTION)
            .reply_markup(ui::yes_none_keyboard())
            .await?;
    } else if let Some(choice) = data.strip_prefix(ui::CB_INFO_PREFIX) {
        let Dialog::TransactionInfo {
            kind,
            amount,
            currency,
            from,
        } = dialog
        else {
            return Ok(());
        };

        if choice == "none" {
            finalize_transaction(
                &bot,
                chat_id,
                &cfg,
                kind,
                amount,
                currency,
                from,
                String::new(),
            )
            .await?;
        } else {
            cfg.sessions
                .set(
                    chat_id,
                    Dialog::TransactionInfo {
                        kind,
                        amount,
                        currency,
                        from,
                    },
                )
                .await;
            bot.send_message(chat_id, MSG_ENTER_INFO).await?;
        }
    }

    Ok(())
}

fn is_allowed(cfg: &ConfigParameters, user: Option<&User>) -> bool {
    match (&cfg.allowed_users, user) {
        (Some(allowed), Some(user)) => allowed.contains(&user.id),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

async fn send_main(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    bot.send_message(chat_id, text)
        .reply_markup(ui::main_keyboard())
        .await?;
    Ok(())
}

/// Maps an engine error to its user-facing text and returns to the main
/// menu; the transport never surfaces internals.
async fn notify_error(bot: &Bot, chat_id: ChatId, err: &LedgerError) -> ResponseResult<()> {
    let text = match err {
        LedgerError::InvalidAmount(_) => MSG_INVALID_AMOUNT,
        LedgerError::InvalidDuration(_) => MSG_INVALID_MINUTES,
        LedgerError::EmptySplit => MSG_SPLIT_NEEDS_ONE,
        LedgerError::NoAccounts => MSG_USE_MANAGE_ACCOUNTS,
        LedgerError::UnknownKind(_) | LedgerError::KeyNotFound(_) => MSG_OPERATION_FAILED,
        LedgerError::Store(err) => {
            tracing::error!("ledger store failure: {err}");
            MSG_STORAGE_FAILED
        }
    };
    send_main(bot, chat_id, text).await
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
