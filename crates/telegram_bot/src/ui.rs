//! Keyboards and button labels.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

pub(crate) const BTN_ADD_EXPENSE: &str = "Add Expense";
pub(crate) const BTN_ADD_CHORE: &str = "Add Chore";
pub(crate) const BTN_ADD_TRANSACTION: &str = "Add Transaction";
pub(crate) const BTN_LIST_TRANSACTIONS: &str = "List Transactions";
pub(crate) const BTN_STANDINGS: &str = "Standings";
pub(crate) const BTN_BEER_OWED: &str = "Check Beer Owed";
pub(crate) const BTN_GENERATE_REPORT: &str = "Generate Report";
pub(crate) const BTN_MANAGE_MEMBERS: &str = "Manage Members";
pub(crate) const BTN_MANAGE_ACCOUNTS: &str = "Manage Accounts";
pub(crate) const BTN_SET_WEEKLY_REPORT: &str = "Set Weekly Report";
pub(crate) const BTN_DONE: &str = "Done";
pub(crate) const BTN_BACK: &str = "Back";
pub(crate) const BTN_CANCEL: &str = "Cancel";
pub(crate) const BTN_YES: &str = "Yes";
pub(crate) const BTN_NONE: &str = "None";

pub(crate) const CB_TYPE_PREFIX: &str = "type:";
pub(crate) const CB_CURRENCY_PREFIX: &str = "curr:";
pub(crate) const CB_FROM_PREFIX: &str = "from:";
pub(crate) const CB_INFO_PREFIX: &str = "info:";

fn reply_keyboard(rows: Vec<Vec<KeyboardButton>>) -> ReplyMarkup {
    let mut markup = KeyboardMarkup::new(rows);
    markup.resize_keyboard = true;
    ReplyMarkup::Keyboard(markup)
}

pub(crate) fn main_keyboard() -> ReplyMarkup {
    reply_keyboard(vec![
        vec![
            KeyboardButton::new(BTN_ADD_EXPENSE),
            KeyboardButton::new(BTN_ADD_CHORE),
        ],
        vec![
            KeyboardButton::new(BTN_ADD_TRANSACTION),
            KeyboardButton::new(BTN_LIST_TRANSACTIONS),
        ],
        vec![
            KeyboardButton::new(BTN_STANDINGS),
            KeyboardButton::new(BTN_BEER_OWED),
        ],
        vec![
            KeyboardButton::new(BTN_GENERATE_REPORT),
            KeyboardButton::new(BTN_MANAGE_MEMBERS),
        ],
        vec![
            KeyboardButton::new(BTN_MANAGE_ACCOUNTS),
            KeyboardButton::new(BTN_SET_WEEKLY_REPORT),
        ],
    ])
}

/// One button per member, as stored, plus a `Done` row.
pub(crate) fn member_keyboard(members: &[String]) -> Option<ReplyMarkup> {
    if members.is_empty() {
        return None;
    }
    let mut rows: Vec<Vec<KeyboardButton>> = members
        .iter()
        .map(|m| vec![KeyboardButton::new(m.clone())])
        .collect();
    rows.push(vec![KeyboardButton::new(BTN_DONE)]);
    Some(reply_keyboard(rows))
}

pub(crate) fn back_keyboard() -> ReplyMarkup {
    reply_keyboard(vec![vec![KeyboardButton::new(BTN_BACK)]])
}

pub(crate) fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::KeyboardRemove(KeyboardRemove::new())
}

/// One inline button per option, callback data `{prefix}{option}`.
pub(crate) fn inline_options(prefix: &str, options: &[String]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        options
            .iter()
            .map(|opt| {
                vec![InlineKeyboardButton::callback(
                    opt.clone(),
                    format!("{prefix}{opt}"),
                )]
            })
            .collect::<Vec<_>>(),
    )
}

pub(crate) fn yes_none_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(BTN_YES, format!("{CB_INFO_PREFIX}yes")),
        InlineKeyboardButton::callback(BTN_NONE, format!("{CB_INFO_PREFIX}none")),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_keyboard_is_none_without_members() {
        assert!(member_keyboard(&[]).is_none());
    }

    #[test]
    fn inline_options_carry_the_prefix() {
        let kb = inline_options(CB_CURRENCY_PREFIX, &["EUR".to_string(), "USD".to_string()]);
        let first = &kb.inline_keyboard[0][0];
        assert_eq!(first.text, "EUR");
    }
}
