//! Per-chat dialog sessions.
//!
//! A session holds the staged input of one guided dialog. It lives only in
//! memory: nothing is committed to the ledger until the final step, so a
//! dropped session loses at most an unfinished prompt. Sessions expire after
//! a configurable idle timeout; expired staged input is discarded without
//! invoking the engine.

use std::{collections::HashMap, sync::Arc, time::Instant};

use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Staged input of a multi-step dialog, one variant per prompt the chat is
/// currently answering.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum Dialog {
    #[default]
    Idle,
    ExpenseAmount,
    ExpensePayer {
        amount: String,
    },
    ExpenseSplit {
        amount: String,
        payer: String,
        split_with: Vec<String>,
    },
    ChoreMember,
    ChoreMinutes {
        member: String,
    },
    ManageMembers,
    ManageAccounts,
    /// Waiting for a `type:` callback.
    TransactionKind,
    TransactionAmount {
        kind: String,
    },
    /// Waiting for a `curr:` callback.
    TransactionCurrency {
        kind: String,
        amount: String,
    },
    /// Waiting for a `from:` callback.
    TransactionFrom {
        kind: String,
        amount: String,
        currency: String,
    },
    /// Waiting for the `info:` callback or for the note text itself.
    TransactionInfo {
        kind: String,
        amount: String,
        currency: String,
        from: String,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Session {
    pub dialog: Dialog,
    pub last_activity: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            dialog: Dialog::Idle,
            last_activity: Instant::now(),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct SessionStore {
    inner: Arc<Mutex<HashMap<ChatId, Session>>>,
}

impl SessionStore {
    pub(crate) async fn get(&self, chat_id: ChatId) -> Session {
        let guard = self.inner.lock().await;
        guard.get(&chat_id).cloned().unwrap_or_default()
    }

    /// Replaces the chat's dialog state and stamps the activity clock.
    pub(crate) async fn set(&self, chat_id: ChatId, dialog: Dialog) {
        let mut guard = self.inner.lock().await;
        let session = guard.entry(chat_id).or_default();
        session.dialog = dialog;
        session.last_activity = Instant::now();
    }

    pub(crate) async fn reset(&self, chat_id: ChatId) {
        self.set(chat_id, Dialog::Idle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_default_to_idle() {
        let store = SessionStore::default();
        let session = store.get(ChatId(1)).await;
        assert_eq!(session.dialog, Dialog::Idle);
    }

    #[tokio::test]
    async fn set_replaces_the_dialog_per_chat() {
        let store = SessionStore::default();
        store.set(ChatId(1), Dialog::ExpenseAmount).await;
        store.set(ChatId(2), Dialog::ChoreMember).await;

        assert_eq!(store.get(ChatId(1)).await.dialog, Dialog::ExpenseAmount);
        assert_eq!(store.get(ChatId(2)).await.dialog, Dialog::ChoreMember);

        store.reset(ChatId(1)).await;
        assert_eq!(store.get(ChatId(1)).await.dialog, Dialog::Idle);
    }
}
