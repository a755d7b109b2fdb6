//! Telegram transport for the household ledger.
//!
//! The bot is a thin client: dialogs stage input in per-chat memory and the
//! engine sees one complete entry at the final step. The engine itself is
//! shared behind a mutex so operations stay strictly sequential.

use std::{sync::Arc, time::Duration};

use engine::{JsonFileStore, Ledger};
use teloxide::prelude::*;
use tokio::sync::Mutex;

mod handlers;
pub mod scheduler;
mod state;
mod ui;

pub type SharedLedger = Arc<Mutex<Ledger<JsonFileStore>>>;

const DEFAULT_DIALOG_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub(crate) struct ConfigParameters {
    allowed_users: Option<Vec<UserId>>,
    ledger: SharedLedger,
    sessions: state::SessionStore,
    timeout: Duration,
}

pub struct Bot {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    ledger: SharedLedger,
    timeout: Duration,
    schedule: Option<scheduler::ReportSchedule>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);

        if let Some(schedule) = self.schedule.clone() {
            tokio::spawn(scheduler::run(bot.clone(), self.ledger.clone(), schedule));
        }
        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            ledger: self.ledger.clone(),
            sessions: state::SessionStore::default(),
            timeout: self.timeout,
        };

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handlers::handle_message))
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    ledger: Option<SharedLedger>,
    timeout: Option<Duration>,
    schedule: Option<scheduler::ReportSchedule>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn allowed_users(mut self, allowed_users: Vec<u64>) -> BotBuilder {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users.into_iter().map(UserId).collect());
        }
        self
    }

    pub fn ledger(mut self, ledger: SharedLedger) -> BotBuilder {
        self.ledger = Some(ledger);
        self
    }

    /// Enables the scheduled weekly report.
    pub fn weekly_report(mut self, schedule: scheduler::ReportSchedule) -> BotBuilder {
        self.schedule = Some(schedule);
        self
    }

    /// How long staged dialog input survives without activity.
    pub fn dialog_timeout(mut self, timeout: Duration) -> BotBuilder {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("missing telegram token".to_string());
        }
        let ledger = self.ledger.ok_or_else(|| "missing ledger".to_string())?;

        Ok(Bot {
            token: self.token,
            allowed_users: self.allowed_users,
            ledger,
            timeout: self.timeout.unwrap_or(DEFAULT_DIALOG_TIMEOUT),
            schedule: self.schedule,
        })
    }
}
