//! Weekly report scheduling.
//!
//! A tokio loop sleeps until the next configured weekday/time, runs the
//! two-phase penalty check and delivers the rendered report to the
//! registered chat. Delivery failures are logged and never kill the loop;
//! the next scheduled run proceeds independently.

use std::time::Duration;

use chrono::{DateTime, Datelike, Days, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use engine::{PenaltyPolicy, report};
use teloxide::{prelude::*, types::ChatId};

use crate::SharedLedger;

#[derive(Clone, Debug)]
pub struct ReportSchedule {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
    pub timezone: Tz,
}

impl Default for ReportSchedule {
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
            hour: 9,
            minute: 0,
            timezone: chrono_tz::Europe::Berlin,
        }
    }
}

impl ReportSchedule {
    /// Next occurrence of the configured weekday and time, in UTC.
    ///
    /// Returns `None` only for configurations that never resolve to a valid
    /// local time (e.g. an out-of-range hour).
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.timezone);
        for days in 0..=7u64 {
            let date = local.date_naive().checked_add_days(Days::new(days))?;
            if date.weekday() != self.weekday {
                continue;
            }
            let naive = date.and_hms_opt(self.hour, self.minute, 0)?;
            // A time skipped by a DST jump falls through to next week.
            let Some(candidate) = self.timezone.from_local_datetime(&naive).earliest() else {
                continue;
            };
            let candidate = candidate.with_timezone(&Utc);
            if candidate > now {
                return Some(candidate);
            }
        }
        None
    }
}

#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error(transparent)]
    Ledger(#[from] engine::LedgerError),
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),
}

/// Runs the weekly report job until the process stops.
pub async fn run(bot: Bot, ledger: SharedLedger, schedule: ReportSchedule) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_occurrence(now) else {
            tracing::error!(?schedule, "could not compute the next weekly report time");
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };

        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next = %next, "weekly report scheduled");
        tokio::time::sleep(wait).await;

        if let Err(err) = deliver(&bot, &ledger, &schedule).await {
            tracing::error!("weekly report delivery failed: {err}");
        }

        // Step past the fire time so the next computation lands a week out.
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}

async fn deliver(
    bot: &Bot,
    ledger: &SharedLedger,
    schedule: &ReportSchedule,
) -> Result<(), DeliveryError> {
    let (chat_id, text) = {
        let ledger = ledger.lock().await;
        let Some(chat_id) = ledger.report_chat()? else {
            tracing::warn!("no report chat registered, skipping weekly report");
            return Ok(());
        };
        let outcome = ledger.check_penalties(PenaltyPolicy::TwoPhase)?;
        let today = Utc::now().with_timezone(&schedule.timezone).date_naive();
        (chat_id, report::weekly_report_text(&outcome, today))
    };

    bot.send_message(ChatId(chat_id), text).await?;
    tracing::info!(chat_id, "weekly report delivered");
    Ok(())
}
