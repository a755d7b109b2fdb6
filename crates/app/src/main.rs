use std::{sync::Arc, time::Duration};

use telegram_bot::scheduler::ReportSchedule;
use tokio::sync::Mutex;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "haushalt={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let store = engine::JsonFileStore::new(&settings.store.path);
    let config = settings.engine.unwrap_or_default();
    let ledger = engine::Ledger::new(store, config)?;
    let ledger: telegram_bot::SharedLedger = Arc::new(Mutex::new(ledger));

    let schedule = match &settings.report {
        Some(report) => report.to_schedule()?,
        None => ReportSchedule::default(),
    };

    if let Some(telegram) = settings.telegram {
        let ledger = ledger.clone();
        tasks.spawn(async move {
            tracing::info!("Found telegram settings...");

            let mut builder = telegram_bot::Bot::builder()
                .token(&telegram.token)
                .ledger(ledger)
                .allowed_users(telegram.allowed_users)
                .weekly_report(schedule);
            if let Some(secs) = telegram.dialog_timeout_secs {
                builder = builder.dialog_timeout(Duration::from_secs(secs));
            }

            match builder.build() {
                Ok(bot) => bot.run().await,
                Err(err) => tracing::error!("failed to initialize telegram bot: {err}"),
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}
