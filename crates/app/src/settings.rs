//! Handles settings for the application. Configuration is written in
//! `settings.toml`.

use std::str::FromStr;

use config::{Config, ConfigError, File};
use serde::Deserialize;
use telegram_bot::scheduler::ReportSchedule;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default)]
    pub allowed_users: Vec<u64>,
    #[serde(default)]
    pub dialog_timeout_secs: Option<u64>,
}

/// When the weekly report fires, in the configured timezone.
#[derive(Debug, Deserialize)]
pub struct Report {
    pub weekday: String,
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    pub timezone: String,
}

impl Report {
    pub fn to_schedule(&self) -> Result<ReportSchedule, String> {
        let weekday = chrono::Weekday::from_str(&self.weekday)
            .map_err(|_| format!("invalid report weekday: {}", self.weekday))?;
        let timezone = chrono_tz::Tz::from_str(&self.timezone)
            .map_err(|_| format!("invalid report timezone: {}", self.timezone))?;
        Ok(ReportSchedule {
            weekday,
            hour: self.hour,
            minute: self.minute,
            timezone,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub store: Store,
    #[serde(default)]
    pub engine: Option<engine::EngineConfig>,
    pub telegram: Option<Telegram>,
    pub report: Option<Report>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
